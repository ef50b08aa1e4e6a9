//! Tunable parameters the distilled spec leaves as configuration rather than
//! wire constants. Mirrors the builder style this codebase uses for its
//! other configuration types.

use std::time::Duration;

use super::constants::{
    DEFAULT_RETRY_INTERVAL, DEFAULT_RETRY_TIMEOUT, GATT_REASSEMBLY_STALE_AFTER,
    HELLO_ACK_TIMEOUT, VERIFY_ACK_TIMEOUT,
};

/// Runtime configuration for a GhostDrop session.
///
/// Wire-format constants (envelope magic, AEAD sizes, frame kinds) are fixed
/// and live in [`super::constants`]; this type only covers values that are
/// legitimately negotiable or locally tunable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GhostDropConfig {
    /// How long the sender waits for `HelloAck` before raising `Timeout`.
    pub hello_ack_timeout: Duration,
    /// How long either side waits for the peer's `VerifyAck`.
    pub verify_ack_timeout: Duration,
    /// GATT retry-timer tick interval.
    pub retry_interval: Duration,
    /// GATT retransmit timeout per in-flight sequence.
    pub retry_timeout: Duration,
    /// Age after which a stale GATT reassembly entry is garbage-collected.
    pub reassembly_stale_after: Duration,
    /// Default chunk size offered when the peer does not advertise a lower
    /// `maxChunk`, and the sender does not request a smaller one.
    pub default_max_chunk: usize,
    /// Default sliding-window size offered when the peer does not advertise
    /// a lower `maxWindow`.
    pub default_max_window: usize,
}

impl Default for GhostDropConfig {
    fn default() -> Self {
        Self {
            hello_ack_timeout: HELLO_ACK_TIMEOUT,
            verify_ack_timeout: VERIFY_ACK_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            retry_timeout: DEFAULT_RETRY_TIMEOUT,
            reassembly_stale_after: GATT_REASSEMBLY_STALE_AFTER,
            default_max_chunk: 16 * 1024,
            default_max_window: 16,
        }
    }
}

impl GhostDropConfig {
    /// Start from the defaults.
    pub fn builder() -> GhostDropConfigBuilder {
        GhostDropConfigBuilder::default()
    }
}

/// Builder for [`GhostDropConfig`].
#[derive(Debug, Clone, Default)]
pub struct GhostDropConfigBuilder {
    config: InnerDefaults,
}

#[derive(Debug, Clone)]
struct InnerDefaults(GhostDropConfig);

impl Default for InnerDefaults {
    fn default() -> Self {
        Self(GhostDropConfig::default())
    }
}

impl GhostDropConfigBuilder {
    /// Override the `HelloAck` wait timeout.
    pub fn hello_ack_timeout(mut self, timeout: Duration) -> Self {
        self.config.0.hello_ack_timeout = timeout;
        self
    }

    /// Override the `VerifyAck` wait timeout.
    pub fn verify_ack_timeout(mut self, timeout: Duration) -> Self {
        self.config.0.verify_ack_timeout = timeout;
        self
    }

    /// Override the GATT retry-timer interval.
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.config.0.retry_interval = interval;
        self
    }

    /// Override the GATT retransmit timeout.
    pub fn retry_timeout(mut self, timeout: Duration) -> Self {
        self.config.0.retry_timeout = timeout;
        self
    }

    /// Override the default chunk size.
    pub fn default_max_chunk(mut self, size: usize) -> Self {
        self.config.0.default_max_chunk = size;
        self
    }

    /// Override the default sliding-window size.
    pub fn default_max_window(mut self, size: usize) -> Self {
        self.config.0.default_max_window = size;
        self
    }

    /// Finish building.
    pub fn build(self) -> GhostDropConfig {
        self.config.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_timeouts() {
        let config = GhostDropConfig::default();
        assert_eq!(config.hello_ack_timeout, Duration::from_secs(15));
        assert_eq!(config.verify_ack_timeout, Duration::from_secs(15));
        assert_eq!(config.retry_interval, Duration::from_millis(200));
        assert_eq!(config.retry_timeout, Duration::from_secs(2));
    }

    #[test]
    fn builder_overrides_apply() {
        let config = GhostDropConfig::builder()
            .default_max_chunk(4096)
            .default_max_window(4)
            .retry_timeout(Duration::from_millis(500))
            .build();

        assert_eq!(config.default_max_chunk, 4096);
        assert_eq!(config.default_max_window, 4);
        assert_eq!(config.retry_timeout, Duration::from_millis(500));
        // Untouched fields keep their defaults.
        assert_eq!(config.hello_ack_timeout, Duration::from_secs(15));
    }
}
