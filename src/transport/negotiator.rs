//! Picks L2CAP when the remote advertises support and a working factory is
//! supplied; falls back to GATT otherwise. Wraps whichever transport won
//! behind one uniform interface for the session engine.

use std::future::Future;

use tracing::{info, warn};

use crate::core::TransportError;
use crate::frame::Frame;

use super::{GattTransport, L2capTransport, TransportKind};

/// Whichever transport the negotiator selected, exposed uniformly.
pub enum NegotiatedTransport {
    Gatt(GattTransport),
    L2cap(L2capTransport),
}

impl NegotiatedTransport {
    /// Send a frame over the active transport.
    pub async fn send(&self, frame: Frame) -> Result<(), TransportError> {
        match self {
            Self::Gatt(t) => t.send(frame).await,
            Self::L2cap(t) => t.send(frame).await,
        }
    }

    /// Receive the next frame, or the error that ended the stream.
    pub async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        match self {
            Self::Gatt(t) => t.recv().await,
            Self::L2cap(t) => t.recv().await,
        }
    }

    /// Tear down the active transport.
    pub async fn close(&mut self) {
        match self {
            Self::Gatt(t) => t.close().await,
            Self::L2cap(t) => t.close().await,
        }
    }

    /// Which transport is active.
    pub fn current_kind(&self) -> TransportKind {
        match self {
            Self::Gatt(t) => t.current_kind(),
            Self::L2cap(t) => t.current_kind(),
        }
    }
}

/// Select and start a transport. Tries `l2cap_factory` first when
/// `remote_supports_l2cap` and a factory was supplied; any factory error
/// falls back to `gatt_factory`, which must succeed.
pub async fn negotiate<L2Fut>(
    remote_supports_l2cap: bool,
    l2cap_factory: Option<impl FnOnce() -> L2Fut>,
    gatt_factory: impl FnOnce() -> GattTransport,
) -> NegotiatedTransport
where
    L2Fut: Future<Output = Result<L2capTransport, TransportError>>,
{
    if remote_supports_l2cap {
        if let Some(factory) = l2cap_factory {
            match factory().await {
                Ok(transport) => {
                    info!("negotiated L2CAP transport");
                    return NegotiatedTransport::L2cap(transport);
                }
                Err(e) => warn!(error = %e, "L2CAP factory failed, falling back to GATT"),
            }
        }
    }
    info!("negotiated GATT transport");
    NegotiatedTransport::Gatt(gatt_factory())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GhostDropConfig;
    use crate::transport::radio::GattLink;

    struct NeverLink;

    impl GattLink for NeverLink {
        async fn write_packet(&self, _bytes: &[u8], _requires_response: bool) -> Result<(), TransportError> {
            Ok(())
        }
        async fn can_send_without_response(&self) -> bool {
            true
        }
        async fn wait_for_write_without_response_ready(&self) {}
        async fn next_incoming_packet(&self) -> Option<Vec<u8>> {
            std::future::pending().await
        }
    }

    fn gatt_double() -> GattTransport {
        GattTransport::new(NeverLink, 64, 4, &GhostDropConfig::default())
    }

    #[tokio::test]
    async fn falls_back_to_gatt_when_remote_does_not_support_l2cap() {
        let l2cap_factory: Option<fn() -> std::future::Ready<Result<L2capTransport, TransportError>>> =
            None;
        let transport = negotiate(false, l2cap_factory, gatt_double).await;
        assert_eq!(transport.current_kind(), TransportKind::Gatt);
    }

    #[tokio::test]
    async fn l2cap_factory_error_falls_back_to_gatt() {
        let l2cap_factory = Some(|| async { Err(TransportError::Io("no psm".into())) });
        let transport = negotiate(true, l2cap_factory, gatt_double).await;
        assert_eq!(transport.current_kind(), TransportKind::Gatt);
    }

    #[test]
    fn transport_kind_serializes_lowercase() {
        let encoded = serde_json::to_string(&TransportKind::L2cap).unwrap();
        assert_eq!(encoded, "\"l2cap\"");
    }
}
