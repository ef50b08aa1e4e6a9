//! Events the session engine fans out to UI subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::core::DeviceId;
use crate::transport::{radio::NearbyDevice, TransportKind};

use super::state::SessionState;

/// Bandwidth/ETA snapshot for an in-progress transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferProgress {
    pub bytes: u64,
    pub total: u64,
    pub bytes_per_sec: f64,
    pub eta_sec: Option<f64>,
    pub transport: TransportKind,
}

/// One line of the engine's exported diagnostic log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
}

/// Everything the session engine reports to the UI layer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(SessionState),
    NearbyDevicesUpdated(Vec<NearbyDevice>),
    Connected(DeviceId),
    TransportSelected(TransportKind),
    HandshakeSas(String),
    VerificationRequired,
    TransferProgress(TransferProgress),
    TransferCompleted(String),
    TransferFailed(String),
    Log(LogEntry),
}

/// Default bound on each subscriber's queue; a slow subscriber drops old
/// events rather than stalling the engine.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Broadcast fan-out for [`SessionEvent`]. Cloned cheaply (an `Arc`d
/// sender internally); every [`subscribe`](Self::subscribe) call gets an
/// independent, bounded queue.
#[derive(Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for SessionEvents {
    fn default() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }
}

impl SessionEvents {
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event. No receivers is not an error — events are fire-and
    /// forget from the engine's point of view.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_emitted_events() {
        let events = SessionEvents::default();
        let mut rx = events.subscribe();
        events.emit(SessionEvent::VerificationRequired);
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::VerificationRequired
        ));
    }

    #[test]
    fn emitting_with_no_subscribers_does_not_panic() {
        let events = SessionEvents::default();
        events.emit(SessionEvent::TransferFailed("nobody listening".into()));
    }
}
