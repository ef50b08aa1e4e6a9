//! GhostDrop transport layer: fragmentation/reassembly and sliding-window
//! reliability over GATT, a thin byte-stream wrapper over L2CAP, and the
//! negotiator that picks between them.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Session Engine               │
//! ├─────────────────────────────────────────┤
//! │         Transport Negotiator            │  ← this module
//! │   GATT (fragments, window) | L2CAP      │
//! ├─────────────────────────────────────────┤
//! │         Radio Adapter (external)        │
//! └─────────────────────────────────────────┘
//! ```

mod gatt;
mod l2cap;
mod negotiator;
pub mod radio;

pub use gatt::GattTransport;
pub use l2cap::L2capTransport;
pub use negotiator::{NegotiatedTransport, negotiate};

/// Which concrete transport a session ended up using.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Datagram transport with its own sliding-window reliability.
    Gatt,
    /// Stream-oriented transport over a reliable channel.
    L2cap,
}
