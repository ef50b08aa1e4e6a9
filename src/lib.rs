//! # GhostDrop
//!
//! A peer-to-peer file-transfer engine for short-range, intermittent,
//! low-bandwidth links (Bluetooth Low Energy) between two devices. GhostDrop
//! moves an arbitrary file from one device to another with integrity,
//! confidentiality, and user-verified authenticity, across a transport whose
//! MTU is small, whose write path is flow-controlled, and whose
//! stream-oriented channel (L2CAP credit-based) may not be available at all.
//!
//! This crate covers the session engine, framing codec, cryptographic
//! context, and GATT reliability layer — the hard engineering parts. The
//! concrete BLE radio stack, UI layer, file picking, and external logging
//! sinks are consumed through the narrow interfaces in [`transport::radio`].
//!
//! ## Modules
//!
//! - [`core`]: opaque identifiers, the error taxonomy, wire/tuning
//!   constants, and [`core::GhostDropConfig`] (always included).
//! - [`frame`]: the `Frame` tagged union and its length-delimited envelope
//!   codec.
//! - [`window`]: sliding-window bulk-data reliability (cumulative ACK,
//!   NACK bitmap, timeout detection).
//! - [`crypto`]: P-256 ECDH handshake, HKDF-SHA256 key derivation, the
//!   Short Authentication String, and sequence-bound AES-GCM sealing.
//! - [`transport`]: GATT (fragmentation + sliding window) and L2CAP
//!   (stream-oriented) transports behind a uniform negotiated interface,
//!   plus the radio-adapter traits external backends implement.
//! - [`store`]: durable resume checkpoints and incoming-file chunk writes.
//! - [`session`]: the state machine and sender/receiver flows that
//!   orchestrate everything above, emitting [`session::SessionEvent`]s.
//!
//! ## Example
//!
//! ```no_run
//! use ghostdrop_core::core::{DeviceId, GhostDropConfig};
//! use ghostdrop_core::session::SessionEngine;
//! use ghostdrop_core::store::{IncomingStore, ResumeStore};
//!
//! # async fn doc() {
//! let device_id = DeviceId::generate();
//! let config = GhostDropConfig::default();
//! let resume_store = ResumeStore::new("/tmp/ghostdrop/resume");
//! let incoming_store = IncomingStore::new("/tmp/ghostdrop/incoming");
//!
//! let (mut engine, mut events) = SessionEngine::new(device_id, config, resume_store, incoming_store);
//! // `engine.start_as_sender(transport)` or `start_as_receiver(transport)` next,
//! // where `transport` comes from `transport::negotiate` over a concrete radio adapter.
//! # let _ = &mut engine;
//! # let _ = &mut events;
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Opaque identifiers, the error taxonomy, wire/tuning constants, and
/// runtime configuration. Nothing else in this crate depends on anything
/// outside this module.
pub mod core;

/// The `Frame` tagged union and its length-delimited envelope codec.
pub mod frame;

/// Sliding-window bulk-data reliability.
pub mod window;

/// Handshake and per-session cryptographic context.
pub mod crypto;

/// GATT and L2CAP transports, the negotiator between them, and the radio
/// adapter traits a concrete BLE backend implements.
pub mod transport;

/// Durable resume checkpoints and incoming-file chunk writes.
pub mod store;

/// The session state machine and sender/receiver orchestration.
pub mod session;

/// Convenient re-exports of the types most callers need.
pub mod prelude {
    pub use crate::core::{
        DeviceId, GhostDropConfig, GhostDropError, HandshakeNonce, SessionId, TransferId,
    };
    pub use crate::crypto::{CryptoContext, Role};
    pub use crate::frame::Frame;
    pub use crate::session::{SessionEngine, SessionEvent, SessionState};
    pub use crate::store::{IncomingStore, ResumeStore, TransferResumeState};
    pub use crate::transport::{NegotiatedTransport, TransportKind, negotiate};
    pub use crate::window::SlidingWindow;
}

pub use core::GhostDropError;
