//! Core types, constants, and error taxonomy shared by every other layer.
//!
//! Nothing in this module depends on crypto, transport, or the session
//! engine — it is the vocabulary the rest of the crate is written in.

mod config;
mod constants;
mod error;
mod ids;

pub use config::GhostDropConfig;
pub use constants::*;
pub use error::{CodecError, CryptoError, GhostDropError, TransportError};
pub use ids::{DeviceId, HandshakeNonce, SessionId, TransferId};
