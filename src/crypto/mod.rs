//! Handshake and cryptographic context: P-256 ECDH, transcript hashing,
//! HKDF-SHA256 directional key derivation, the Short Authentication String,
//! and sequence-bound AES-GCM sealing.
//!
//! Submodules mirror the pipeline a session runs through once:
//! [`keys`] (ephemeral keypairs) → [`handshake`] (transcript, HKDF, SAS) →
//! [`nonce`] (AEAD nonce construction) → [`aead`] (seal/open primitives),
//! combined per-session in [`context`].

mod aead;
mod context;
mod handshake;
mod keys;
mod nonce;

pub use context::{CryptoContext, Role};
pub use handshake::{HandshakeParty, HandshakeSecrets, derive_sas, derive_session_secrets};
pub use keys::EphemeralKeypair;
pub use nonce::build_nonce;
