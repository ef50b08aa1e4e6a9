//! Error taxonomy for GhostDrop, following this codebase's layered-error-enum
//! convention: a narrow error per layer (`CodecError`, `CryptoError`,
//! `TransportError`), composed into the top-level [`GhostDropError`] via
//! `#[from]`.

use thiserror::Error;

/// Errors from the frame codec (`frame::envelope`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Envelope magic bytes did not match `"GHST"`.
    #[error("bad envelope magic")]
    BadMagic,

    /// Envelope version byte is not the one this crate speaks.
    #[error("unsupported envelope version: {0}")]
    UnsupportedVersion(u8),

    /// Envelope `kind` byte is outside the valid frame-kind range.
    #[error("unknown frame kind: {0}")]
    UnknownKind(u8),

    /// `bodyLen` disagreed with the body actually present.
    #[error("malformed envelope length")]
    BadLength,

    /// The body did not deserialize into the fields required by `kind`.
    #[error("malformed frame body: {0}")]
    BadBody(String),
}

/// Errors from the cryptographic context (`crypto::*`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// ECDH agreement failed (malformed remote public key).
    #[error("key agreement failed")]
    KeyAgreement,

    /// HKDF expansion failed (should not happen for fixed output lengths).
    #[error("key derivation failed")]
    KeyDerivation,

    /// AEAD seal failed.
    #[error("AEAD encryption failed")]
    Encryption,

    /// AEAD open failed: bad tag, wrong nonce, or not an `Encrypted` frame.
    #[error("AEAD decryption failed (invalid tag or corrupted payload)")]
    Decryption,
}

/// Errors from the transport layer (`transport::*`).
#[derive(Debug, Error)]
pub enum TransportError {
    /// Neither L2CAP nor GATT could be started.
    #[error("no transport available")]
    Unavailable,

    /// An operation was attempted after the transport was closed.
    #[error("transport closed")]
    Closed,

    /// Underlying stream or radio I/O failure.
    #[error("transport i/o error: {0}")]
    Io(String),

    /// Frame codec error surfaced from the transport layer.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Top-level GhostDrop error, returned by the public session-engine API.
#[derive(Debug, Error)]
pub enum GhostDropError {
    /// Radio adapter reports the Bluetooth stack is off or resetting.
    #[error("bluetooth unavailable")]
    BluetoothUnavailable,

    /// Radio adapter reports the process lacks Bluetooth permission.
    #[error("bluetooth unauthorized")]
    BluetoothUnauthorized,

    /// An advertised capabilities payload could not be decoded.
    #[error("invalid capabilities advertisement")]
    InvalidCapabilities,

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Attempted to use a transport after it was closed.
    #[error("transport closed")]
    TransportClosed,

    /// Frame codec error.
    #[error("frame codec error: {0}")]
    Codec(#[from] CodecError),

    /// Cryptographic error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Handshake-level protocol failure: transcript/SAS mismatch, a frame
    /// arrived out of sequence, or the peer cancelled mid-handshake.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// The local user rejected the Short Authentication String.
    #[error("verification rejected")]
    VerificationRejected,

    /// A bounded wait (`HelloAck`, `VerifyAck`, GATT retransmit) expired.
    #[error("timeout waiting for {0}")]
    Timeout(String),

    /// File or persisted-state I/O error.
    #[error("i/o error: {0}")]
    Io(String),

    /// The session state machine rejected a transition.
    #[error("invalid state transition: {from:?} -> {to:?}")]
    InvalidStateTransition {
        /// Originating state.
        from: crate::session::SessionState,
        /// Rejected destination state.
        to: crate::session::SessionState,
    },

    /// Resume state was requested for a `transferID` with none on disk.
    #[error("no resume state for this transfer")]
    ResumeStateMissing,

    /// The session was cancelled locally or by the peer.
    #[error("cancelled: {0}")]
    Cancelled(String),
}

impl From<std::io::Error> for GhostDropError {
    fn from(err: std::io::Error) -> Self {
        GhostDropError::Io(err.to_string())
    }
}
