//! The `Frame` tagged union and its payload structs.

use serde::{Deserialize, Serialize};

use crate::core::{DeviceId, HandshakeNonce, SessionId, TransferId};

/// Capabilities advertised by the receiver and consumed by the sender to
/// parameterize the transport (chunk size, window size, transport choice).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitiesPayload {
    /// Whether the advertiser can open an L2CAP CoC channel.
    pub supports_l2cap: bool,
    /// Maximum chunk size the advertiser is willing to receive (`>= 40`).
    pub max_chunk: u32,
    /// Maximum sliding-window size the advertiser can track (`>= 1`).
    pub max_window: u32,
    /// Protocol version the advertiser speaks.
    pub protocol_version: u32,
}

/// Payload of the `Hello` frame: the sender's half of the key exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Session identifier, generated by the sender.
    pub session_id: SessionId,
    /// The sender's installation identifier.
    pub device_id: DeviceId,
    /// Uncompressed SEC1 P-256 public key (65 bytes).
    pub ephemeral_pub_key: Vec<u8>,
    /// 16-byte random handshake nonce.
    pub nonce: HandshakeNonce,
    /// The sender's capabilities.
    pub capabilities: CapabilitiesPayload,
}

/// Payload of the `HelloAck` frame: the receiver's half of the key exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloAckPayload {
    /// Echoes the session identifier from `Hello`.
    pub session_id: SessionId,
    /// Uncompressed SEC1 P-256 public key (65 bytes).
    pub ephemeral_pub_key: Vec<u8>,
    /// 16-byte random handshake nonce.
    pub nonce: HandshakeNonce,
}

/// Payload of the `Verify` frame: the locally computed transcript hash and
/// SAS, sent to the peer for cross-checking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPayload {
    /// SHA-256 transcript hash.
    pub transcript_hash: [u8; 32],
    /// 6-digit Short Authentication String.
    pub sas_code: String,
}

/// Payload of the `Metadata` frame, sent once per transfer before any
/// `Data` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataPayload {
    /// Identifies this transfer; namespaces resume state and incoming files.
    pub transfer_id: TransferId,
    /// Original file name.
    pub filename: String,
    /// Total file size in bytes.
    pub size: u64,
    /// MIME type, best-effort.
    pub mime_type: String,
    /// SHA-256 of the complete file, checked on `Complete`.
    pub sha256: [u8; 32],
    /// Negotiated chunk size for this transfer.
    pub chunk_size: u32,
}

/// A single protocol frame. Variant order fixes the wire `kind` byte
/// (`Hello` = 1 .. `Encrypted` = 12); do not reorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Frame {
    /// Sender's key-exchange offer.
    Hello(HelloPayload),
    /// Receiver's key-exchange reply.
    HelloAck(HelloAckPayload),
    /// Transcript hash and SAS for cross-verification.
    Verify(VerifyPayload),
    /// User's accept/reject decision on the SAS.
    VerifyAck(bool),
    /// File metadata, sent once before bulk data.
    Metadata(MetadataPayload),
    /// One chunk of file data, `payload` being plaintext or AEAD
    /// `ciphertext || tag` once verification has completed.
    Data {
        /// Chunk sequence number.
        seq: u64,
        /// Chunk bytes.
        payload: Vec<u8>,
    },
    /// Cumulative + selective acknowledgement of `Data` frames.
    Ack {
        /// Highest contiguous sequence acknowledged.
        cum_seq: u64,
        /// Bitmap of additionally-received sequences starting at `cum_seq + 1`.
        nack_bitmap: u64,
    },
    /// Reconnection hint: the last sequence the receiver confirmed.
    Resume {
        /// Transfer being resumed.
        transfer_id: TransferId,
        /// Last sequence number the receiver persisted.
        last_confirmed_seq: u64,
    },
    /// Sent by the sender once every chunk has been transmitted.
    Complete {
        /// Transfer being finalized.
        transfer_id: TransferId,
        /// SHA-256 of the complete file, as computed by the sender.
        sha256: [u8; 32],
    },
    /// Either side may cancel with a human-readable reason.
    Cancel(String),
    /// Liveness probe, echoes an opaque counter.
    Ping(u32),
    /// An AEAD-sealed inner frame.
    Encrypted {
        /// Sequence number bound into the nonce and associated data.
        seq: u64,
        /// `ciphertext || tag` of the encoded inner frame.
        combined: Vec<u8>,
    },
}

impl Frame {
    /// The wire `kind` byte for this frame's variant.
    pub fn kind(&self) -> u8 {
        match self {
            Frame::Hello(_) => 1,
            Frame::HelloAck(_) => 2,
            Frame::Verify(_) => 3,
            Frame::VerifyAck(_) => 4,
            Frame::Metadata(_) => 5,
            Frame::Data { .. } => 6,
            Frame::Ack { .. } => 7,
            Frame::Resume { .. } => 8,
            Frame::Complete { .. } => 9,
            Frame::Cancel(_) => 10,
            Frame::Ping(_) => 11,
            Frame::Encrypted { .. } => 12,
        }
    }

    /// `true` for the single bulk-data variant (`Data`); every other kind
    /// is a control frame per the GATT send policy.
    pub fn is_bulk(&self) -> bool {
        matches!(self, Frame::Data { .. })
    }
}
