//! Protocol constants. These values are fixed by the wire format and must
//! not be changed without bumping the envelope version.

use std::time::Duration;

// =============================================================================
// CRYPTOGRAPHIC CONSTANTS
// =============================================================================

/// AES-GCM authentication tag size.
pub const AEAD_TAG_SIZE: usize = 16;

/// AES-GCM nonce size (4-byte directional prefix + 8-byte sequence).
pub const AEAD_NONCE_SIZE: usize = 12;

/// P-256 uncompressed public key size (0x04 prefix + 32 + 32 bytes).
pub const PUBLIC_KEY_SIZE: usize = 65;

/// SHA-256 digest size.
pub const HASH_SIZE: usize = 32;

/// Session ID size.
pub const SESSION_ID_SIZE: usize = 16;

/// Handshake nonce size.
pub const HANDSHAKE_NONCE_SIZE: usize = 16;

/// Size of derived directional AEAD keys.
pub const SESSION_KEY_SIZE: usize = 32;

/// Size of each half of the HKDF session-key split (encKeyMaterial, macKeyMaterial).
pub const KEY_MATERIAL_SIZE: usize = 32;

/// Size of a directional nonce prefix.
pub const NONCE_PREFIX_SIZE: usize = 4;

/// Number of decimal digits in the Short Authentication String.
pub const SAS_DIGITS: usize = 6;

/// Modulus applied to the transcript hash prefix to produce the SAS.
pub const SAS_MODULUS: u32 = 1_000_000;

/// Protocol version carried in the envelope.
pub const PROTOCOL_VERSION: u8 = 1;

// =============================================================================
// FRAME ENVELOPE
// =============================================================================

/// Envelope magic bytes ("GHST").
pub const ENVELOPE_MAGIC: [u8; 4] = *b"GHST";

/// Envelope header size (magic + version + kind + bodyLen).
pub const ENVELOPE_HEADER_SIZE: usize = 10;

/// Lowest valid frame kind discriminant.
pub const FRAME_KIND_MIN: u8 = 1;

/// Highest valid frame kind discriminant.
pub const FRAME_KIND_MAX: u8 = 12;

// =============================================================================
// GATT PACKET HEADER
// =============================================================================

/// GATT packet magic bytes ("GD").
pub const GATT_MAGIC: [u8; 2] = *b"GD";

/// GATT packet header size (magic + frameID + fragmentIndex + fragmentCount + flags).
pub const GATT_HEADER_SIZE: usize = 11;

/// Minimum accepted `maxPacketSize`.
pub const GATT_MIN_PACKET_SIZE: usize = 40;

/// Packet flag: bulk (`Data`) fragment.
pub const GATT_FLAG_BULK: u8 = 0x00;

/// Packet flag: control fragment.
pub const GATT_FLAG_CONTROL: u8 = 0x01;

/// Reassembly entries older than this are garbage-collected.
pub const GATT_REASSEMBLY_STALE_AFTER: Duration = Duration::from_secs(10);

// =============================================================================
// SLIDING WINDOW / RETRY TIMING
// =============================================================================

/// Width of the NACK bitmap in bits.
pub const NACK_BITMAP_BITS: u64 = 64;

/// Default GATT retry tick interval.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(200);

/// Default GATT retransmit timeout.
pub const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// SESSION HANDSHAKE TIMEOUTS
// =============================================================================

/// Time to wait for `HelloAck` before raising `Timeout`.
pub const HELLO_ACK_TIMEOUT: Duration = Duration::from_secs(15);

/// Time to wait for the peer's `VerifyAck` before raising `Timeout`.
pub const VERIFY_ACK_TIMEOUT: Duration = Duration::from_secs(15);

// =============================================================================
// BLE SERVICE EXPOSURE (for a concrete peripheral adapter)
// =============================================================================

/// GhostDrop GATT service UUID.
pub const SERVICE_UUID: &str = "BFA6E968-0F36-4888-8F63-C8EC01385E67";

/// Data characteristic UUID suffix (notify + write-without-response).
pub const DATA_CHARACTERISTIC_UUID_SUFFIX: &str = "0603";

/// Control characteristic UUID suffix (notify + write-with-response).
pub const CONTROL_CHARACTERISTIC_UUID_SUFFIX: &str = "0604";

/// Capabilities characteristic UUID suffix (read-only).
pub const CAPABILITIES_CHARACTERISTIC_UUID_SUFFIX: &str = "0605";
