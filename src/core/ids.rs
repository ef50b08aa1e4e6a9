//! Opaque identifiers shared across the handshake, framing, and store layers.

use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::constants::{HANDSHAKE_NONCE_SIZE, SESSION_ID_SIZE};

macro_rules! opaque_id {
    ($name:ident, $size:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub [u8; $size]);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                let mut bytes = [0u8; $size];
                OsRng.fill_bytes(&mut bytes);
                Self(bytes)
            }

            /// Wrap raw bytes.
            pub fn from_bytes(bytes: [u8; $size]) -> Self {
                Self(bytes)
            }

            /// Borrow the raw bytes.
            pub fn as_bytes(&self) -> &[u8; $size] {
                &self.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex_string(&self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex_string(&self.0))
            }
        }
    };
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

opaque_id!(
    DeviceId,
    16,
    "128-bit opaque identifier assigned once per device install."
);

opaque_id!(
    SessionId,
    SESSION_ID_SIZE,
    "Per-handshake session identifier, generated by the sender and echoed by the receiver."
);

opaque_id!(
    TransferId,
    16,
    "Identifies a single file transfer; namespaces the resume store and incoming directory."
);

opaque_id!(
    HandshakeNonce,
    HANDSHAKE_NONCE_SIZE,
    "Random per-side nonce mixed into the handshake transcript."
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_random_and_round_trip() {
        let a = DeviceId::generate();
        let b = DeviceId::generate();
        assert_ne!(a, b);

        let raw = [7u8; 16];
        let c = DeviceId::from_bytes(raw);
        assert_eq!(c.as_bytes(), &raw);
    }

    #[test]
    fn display_is_lowercase_hex() {
        let id = TransferId::from_bytes([0xab; 16]);
        assert_eq!(id.to_string(), "ab".repeat(16));
    }
}
