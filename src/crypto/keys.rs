//! Ephemeral P-256 key management for the handshake key exchange.

use p256::ecdh::{EphemeralSecret, SharedSecret};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::PublicKey;
use rand::rngs::OsRng;

use crate::core::{CryptoError, PUBLIC_KEY_SIZE};

/// A fresh P-256 key pair generated once per handshake and discarded after
/// session secrets are derived (no forward secrecy beyond the session, per
/// the spec's Non-goals).
pub struct EphemeralKeypair {
    secret: EphemeralSecret,
    public_bytes: [u8; PUBLIC_KEY_SIZE],
}

impl EphemeralKeypair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random(&mut OsRng);
        let public = PublicKey::from(&secret);
        let encoded = public.to_encoded_point(false);
        let mut public_bytes = [0u8; PUBLIC_KEY_SIZE];
        public_bytes.copy_from_slice(encoded.as_bytes());
        Self {
            secret,
            public_bytes,
        }
    }

    /// The uncompressed SEC1 public key (65 bytes: `0x04 || x || y`).
    pub fn public_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.public_bytes
    }

    /// Perform ECDH against a peer's uncompressed public key.
    pub fn diffie_hellman(&self, peer_public_bytes: &[u8]) -> Result<SharedSecret, CryptoError> {
        let peer_public =
            PublicKey::from_sec1_bytes(peer_public_bytes).map_err(|_| CryptoError::KeyAgreement)?;
        Ok(self.secret.diffie_hellman(&peer_public))
    }
}
