//! Transcript hashing, HKDF-SHA256 key derivation, and Short Authentication
//! String (SAS) computation.
//!
//! Every function here is pure and symmetric: given the same four handshake
//! inputs (`sessionID`, both ephemeral public keys, both nonces), either
//! peer computes identical output regardless of which one generated them.
//! That symmetry is what makes the handshake verifiable with a
//! human-readable SAS.

use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::core::{HASH_SIZE, KEY_MATERIAL_SIZE, SAS_DIGITS, SAS_MODULUS};

const TRANSCRIPT_LABEL: &[u8] = b"GhostDrop-v1";
const SESSION_KEY_INFO: &[u8] = b"GhostDrop Session Keys";
const DIRECTIONAL_SALT: &[u8] = b"ghostdrop-directional";
const SENDER_LABEL: &[u8] = b"sender";
const RECEIVER_LABEL: &[u8] = b"receiver";
const SENDER_PREFIX_SEED: &[u8] = b"ghostdrop-sender";
const RECEIVER_PREFIX_SEED: &[u8] = b"ghostdrop-receiver";

/// Handshake secrets derived once per session and held immutable thereafter.
///
/// Key material is zeroized on drop; `transcript_hash` is not secret (both
/// peers exchange it openly in `Verify`) and is left out of that wipe.
#[derive(Clone)]
pub struct HandshakeSecrets {
    /// Material the directional AEAD keys are derived from.
    pub enc_key_material: [u8; KEY_MATERIAL_SIZE],
    /// Reserved material (unused by AEAD directly; kept for protocol parity
    /// with implementations that separate encryption and MAC material).
    pub mac_key_material: [u8; KEY_MATERIAL_SIZE],
    /// SHA-256 over the ordered transcript; identical on both peers.
    pub transcript_hash: [u8; HASH_SIZE],
}

impl Drop for HandshakeSecrets {
    fn drop(&mut self) {
        self.enc_key_material.zeroize();
        self.mac_key_material.zeroize();
    }
}

/// One side's half of the handshake: its ephemeral public key and nonce.
#[derive(Clone, Copy)]
pub struct HandshakeParty<'a> {
    /// Uncompressed SEC1 public key bytes.
    pub public_key: &'a [u8],
    /// 16-byte random handshake nonce.
    pub nonce: &'a [u8],
}

/// Build the deterministic transcript from the four handshake inputs and
/// derive session secrets by HKDF-expanding the ECDH shared secret with the
/// transcript hash as salt.
///
/// `local` and `remote` may be passed in either role assignment — the
/// function sorts by public-key bytes internally, so both peers land on the
/// same transcript and therefore the same secrets.
pub fn derive_session_secrets(
    shared_secret: &[u8],
    session_id: &[u8],
    local: HandshakeParty<'_>,
    remote: HandshakeParty<'_>,
) -> HandshakeSecrets {
    let (peer_a, peer_b) = if local.public_key <= remote.public_key {
        (local, remote)
    } else {
        (remote, local)
    };

    let mut transcript = Vec::with_capacity(
        TRANSCRIPT_LABEL.len()
            + session_id.len()
            + peer_a.public_key.len()
            + peer_a.nonce.len()
            + peer_b.public_key.len()
            + peer_b.nonce.len(),
    );
    transcript.extend_from_slice(TRANSCRIPT_LABEL);
    transcript.extend_from_slice(session_id);
    transcript.extend_from_slice(peer_a.public_key);
    transcript.extend_from_slice(peer_a.nonce);
    transcript.extend_from_slice(peer_b.public_key);
    transcript.extend_from_slice(peer_b.nonce);

    let transcript_hash: [u8; HASH_SIZE] = Sha256::digest(&transcript).into();

    let hk = Hkdf::<Sha256>::new(Some(&transcript_hash), shared_secret);
    let mut okm = [0u8; 2 * KEY_MATERIAL_SIZE];
    hk.expand(SESSION_KEY_INFO, &mut okm)
        .expect("64-byte HKDF output is always valid for SHA-256");

    let mut enc_key_material = [0u8; KEY_MATERIAL_SIZE];
    let mut mac_key_material = [0u8; KEY_MATERIAL_SIZE];
    enc_key_material.copy_from_slice(&okm[..KEY_MATERIAL_SIZE]);
    mac_key_material.copy_from_slice(&okm[KEY_MATERIAL_SIZE..]);
    okm.zeroize();

    HandshakeSecrets {
        enc_key_material,
        mac_key_material,
        transcript_hash,
    }
}

/// Derive the per-direction 32-byte AEAD key for `"sender"` or `"receiver"`.
pub fn derive_directional_key(enc_key_material: &[u8; KEY_MATERIAL_SIZE], label: &[u8]) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(Some(DIRECTIONAL_SALT), enc_key_material);
    let mut key = [0u8; 32];
    hk.expand(label, &mut key)
        .expect("32-byte HKDF output is always valid for SHA-256");
    key
}

/// Derive the `"sender"` directional AEAD key.
pub fn derive_sender_key(enc_key_material: &[u8; KEY_MATERIAL_SIZE]) -> [u8; 32] {
    derive_directional_key(enc_key_material, SENDER_LABEL)
}

/// Derive the `"receiver"` directional AEAD key.
pub fn derive_receiver_key(enc_key_material: &[u8; KEY_MATERIAL_SIZE]) -> [u8; 32] {
    derive_directional_key(enc_key_material, RECEIVER_LABEL)
}

/// The fixed 4-byte nonce prefix used for frames sealed in the `"sender"`
/// direction.
pub fn sender_nonce_prefix() -> [u8; 4] {
    let digest = Sha256::digest(SENDER_PREFIX_SEED);
    let mut prefix = [0u8; 4];
    prefix.copy_from_slice(&digest[..4]);
    prefix
}

/// The fixed 4-byte nonce prefix used for frames sealed in the `"receiver"`
/// direction.
pub fn receiver_nonce_prefix() -> [u8; 4] {
    let digest = Sha256::digest(RECEIVER_PREFIX_SEED);
    let mut prefix = [0u8; 4];
    prefix.copy_from_slice(&digest[..4]);
    prefix
}

/// Derive the 6-digit Short Authentication String from a transcript hash.
pub fn derive_sas(transcript_hash: &[u8; HASH_SIZE]) -> String {
    let prefix = u32::from_be_bytes(transcript_hash[..4].try_into().unwrap());
    let value = prefix % SAS_MODULUS;
    format!("{value:0width$}", width = SAS_DIGITS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn party<'a>(public_key: &'a [u8], nonce: &'a [u8]) -> HandshakeParty<'a> {
        HandshakeParty { public_key, nonce }
    }

    #[test]
    fn transcript_hash_is_symmetric_regardless_of_role() {
        let session_id = [0u8; 16];
        let pub_a = [0x01u8; 65];
        let pub_b = [0x02u8; 65];
        let nonce_a = [0xAAu8; 16];
        let nonce_b = [0xBBu8; 16];
        let shared_secret = [0x42u8; 32];

        let from_alice = derive_session_secrets(
            &shared_secret,
            &session_id,
            party(&pub_a, &nonce_a),
            party(&pub_b, &nonce_b),
        );
        let from_bob = derive_session_secrets(
            &shared_secret,
            &session_id,
            party(&pub_b, &nonce_b),
            party(&pub_a, &nonce_a),
        );

        assert_eq!(from_alice.transcript_hash, from_bob.transcript_hash);
        assert_eq!(from_alice.enc_key_material, from_bob.enc_key_material);
        assert_eq!(from_alice.mac_key_material, from_bob.mac_key_material);
        assert_eq!(
            derive_sas(&from_alice.transcript_hash),
            derive_sas(&from_bob.transcript_hash)
        );
    }

    #[test]
    fn sas_is_six_digits() {
        let hash = [0xFFu8; 32];
        let sas = derive_sas(&hash);
        assert_eq!(sas.len(), 6);
        assert!(sas.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn sas_zero_pads_small_values() {
        // Prefix bytes chosen so the big-endian u32 mod 1_000_000 is small.
        let mut hash = [0u8; 32];
        hash[0..4].copy_from_slice(&42u32.to_be_bytes());
        assert_eq!(derive_sas(&hash), "000042");
    }

    #[test]
    fn directional_keys_and_prefixes_differ() {
        let material = [0x11u8; 32];
        let sender_key = derive_sender_key(&material);
        let receiver_key = derive_receiver_key(&material);
        assert_ne!(sender_key, receiver_key);
        assert_ne!(sender_nonce_prefix(), receiver_nonce_prefix());
    }

    #[test]
    fn directional_derivation_is_deterministic() {
        let material = [0x77u8; 32];
        assert_eq!(derive_sender_key(&material), derive_sender_key(&material));
        assert_eq!(sender_nonce_prefix(), sender_nonce_prefix());
    }
}
