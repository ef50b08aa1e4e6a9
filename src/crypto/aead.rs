//! AES-GCM seal/open primitives over a raw key and 12-byte nonce.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};

use crate::core::CryptoError;

/// Seal `plaintext` under `key`/`nonce`, returning `ciphertext || tag`.
pub fn seal(key: &[u8; 32], nonce: &[u8; 12], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::Encryption)?;
    let nonce = Nonce::from_slice(nonce);
    let payload = aes_gcm::aead::Payload { msg: plaintext, aad };
    cipher
        .encrypt(nonce, payload)
        .map_err(|_| CryptoError::Encryption)
}

/// Open a `ciphertext || tag` combined buffer, returning the plaintext.
pub fn open(key: &[u8; 32], nonce: &[u8; 12], aad: &[u8], combined: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::Decryption)?;
    let nonce = Nonce::from_slice(nonce);
    let payload = aes_gcm::aead::Payload { msg: combined, aad };
    cipher
        .decrypt(nonce, payload)
        .map_err(|_| CryptoError::Decryption)
}
