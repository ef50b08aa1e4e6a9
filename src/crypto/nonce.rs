//! AEAD nonce construction: a 4-byte directional prefix concatenated with
//! an 8-byte big-endian sequence number.

use crate::core::AEAD_NONCE_SIZE;

/// Build the 12-byte AES-GCM nonce for a given directional prefix and
/// sequence number.
pub fn build_nonce(prefix: &[u8; 4], sequence: u64) -> [u8; AEAD_NONCE_SIZE] {
    let mut nonce = [0u8; AEAD_NONCE_SIZE];
    nonce[..4].copy_from_slice(prefix);
    nonce[4..].copy_from_slice(&sequence.to_be_bytes());
    nonce
}

/// Associated data is the sequence number alone, as a big-endian `u64`.
pub fn sequence_aad(sequence: u64) -> [u8; 8] {
    sequence.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_layout_is_prefix_then_sequence() {
        let prefix = [0xAA, 0xBB, 0xCC, 0xDD];
        let nonce = build_nonce(&prefix, 0x0102030405060708);
        assert_eq!(&nonce[..4], &prefix);
        assert_eq!(&nonce[4..], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn distinct_sequences_give_distinct_nonces() {
        let prefix = [0, 0, 0, 0];
        assert_ne!(build_nonce(&prefix, 0), build_nonce(&prefix, 1));
    }
}
