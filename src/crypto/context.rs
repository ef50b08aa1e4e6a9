//! Per-session cryptographic context: combines the derived directional
//! keys with a send-sequence counter and exposes `seal`/`open` over whole
//! frames, plus raw seal/open for bulk chunk payloads.

use zeroize::Zeroize;

use crate::core::CryptoError;
use crate::frame::{self, Frame};

use super::aead;
use super::handshake::{
    HandshakeSecrets, derive_receiver_key, derive_sender_key, receiver_nonce_prefix,
    sender_nonce_prefix,
};
use super::nonce::{build_nonce, sequence_aad};

/// Which direction this context plays. The sender encrypts with the
/// `"sender"`-derived key; the receiver encrypts with the
/// `"receiver"`-derived key. Each side decrypts with the *other*
/// direction's key, so only the intended peer can open a sealed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The side sending the file.
    Sender,
    /// The side receiving the file.
    Receiver,
}

/// Sequence-bound AEAD context for one session, held by the session engine
/// and never shared across components.
pub struct CryptoContext {
    encrypt_key: [u8; 32],
    decrypt_key: [u8; 32],
    encrypt_prefix: [u8; 4],
    decrypt_prefix: [u8; 4],
    send_seq: u64,
}

impl Drop for CryptoContext {
    fn drop(&mut self) {
        self.encrypt_key.zeroize();
        self.decrypt_key.zeroize();
    }
}

impl CryptoContext {
    /// Derive directional keys and nonce prefixes for `role` from the
    /// session's handshake secrets.
    pub fn new(secrets: &HandshakeSecrets, role: Role) -> Self {
        let sender_key = derive_sender_key(&secrets.enc_key_material);
        let receiver_key = derive_receiver_key(&secrets.enc_key_material);
        let sender_prefix = sender_nonce_prefix();
        let receiver_prefix = receiver_nonce_prefix();

        match role {
            Role::Sender => Self {
                encrypt_key: sender_key,
                decrypt_key: receiver_key,
                encrypt_prefix: sender_prefix,
                decrypt_prefix: receiver_prefix,
                send_seq: 0,
            },
            Role::Receiver => Self {
                encrypt_key: receiver_key,
                decrypt_key: sender_key,
                encrypt_prefix: receiver_prefix,
                decrypt_prefix: sender_prefix,
                send_seq: 0,
            },
        }
    }

    /// The next sequence number `seal` will use, without consuming it.
    pub fn next_send_sequence(&self) -> u64 {
        self.send_seq
    }

    /// Encode `frame`, seal it under the current send sequence, and wrap
    /// the result as `Frame::Encrypted`. Increments the send sequence.
    pub fn seal(&mut self, frame: &Frame) -> Result<Frame, CryptoError> {
        let encoded = frame::encode(frame);
        let seq = self.send_seq;
        let nonce = build_nonce(&self.encrypt_prefix, seq);
        let combined = aead::seal(&self.encrypt_key, &nonce, &sequence_aad(seq), &encoded)?;
        self.send_seq += 1;
        Ok(Frame::Encrypted { seq, combined })
    }

    /// Open a `Frame::Encrypted`, returning the decoded inner frame.
    pub fn open(&self, frame: &Frame) -> Result<Frame, CryptoError> {
        let Frame::Encrypted { seq, combined } = frame else {
            return Err(CryptoError::Decryption);
        };
        let nonce = build_nonce(&self.decrypt_prefix, *seq);
        let plaintext = aead::open(&self.decrypt_key, &nonce, &sequence_aad(*seq), combined)?;
        frame::decode(&plaintext).map_err(|_| CryptoError::Decryption)
    }

    /// Seal raw chunk bytes for a `Data(seq, ..)` frame. Unlike [`seal`],
    /// the sequence is the chunk's own sequence number, not the internal
    /// counter — data frames are not additionally wrapped in `Encrypted`.
    pub fn seal_data_payload(&self, seq: u64, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce = build_nonce(&self.encrypt_prefix, seq);
        aead::seal(&self.encrypt_key, &nonce, &sequence_aad(seq), plaintext)
    }

    /// Open raw chunk bytes carried in a `Data(seq, ..)` frame.
    pub fn open_data_payload(&self, seq: u64, combined: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce = build_nonce(&self.decrypt_prefix, seq);
        aead::open(&self.decrypt_key, &nonce, &sequence_aad(seq), combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::handshake::{HandshakeParty, derive_session_secrets};

    fn paired_secrets() -> HandshakeSecrets {
        derive_session_secrets(
            &[0x99u8; 32],
            &[0u8; 16],
            HandshakeParty {
                public_key: &[0x01; 65],
                nonce: &[0xAA; 16],
            },
            HandshakeParty {
                public_key: &[0x02; 65],
                nonce: &[0xBB; 16],
            },
        )
    }

    #[test]
    fn receiver_opens_what_sender_sealed() {
        let secrets = paired_secrets();
        let mut sender_ctx = CryptoContext::new(&secrets, Role::Sender);
        let receiver_ctx = CryptoContext::new(&secrets, Role::Receiver);

        let frame = Frame::Ping(123);
        let sealed = sender_ctx.seal(&frame).unwrap();
        let opened = receiver_ctx.open(&sealed).unwrap();
        assert_eq!(opened.kind(), frame.kind());
    }

    #[test]
    fn sender_cannot_open_its_own_sealed_frame() {
        let secrets = paired_secrets();
        let mut sender_ctx = CryptoContext::new(&secrets, Role::Sender);

        let sealed = sender_ctx.seal(&Frame::Ping(1)).unwrap();
        assert!(sender_ctx.open(&sealed).is_err());
    }

    #[test]
    fn send_sequence_increments_and_binds_the_nonce() {
        let secrets = paired_secrets();
        let mut ctx = CryptoContext::new(&secrets, Role::Sender);
        assert_eq!(ctx.next_send_sequence(), 0);
        ctx.seal(&Frame::Ping(1)).unwrap();
        assert_eq!(ctx.next_send_sequence(), 1);
        let Frame::Encrypted { seq, .. } = ctx.seal(&Frame::Ping(2)).unwrap() else {
            panic!("expected Encrypted");
        };
        assert_eq!(seq, 1);
    }

    #[test]
    fn data_payload_round_trips_and_is_not_double_wrapped() {
        let secrets = paired_secrets();
        let sender_ctx = CryptoContext::new(&secrets, Role::Sender);
        let receiver_ctx = CryptoContext::new(&secrets, Role::Receiver);

        let chunk = b"some file bytes";
        let combined = sender_ctx.seal_data_payload(42, chunk).unwrap();
        let opened = receiver_ctx.open_data_payload(42, &combined).unwrap();
        assert_eq!(opened, chunk);
    }

    #[test]
    fn corrupting_sealed_data_payload_fails_decryption() {
        let secrets = paired_secrets();
        let sender_ctx = CryptoContext::new(&secrets, Role::Sender);
        let receiver_ctx = CryptoContext::new(&secrets, Role::Receiver);

        let mut combined = sender_ctx.seal_data_payload(1, b"payload").unwrap();
        let last = combined.len() - 1;
        combined[last] ^= 0x80;

        assert!(matches!(
            receiver_ctx.open_data_payload(1, &combined),
            Err(CryptoError::Decryption)
        ));
    }
}
