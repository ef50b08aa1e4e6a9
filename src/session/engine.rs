//! The session engine: drives handshake, SAS verification, chunked
//! send/receive with resume, and completion/cancellation, emitting
//! [`SessionEvent`]s as it goes.

use std::path::Path;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::core::{
    DeviceId, GhostDropConfig, GhostDropError, HandshakeNonce, SessionId, TransferId, HASH_SIZE,
};
use crate::crypto::{
    CryptoContext, EphemeralKeypair, HandshakeParty, HandshakeSecrets, Role, derive_sas,
    derive_session_secrets,
};
use crate::frame::{CapabilitiesPayload, Frame, HelloAckPayload, HelloPayload, MetadataPayload, VerifyPayload};
use crate::store::{IncomingStore, ResumeStore, TransferResumeState};
use crate::transport::NegotiatedTransport;

use super::events::{SessionEvent, SessionEvents, TransferProgress};
use super::state::{SessionState, SessionStateMachine};

/// Context for the file currently flowing through a receiver session.
struct ReceiveContext {
    transfer_id: TransferId,
    filename: String,
    size: u64,
    chunk_size: u32,
    expected_sha256: [u8; HASH_SIZE],
    last_confirmed_sequence: u64,
    received_bytes: u64,
    started_at: Instant,
}

/// Orchestrates one peer-to-peer transfer session.
pub struct SessionEngine {
    device_id: DeviceId,
    config: GhostDropConfig,
    resume_store: ResumeStore,
    incoming_store: IncomingStore,
    events: SessionEvents,

    state: SessionStateMachine,
    role: Option<Role>,
    transport: Option<NegotiatedTransport>,
    crypto: Option<CryptoContext>,

    session_id: Option<SessionId>,
    local_keypair: Option<EphemeralKeypair>,
    local_nonce: Option<HandshakeNonce>,
    secrets: Option<HandshakeSecrets>,
    local_capabilities: CapabilitiesPayload,
    remote_capabilities: Option<CapabilitiesPayload>,

    receiving: Option<ReceiveContext>,
}

impl SessionEngine {
    /// Construct an idle engine. Returns the engine plus a subscription to
    /// its event stream (further subscribers can be added via
    /// [`subscribe`](Self::subscribe)).
    pub fn new(
        device_id: DeviceId,
        config: GhostDropConfig,
        resume_store: ResumeStore,
        incoming_store: IncomingStore,
    ) -> (Self, broadcast::Receiver<SessionEvent>) {
        let local_capabilities = CapabilitiesPayload {
            supports_l2cap: true,
            max_chunk: config.default_max_chunk as u32,
            max_window: config.default_max_window as u32,
            protocol_version: crate::core::PROTOCOL_VERSION as u32,
        };
        let events = SessionEvents::default();
        let rx = events.subscribe();
        (
            Self {
                device_id,
                config,
                resume_store,
                incoming_store,
                events,
                state: SessionStateMachine::default(),
                role: None,
                transport: None,
                crypto: None,
                session_id: None,
                local_keypair: None,
                local_nonce: None,
                secrets: None,
                local_capabilities,
                remote_capabilities: None,
                receiving: None,
            },
            rx,
        )
    }

    /// Subscribe another consumer to this engine's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state.current()
    }

    fn transition(&mut self, to: SessionState) -> Result<(), GhostDropError> {
        let from = self.state.transition(to)?;
        if from != to {
            info!(?from, ?to, "session state transition");
            self.events.emit(SessionEvent::StateChanged(to));
        }
        Ok(())
    }

    fn fail(&mut self, message: impl Into<String>) -> GhostDropError {
        let message = message.into();
        warn!(%message, "session failing");
        let _ = self.state.transition(SessionState::Failed);
        self.events.emit(SessionEvent::StateChanged(SessionState::Failed));
        self.events.emit(SessionEvent::TransferFailed(message.clone()));
        GhostDropError::HandshakeFailed(message)
    }

    async fn recv_timeout(&mut self, timeout: Duration, scope: &str) -> Result<Frame, GhostDropError> {
        let transport = self.transport.as_mut().ok_or(GhostDropError::TransportClosed)?;
        match tokio::time::timeout(timeout, transport.recv()).await {
            Ok(Some(Ok(frame))) => Ok(frame),
            Ok(Some(Err(e))) => Err(GhostDropError::Transport(e)),
            Ok(None) => Err(GhostDropError::TransportClosed),
            Err(_) => Err(GhostDropError::Timeout(scope.to_string())),
        }
    }

    async fn recv_any(&mut self) -> Result<Frame, GhostDropError> {
        let transport = self.transport.as_mut().ok_or(GhostDropError::TransportClosed)?;
        match transport.recv().await {
            Some(Ok(frame)) => Ok(frame),
            Some(Err(e)) => Err(GhostDropError::Transport(e)),
            None => Err(GhostDropError::TransportClosed),
        }
    }

    /// Receive the next frame, transparently opening it if sealed.
    async fn recv_decrypted(&mut self, timeout: Option<Duration>, scope: &str) -> Result<Frame, GhostDropError> {
        let frame = match timeout {
            Some(t) => self.recv_timeout(t, scope).await?,
            None => self.recv_any().await?,
        };
        self.unwrap_if_sealed(frame)
    }

    fn unwrap_if_sealed(&self, frame: Frame) -> Result<Frame, GhostDropError> {
        match frame {
            Frame::Encrypted { .. } => {
                let crypto = self
                    .crypto
                    .as_ref()
                    .ok_or_else(|| GhostDropError::HandshakeFailed("encrypted frame before verification".into()))?;
                Ok(crypto.open(&frame)?)
            }
            other => Ok(other),
        }
    }

    async fn send_plain(&mut self, frame: Frame) -> Result<(), GhostDropError> {
        let transport = self.transport.as_ref().ok_or(GhostDropError::TransportClosed)?;
        transport.send(frame).await?;
        Ok(())
    }

    async fn send_sealed(&mut self, frame: Frame) -> Result<(), GhostDropError> {
        let sealed = {
            let crypto = self
                .crypto
                .as_mut()
                .ok_or_else(|| GhostDropError::HandshakeFailed("sealing before verification".into()))?;
            crypto.seal(&frame)?
        };
        self.send_plain(sealed).await
    }

    // ---------------------------------------------------------------
    // Handshake (shared shape, role-specific entry points)
    // ---------------------------------------------------------------

    /// Begin a session as the side that will send the file: transitions to
    /// `negotiating`, sends `Hello`, and awaits `HelloAck`.
    pub async fn start_as_sender(&mut self, transport: NegotiatedTransport) -> Result<(), GhostDropError> {
        self.transport = Some(transport);
        self.events
            .emit(SessionEvent::TransportSelected(self.transport.as_ref().unwrap().current_kind()));
        self.transition(SessionState::Negotiating)?;

        let keypair = EphemeralKeypair::generate();
        let session_id = SessionId::generate();
        let nonce = HandshakeNonce::generate();

        self.send_plain(Frame::Hello(HelloPayload {
            session_id,
            device_id: self.device_id,
            ephemeral_pub_key: keypair.public_bytes().to_vec(),
            nonce,
            capabilities: self.local_capabilities,
        }))
        .await?;

        let reply = self.recv_timeout(self.config.hello_ack_timeout, "HelloAck").await?;
        let Frame::HelloAck(ack) = reply else {
            return Err(self.fail("expected HelloAck"));
        };
        if ack.session_id != session_id {
            return Err(self.fail("HelloAck session id mismatch"));
        }

        let secrets = derive_session_secrets(
            &keypair
                .diffie_hellman(&ack.ephemeral_pub_key)
                .map_err(|e| self.fail(format!("ECDH failed: {e}")))?
                .raw_secret_bytes(),
            session_id.as_bytes(),
            HandshakeParty {
                public_key: keypair.public_bytes(),
                nonce: nonce.as_bytes(),
            },
            HandshakeParty {
                public_key: &ack.ephemeral_pub_key,
                nonce: ack.nonce.as_bytes(),
            },
        );
        let sas = derive_sas(&secrets.transcript_hash);

        self.send_plain(Frame::Verify(VerifyPayload {
            transcript_hash: secrets.transcript_hash,
            sas_code: sas.clone(),
        }))
        .await?;

        self.session_id = Some(session_id);
        self.local_keypair = Some(keypair);
        self.local_nonce = Some(nonce);
        self.secrets = Some(secrets);
        self.role = Some(Role::Sender);

        self.transition(SessionState::Verifying)?;
        self.events.emit(SessionEvent::HandshakeSas(sas));
        self.events.emit(SessionEvent::VerificationRequired);
        Ok(())
    }

    /// Begin a session as the side that will receive the file: awaits
    /// `Hello`, replies `HelloAck`, then awaits the peer's `Verify`.
    pub async fn start_as_receiver(&mut self, transport: NegotiatedTransport) -> Result<(), GhostDropError> {
        self.transport = Some(transport);
        self.events
            .emit(SessionEvent::TransportSelected(self.transport.as_ref().unwrap().current_kind()));
        self.transition(SessionState::Advertising)?;

        let hello = match self.recv_any().await? {
            Frame::Hello(payload) => payload,
            _ => return Err(self.fail("expected Hello")),
        };
        self.remote_capabilities = Some(hello.capabilities);
        self.transition(SessionState::Negotiating)?;

        let keypair = EphemeralKeypair::generate();
        let nonce = HandshakeNonce::generate();

        self.send_plain(Frame::HelloAck(HelloAckPayload {
            session_id: hello.session_id,
            ephemeral_pub_key: keypair.public_bytes().to_vec(),
            nonce,
        }))
        .await?;

        let secrets = derive_session_secrets(
            &keypair
                .diffie_hellman(&hello.ephemeral_pub_key)
                .map_err(|e| self.fail(format!("ECDH failed: {e}")))?
                .raw_secret_bytes(),
            hello.session_id.as_bytes(),
            HandshakeParty {
                public_key: keypair.public_bytes(),
                nonce: nonce.as_bytes(),
            },
            HandshakeParty {
                public_key: &hello.ephemeral_pub_key,
                nonce: hello.nonce.as_bytes(),
            },
        );
        let sas = derive_sas(&secrets.transcript_hash);

        self.session_id = Some(hello.session_id);
        self.local_keypair = Some(keypair);
        self.local_nonce = Some(nonce);
        self.secrets = Some(secrets.clone());
        self.role = Some(Role::Receiver);

        self.transition(SessionState::Verifying)?;
        self.events.emit(SessionEvent::HandshakeSas(sas.clone()));
        self.events.emit(SessionEvent::VerificationRequired);

        let verify = match self.recv_timeout(self.config.verify_ack_timeout, "Verify").await? {
            Frame::Verify(payload) => payload,
            _ => return Err(self.fail("expected Verify")),
        };
        if verify.transcript_hash != secrets.transcript_hash || verify.sas_code != sas {
            return Err(self.fail("transcript/SAS mismatch"));
        }
        Ok(())
    }

    /// Record the local user's accept/reject decision on the SAS, send
    /// `VerifyAck`, and await the peer's. Shared by both roles.
    pub async fn confirm_sas(&mut self, matched: bool) -> Result<(), GhostDropError> {
        self.send_plain(Frame::VerifyAck(matched)).await?;
        if !matched {
            self.transition(SessionState::Failed)?;
            self.events.emit(SessionEvent::TransferFailed("SAS rejected locally".into()));
            return Err(GhostDropError::VerificationRejected);
        }

        let peer_ack = match self.recv_timeout(self.config.verify_ack_timeout, "VerifyAck").await? {
            Frame::VerifyAck(accepted) => accepted,
            _ => return Err(self.fail("expected VerifyAck")),
        };
        if !peer_ack {
            self.transition(SessionState::Failed)?;
            self.events.emit(SessionEvent::TransferFailed("peer rejected SAS".into()));
            return Err(GhostDropError::VerificationRejected);
        }

        let secrets = self
            .secrets
            .as_ref()
            .expect("secrets are derived before verification completes");
        let role = self.role.expect("role is set once a handshake starts");
        self.crypto = Some(CryptoContext::new(secrets, role));
        self.transition(SessionState::Transferring)?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Sender transfer
    // ---------------------------------------------------------------

    /// Read `path`, send `Metadata`, then stream chunks starting from
    /// wherever the receiver's `Resume` reply says to continue.
    ///
    /// `resume_transfer_id` lets a caller resume a specific prior transfer
    /// across a reconnect: the receiver's resume store is keyed by
    /// `transferID`, so a fresh random ID (the default when `None`) can
    /// never match an existing checkpoint. The UI layer is responsible for
    /// persisting which `TransferId` a given file/peer pairing used, the
    /// same way it persists the pending-transfer identity across process
    /// restarts; this engine only persists the receive-side checkpoint.
    pub async fn send_file(
        &mut self,
        path: &Path,
        mime_type: &str,
        requested_chunk_size: Option<u32>,
        resume_transfer_id: Option<TransferId>,
    ) -> Result<(), GhostDropError> {
        if self.state.current() != SessionState::Transferring {
            return Err(self.fail("send_file called outside transferring state"));
        }

        let contents = tokio::fs::read(path).await.map_err(GhostDropError::from)?;
        let size = contents.len() as u64;
        let sha256: [u8; HASH_SIZE] = Sha256::digest(&contents).into();

        let local_max_chunk = self.config.default_max_chunk as u32;
        let chunk_size = requested_chunk_size.unwrap_or(local_max_chunk).min(local_max_chunk).max(1);

        let transfer_id = resume_transfer_id.unwrap_or_else(TransferId::generate);
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());

        self.send_sealed(Frame::Metadata(MetadataPayload {
            transfer_id,
            filename: filename.clone(),
            size,
            mime_type: mime_type.to_string(),
            sha256,
            chunk_size,
        }))
        .await?;

        let resume = match self.recv_any().await? {
            Frame::Resume { transfer_id: id, last_confirmed_seq } if id == transfer_id => last_confirmed_seq,
            Frame::Resume { .. } => return Err(self.fail("Resume for unexpected transfer id")),
            _ => return Err(self.fail("expected Resume")),
        };

        let total_chunks = size.div_ceil(chunk_size as u64);
        let start_seq = resume.min(total_chunks);

        let started_at = Instant::now();
        let mut bytes_sent = start_seq * chunk_size as u64;

        for seq in start_seq..total_chunks {
            let offset = (seq * chunk_size as u64) as usize;
            let end = (offset + chunk_size as usize).min(contents.len());
            let chunk = &contents[offset..end];

            let sealed = {
                let crypto = self.crypto.as_ref().expect("crypto context set before transferring");
                crypto.seal_data_payload(seq, chunk)?
            };
            self.send_plain(Frame::Data { seq, payload: sealed }).await?;

            bytes_sent += chunk.len() as u64;
            let elapsed = started_at.elapsed().as_secs_f64().max(f64::EPSILON);
            let bytes_per_sec = bytes_sent as f64 / elapsed;
            let remaining = size.saturating_sub(bytes_sent);
            let eta_sec = if bytes_per_sec > 0.0 {
                Some(remaining as f64 / bytes_per_sec)
            } else {
                None
            };
            self.events.emit(SessionEvent::TransferProgress(TransferProgress {
                bytes: bytes_sent,
                total: size,
                bytes_per_sec,
                eta_sec,
                transport: self.transport.as_ref().unwrap().current_kind(),
            }));
        }

        self.send_sealed(Frame::Complete { transfer_id, sha256 }).await?;
        self.transition(SessionState::Completed)?;
        self.events.emit(SessionEvent::TransferCompleted(filename));
        Ok(())
    }

    /// Cancel the session: best-effort `Cancel` send, transition to
    /// `cancelled`, tear down the transport.
    pub async fn cancel(&mut self, reason: impl Into<String>) -> Result<(), GhostDropError> {
        let reason = reason.into();
        if self.crypto.is_some() {
            let _ = self.send_sealed(Frame::Cancel(reason.clone())).await;
        } else {
            let _ = self.send_plain(Frame::Cancel(reason.clone())).await;
        }
        self.transition(SessionState::Cancelled)?;
        if let Some(transport) = self.transport.as_mut() {
            transport.close().await;
        }
        Err(GhostDropError::Cancelled(reason))
    }

    // ---------------------------------------------------------------
    // Receiver transfer
    // ---------------------------------------------------------------

    /// Run the receive loop until the transfer completes, fails, or the
    /// peer cancels.
    pub async fn run_receive_loop(&mut self) -> Result<(), GhostDropError> {
        loop {
            let frame = self.recv_decrypted(None, "receive loop").await?;
            match frame {
                Frame::Metadata(meta) => self.on_metadata(meta).await?,
                Frame::Data { seq, payload } => self.on_data(seq, payload).await?,
                Frame::Complete { transfer_id, sha256 } => {
                    self.on_complete(transfer_id, sha256).await?;
                    return Ok(());
                }
                Frame::Cancel(reason) => {
                    return Err(self.fail(format!("peer cancelled: {reason}")));
                }
                Frame::Ping(_) => continue,
                other => warn!(kind = other.kind(), "ignoring unexpected frame in receive loop"),
            }
        }
    }

    async fn on_metadata(&mut self, meta: MetadataPayload) -> Result<(), GhostDropError> {
        self.incoming_store.prepare(&meta.transfer_id, &meta.filename).await?;
        let resume = self.resume_store.load(&meta.transfer_id).await?;
        let last_confirmed_sequence = resume.map(|r| r.last_confirmed_sequence).unwrap_or(0);

        self.receiving = Some(ReceiveContext {
            transfer_id: meta.transfer_id,
            filename: meta.filename,
            size: meta.size,
            chunk_size: meta.chunk_size,
            expected_sha256: meta.sha256,
            last_confirmed_sequence,
            received_bytes: last_confirmed_sequence * meta.chunk_size as u64,
            started_at: Instant::now(),
        });

        self.send_plain(Frame::Resume {
            transfer_id: meta.transfer_id,
            last_confirmed_seq: last_confirmed_sequence,
        })
        .await
    }

    async fn on_data(&mut self, seq: u64, payload: Vec<u8>) -> Result<(), GhostDropError> {
        let Some(ctx) = self.receiving.as_mut() else {
            return Err(self.fail("Data received before Metadata"));
        };
        let plaintext = {
            let crypto = self.crypto.as_ref().expect("crypto context set before transferring");
            crypto.open_data_payload(seq, &payload)?
        };

        let offset = seq * ctx.chunk_size as u64;
        self.incoming_store
            .write_chunk(&ctx.transfer_id, &ctx.filename, offset, &plaintext)
            .await?;

        let ctx = self.receiving.as_mut().unwrap();
        ctx.last_confirmed_sequence = ctx.last_confirmed_sequence.max(seq);
        ctx.received_bytes = ctx.received_bytes.max(offset + plaintext.len() as u64);

        let state = TransferResumeState {
            transfer_id: ctx.transfer_id,
            file_name: ctx.filename.clone(),
            file_size: ctx.size,
            sha256_hex: hex_encode(&ctx.expected_sha256),
            chunk_size: ctx.chunk_size,
            last_confirmed_sequence: ctx.last_confirmed_sequence,
            updated_at: chrono::Utc::now(),
        };
        self.resume_store.save(&state).await?;

        let cum_seq = ctx.last_confirmed_sequence;
        let bytes = ctx.received_bytes;
        let total = ctx.size;
        let elapsed = ctx.started_at.elapsed().as_secs_f64().max(f64::EPSILON);
        let bytes_per_sec = bytes as f64 / elapsed;
        let eta_sec = if bytes_per_sec > 0.0 {
            Some(total.saturating_sub(bytes) as f64 / bytes_per_sec)
        } else {
            None
        };

        self.send_plain(Frame::Ack { cum_seq, nack_bitmap: 0 }).await?;
        self.events.emit(SessionEvent::TransferProgress(TransferProgress {
            bytes,
            total,
            bytes_per_sec,
            eta_sec,
            transport: self.transport.as_ref().unwrap().current_kind(),
        }));
        Ok(())
    }

    async fn on_complete(&mut self, transfer_id: TransferId, sha256: [u8; HASH_SIZE]) -> Result<(), GhostDropError> {
        let Some(ctx) = self.receiving.take() else {
            return Err(self.fail("Complete received before Metadata"));
        };
        if ctx.transfer_id != transfer_id {
            self.receiving = Some(ctx);
            return Err(self.fail("Complete for unexpected transfer id"));
        }

        let actual = self.incoming_store.finalize(&transfer_id, &ctx.filename).await?;
        if actual != sha256 || actual != ctx.expected_sha256 {
            return Err(self.fail("final SHA256 mismatch"));
        }

        self.resume_store.delete(&transfer_id).await?;
        self.transition(SessionState::Completed)?;
        self.events.emit(SessionEvent::TransferCompleted(ctx.filename));
        Ok(())
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
