//! Resume store: one JSON checkpoint file per transfer, so an interrupted
//! transfer can continue from the last confirmed sequence on reconnect.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{GhostDropError, TransferId};

/// Durable checkpoint for one transfer, persisted after every accepted
/// chunk so a crash loses at most the chunks since the last save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferResumeState {
    pub transfer_id: TransferId,
    pub file_name: String,
    pub file_size: u64,
    pub sha256_hex: String,
    pub chunk_size: u32,
    pub last_confirmed_sequence: u64,
    pub updated_at: DateTime<Utc>,
}

/// Persists [`TransferResumeState`] as `<root>/<transferID>.json`.
pub struct ResumeStore {
    root: PathBuf,
}

impl ResumeStore {
    /// `root` is typically `<app-data>/GhostDrop/Resume`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, transfer_id: &TransferId) -> PathBuf {
        self.root.join(format!("{transfer_id}.json"))
    }

    /// Write `state` atomically (write to a sibling temp file, then
    /// rename over the target).
    pub async fn save(&self, state: &TransferResumeState) -> Result<(), GhostDropError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| GhostDropError::Io(e.to_string()))?;

        let target = self.path_for(&state.transfer_id);
        let tmp = temp_path_for(&target);
        let body = serde_json::to_vec_pretty(state)
            .map_err(|e| GhostDropError::Io(format!("encoding resume state: {e}")))?;

        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| GhostDropError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(|e| GhostDropError::Io(e.to_string()))?;

        debug!(transfer_id = %state.transfer_id, seq = state.last_confirmed_sequence, "saved resume state");
        Ok(())
    }

    /// Load the checkpoint for `transfer_id`, or `None` if none exists.
    pub async fn load(
        &self,
        transfer_id: &TransferId,
    ) -> Result<Option<TransferResumeState>, GhostDropError> {
        let path = self.path_for(transfer_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let state = serde_json::from_slice(&bytes)
                    .map_err(|e| GhostDropError::Io(format!("decoding resume state: {e}")))?;
                Ok(Some(state))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GhostDropError::Io(e.to_string())),
        }
    }

    /// Remove the checkpoint for `transfer_id`, if any. Missing is not an
    /// error.
    pub async fn delete(&self, transfer_id: &TransferId) -> Result<(), GhostDropError> {
        let path = self.path_for(transfer_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(transfer_id = %transfer_id, "deleted resume state");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GhostDropError::Io(e.to_string())),
        }
    }
}

fn temp_path_for(target: &Path) -> PathBuf {
    let mut tmp = target.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state(transfer_id: TransferId, seq: u64) -> TransferResumeState {
        TransferResumeState {
            transfer_id,
            file_name: "photo.jpg".into(),
            file_size: 4096,
            sha256_hex: "ab".repeat(32),
            chunk_size: 128,
            last_confirmed_sequence: seq,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn missing_transfer_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResumeStore::new(dir.path());
        let id = TransferId::generate();
        assert_eq!(store.load(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResumeStore::new(dir.path());
        let id = TransferId::generate();
        let state = sample_state(id, 49);
        store.save(&state).await.unwrap();

        let loaded = store.load(&id).await.unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn save_overwrites_previous_progress() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResumeStore::new(dir.path());
        let id = TransferId::generate();
        store.save(&sample_state(id, 10)).await.unwrap();
        store.save(&sample_state(id, 20)).await.unwrap();

        let loaded = store.load(&id).await.unwrap().unwrap();
        assert_eq!(loaded.last_confirmed_sequence, 20);
    }

    #[tokio::test]
    async fn delete_removes_the_checkpoint_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResumeStore::new(dir.path());
        let id = TransferId::generate();
        store.save(&sample_state(id, 1)).await.unwrap();

        store.delete(&id).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap(), None);
        // Deleting again is not an error.
        store.delete(&id).await.unwrap();
    }
}
