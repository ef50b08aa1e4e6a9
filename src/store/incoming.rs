//! Incoming store: writes arriving chunks at their byte offset and
//! computes the final digest once a transfer completes.

use std::path::PathBuf;

use sha2::{Digest, Sha256};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::debug;

use crate::core::{GhostDropError, TransferId, HASH_SIZE};

/// Writes a transfer's bytes under `<root>/<transferID>/<filename>`.
pub struct IncomingStore {
    root: PathBuf,
}

impl IncomingStore {
    /// `root` is typically `<app-data>/GhostDrop/Incoming`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, transfer_id: &TransferId, filename: &str) -> PathBuf {
        self.root.join(transfer_id.to_string()).join(filename)
    }

    /// Ensure the transfer's directory and (possibly empty) target file
    /// exist, ready to receive chunk writes.
    pub async fn prepare(
        &self,
        transfer_id: &TransferId,
        filename: &str,
    ) -> Result<(), GhostDropError> {
        let path = self.path_for(transfer_id, filename);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GhostDropError::Io(e.to_string()))?;
        }
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await
            .map_err(|e| GhostDropError::Io(e.to_string()))?;
        Ok(())
    }

    /// Write `payload` at `offset`, creating the file if it does not yet
    /// exist. Safe to call repeatedly for the same offset (retransmission
    /// rewrites the same bytes).
    pub async fn write_chunk(
        &self,
        transfer_id: &TransferId,
        filename: &str,
        offset: u64,
        payload: &[u8],
    ) -> Result<(), GhostDropError> {
        let path = self.path_for(transfer_id, filename);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await
            .map_err(|e| GhostDropError::Io(e.to_string()))?;

        file.seek(std::io::SeekFrom::Start(offset))
            .await
            .map_err(|e| GhostDropError::Io(e.to_string()))?;
        file.write_all(payload)
            .await
            .map_err(|e| GhostDropError::Io(e.to_string()))?;
        Ok(())
    }

    /// Read the whole file back and return its SHA-256 digest.
    pub async fn finalize(
        &self,
        transfer_id: &TransferId,
        filename: &str,
    ) -> Result<[u8; HASH_SIZE], GhostDropError> {
        let path = self.path_for(transfer_id, filename);
        let contents = tokio::fs::read(&path)
            .await
            .map_err(|e| GhostDropError::Io(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let digest: [u8; HASH_SIZE] = hasher.finalize().into();
        debug!(transfer_id = %transfer_id, bytes = contents.len(), "finalized incoming file");
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn out_of_order_chunk_writes_land_at_the_right_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let store = IncomingStore::new(dir.path());
        let id = TransferId::generate();
        store.prepare(&id, "file.bin").await.unwrap();

        store.write_chunk(&id, "file.bin", 4, b"BBBB").await.unwrap();
        store.write_chunk(&id, "file.bin", 0, b"AAAA").await.unwrap();

        let path = dir.path().join(id.to_string()).join("file.bin");
        let contents = tokio::fs::read(path).await.unwrap();
        assert_eq!(contents, b"AAAABBBB");
    }

    #[tokio::test]
    async fn retransmitted_chunk_overwrites_identically() {
        let dir = tempfile::tempdir().unwrap();
        let store = IncomingStore::new(dir.path());
        let id = TransferId::generate();
        store.prepare(&id, "file.bin").await.unwrap();

        store.write_chunk(&id, "file.bin", 0, b"AAAA").await.unwrap();
        store.write_chunk(&id, "file.bin", 0, b"AAAA").await.unwrap();

        let digest = store.finalize(&id, "file.bin").await.unwrap();
        let mut hasher = Sha256::new();
        hasher.update(b"AAAA");
        let expected: [u8; HASH_SIZE] = hasher.finalize().into();
        assert_eq!(digest, expected);
    }

    #[tokio::test]
    async fn finalize_hashes_full_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = IncomingStore::new(dir.path());
        let id = TransferId::generate();
        store.prepare(&id, "file.bin").await.unwrap();
        store.write_chunk(&id, "file.bin", 0, &[7u8; 64]).await.unwrap();

        let digest = store.finalize(&id, "file.bin").await.unwrap();
        let mut hasher = Sha256::new();
        hasher.update([7u8; 64]);
        let expected: [u8; HASH_SIZE] = hasher.finalize().into();
        assert_eq!(digest, expected);
    }
}
