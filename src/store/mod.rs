//! Durable state: resumable-transfer checkpoints and incoming-file writes.

mod incoming;
mod resume;

pub use incoming::IncomingStore;
pub use resume::{ResumeStore, TransferResumeState};
