//! # Inbound Ports (Driving Ports / API)
//!
//! Traits that define the public API of this subsystem.

use crate::domain::entities::{StoredObject, SubmissionBatch, SubmissionReceipt};
use crate::domain::errors::SubmissionError;

/// Primary submission API.
///
/// Implementations must be thread-safe (`Send + Sync`); one call handles one
/// batch end-to-end.
#[async_trait::async_trait]
pub trait SubmissionApi: Send + Sync {
    /// Verify a batch and store its files.
    ///
    /// # Errors
    /// The first failing gate, see [`SubmissionError`]. Files committed before
    /// a per-file failure stay stored.
    async fn submit(&self, batch: SubmissionBatch) -> Result<SubmissionReceipt, SubmissionError>;

    /// Find a stored object by full content hash or a unique prefix of at
    /// least 8 hex characters.
    async fn locate(&self, hash_or_prefix: &str) -> Option<StoredObject>;
}
