//! # Outbound Ports (Driven Ports / SPI)
//!
//! Traits that define dependencies this subsystem needs.

use crate::domain::entities::{Address, AuthorizationDecision, StoredObject};
use crate::domain::errors::SubmissionError;
use thiserror::Error;

// =============================================================================
// Authorization
// =============================================================================

/// Read-only source of truth for "may this signer submit for this project".
///
/// Implementations must bound every remote call with a timeout.
#[async_trait::async_trait]
pub trait AuthorizationOracle: Send + Sync {
    /// Ask whether `signer` is an authorized submitter for `project_id`.
    ///
    /// # Errors
    /// * `SubmissionError::IdentifierTooLong` - project id does not fit a `bytes32`
    /// * `SubmissionError::AuthorizationCheckFailed` - the question could not be
    ///   answered (network, RPC, decode, timeout)
    async fn is_authorized(
        &self,
        signer: &Address,
        project_id: &str,
    ) -> Result<AuthorizationDecision, SubmissionError>;
}

// =============================================================================
// Content Store
// =============================================================================

/// Error from content store operations.
///
/// Messages carry the I/O error kind only, never a filesystem path.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Creating the project directory failed
    #[error("cannot prepare project directory: {0}")]
    Directory(std::io::ErrorKind),

    /// Writing or syncing the staged bytes failed
    #[error("cannot write staged content: {0}")]
    Write(std::io::ErrorKind),

    /// Renaming the staged file into place failed
    #[error("cannot commit object: {0}")]
    Commit(std::io::ErrorKind),

    /// No free object name after repeated same-millisecond collisions
    #[error("object name still taken after {0} attempts")]
    NameExhausted(u32),
}

/// Bytes written to a temporary location, not yet visible to readers.
///
/// Dropping a staged value without committing it removes it.
pub trait StagedContent: Send {
    /// Lowercase hex SHA-256 of the staged bytes.
    fn content_hash(&self) -> &str;

    /// Number of bytes staged.
    fn size(&self) -> u64;
}

/// Content-addressed object store.
///
/// Methods block on filesystem I/O; async callers run them on the blocking
/// thread pool.
pub trait ContentStore: Send + Sync + 'static {
    type Staged: StagedContent + 'static;

    /// Hash `content` and write it to a temporary file in `project_dir`.
    fn stage(&self, project_dir: &str, content: &[u8]) -> Result<Self::Staged, StoreError>;

    /// Atomically move staged content to its final name
    /// `{hash}_{arrival_ms}_{original_name}` and index it.
    fn commit(
        &self,
        staged: Self::Staged,
        arrival_ms: i64,
        original_name: &str,
    ) -> Result<StoredObject, StoreError>;

    /// Drop staged content without making it visible.
    fn discard(&self, staged: Self::Staged) {
        drop(staged);
    }

    /// Exact hash match, else a unique prefix of at least 8 hex characters.
    fn locate(&self, hash_or_prefix: &str) -> Option<StoredObject>;
}

// =============================================================================
// Time
// =============================================================================

/// Time source abstraction.
pub trait TimeSource: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}
