//! # Submission Errors
//!
//! Every gate of the pipeline fails with one of these variants. Messages name
//! the offending file or field but never a filesystem path or RPC endpoint.

use thiserror::Error;

/// Errors that can occur while verifying or storing a submission.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionError {
    /// The attestation blob is not valid JSON of the expected shape
    #[error("Malformed attestation: {0}")]
    MalformedAttestation(String),

    /// The caller-declared hash list is not valid JSON of the expected shape
    #[error("Malformed declared file hashes: {0}")]
    MalformedDeclaredHashes(String),

    /// The batch carries no files
    #[error("Submission contains no files")]
    EmptyBatch,

    /// Decoded signature is not exactly 65 bytes
    #[error("Invalid signature length: {actual}, expected 65")]
    InvalidSignatureLength { actual: usize },

    /// Signature is not valid hex
    #[error("Invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    /// The curve rejected the signature (bad scalars, bad recovery id, ...)
    #[error("Failed to recover signer: {0}")]
    RecoveryFailure(String),

    /// Attestation timestamp is older than the freshness window
    #[error("Attestation expired: age {age_ms}ms exceeds {window_ms}ms")]
    AttestationExpired { age_ms: i64, window_ms: i64 },

    /// The same signed attestation was already accepted within the window
    #[error("Attestation already submitted")]
    AttestationReplayed,

    /// Attested project id differs from the declared one
    #[error("Project id mismatch: attested {attested}, declared {declared}")]
    ProjectIdMismatch { attested: String, declared: String },

    /// Declared hash list and attestation list differ in length
    #[error("File count mismatch: attested {attested}, declared {declared}")]
    FileCountMismatch { attested: usize, declared: usize },

    /// Number of uploaded files differs from the number of hashes they bind to
    #[error("Upload count mismatch: expected {expected}, uploaded {uploaded}")]
    UploadCountMismatch { expected: usize, uploaded: usize },

    /// Declared hash for a file differs from the attested one
    #[error("File hash does not match attestation: {0}")]
    FileHashMismatch(String),

    /// Hash of the received bytes differs from the declared one
    #[error("File content does not match declared hash: {file} (declared {declared}, computed {computed})")]
    ContentHashMismatch {
        file: String,
        declared: String,
        computed: String,
    },

    /// Project id does not fit a bytes32 key
    #[error("Identifier too long: {length} bytes exceeds 32")]
    IdentifierTooLong { length: usize },

    /// The oracle answered and the signer is not authorized
    #[error("Address not authorized: {signer} may not submit for project {project_id}")]
    AuthorizationDenied { signer: String, project_id: String },

    /// The oracle could not be asked (network, RPC or decode failure, timeout)
    #[error("Authorization check failed: {0}")]
    AuthorizationCheckFailed(String),

    /// Writing the file failed; nothing was left retrievable
    #[error("Failed to store {file}: {reason}")]
    StorageWriteFailed { file: String, reason: String },
}

impl SubmissionError {
    /// Whether the caller may retry the same submission after a backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubmissionError::AuthorizationCheckFailed(_)
                | SubmissionError::StorageWriteFailed { .. }
        )
    }

    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SubmissionError::MalformedAttestation(_) => "MalformedAttestation",
            SubmissionError::MalformedDeclaredHashes(_) => "MalformedDeclaredHashes",
            SubmissionError::EmptyBatch => "EmptyBatch",
            SubmissionError::InvalidSignatureLength { .. } => "InvalidSignatureLength",
            SubmissionError::InvalidSignatureEncoding(_) => "InvalidSignatureEncoding",
            SubmissionError::RecoveryFailure(_) => "RecoveryFailure",
            SubmissionError::AttestationExpired { .. } => "AttestationExpired",
            SubmissionError::AttestationReplayed => "AttestationReplayed",
            SubmissionError::ProjectIdMismatch { .. } => "ProjectIdMismatch",
            SubmissionError::FileCountMismatch { .. } => "FileCountMismatch",
            SubmissionError::UploadCountMismatch { .. } => "UploadCountMismatch",
            SubmissionError::FileHashMismatch(_) => "FileHashMismatch",
            SubmissionError::ContentHashMismatch { .. } => "ContentHashMismatch",
            SubmissionError::IdentifierTooLong { .. } => "IdentifierTooLong",
            SubmissionError::AuthorizationDenied { .. } => "AuthorizationDenied",
            SubmissionError::AuthorizationCheckFailed(_) => "AuthorizationCheckFailed",
            SubmissionError::StorageWriteFailed { .. } => "StorageWriteFailed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_errors_are_retryable() {
        assert!(SubmissionError::AuthorizationCheckFailed("timeout".into()).is_retryable());
        assert!(SubmissionError::StorageWriteFailed {
            file: "a.txt".into(),
            reason: "disk full".into(),
        }
        .is_retryable());

        assert!(!SubmissionError::AuthorizationDenied {
            signer: "0xabc".into(),
            project_id: "p1".into(),
        }
        .is_retryable());
        assert!(!SubmissionError::InvalidSignatureLength { actual: 64 }.is_retryable());
        assert!(!SubmissionError::AttestationExpired {
            age_ms: 300_001,
            window_ms: 300_000,
        }
        .is_retryable());
    }

    #[test]
    fn test_kind_matches_variant_name() {
        assert_eq!(SubmissionError::EmptyBatch.kind(), "EmptyBatch");
        assert_eq!(
            SubmissionError::FileHashMismatch("a.txt".into()).kind(),
            "FileHashMismatch"
        );
    }
}
