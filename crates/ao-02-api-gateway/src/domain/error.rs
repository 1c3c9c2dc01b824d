//! Gateway error types and their HTTP mapping.
//!
//! Every error response is `{"error": <kind>, "details": <message>, "retryable": <bool>}`.

use crate::domain::types::ErrorBody;
use ao_01_submission_verification::SubmissionError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Gateway-level errors
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// `signatureData` or `signature` missing from the upload form
    #[error("Incomplete signature data: signatureData and signature are required")]
    MissingSignatureData,

    /// Body is not a readable multipart form
    #[error("Failed to parse multipart form: {0}")]
    Multipart(String),

    /// The pipeline rejected or failed the submission
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    /// No stored object for the requested hash
    #[error("No file found with hash: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Stable kind code used in the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::MissingSignatureData => "MissingSignatureData",
            GatewayError::Multipart(_) => "MalformedRequest",
            GatewayError::Submission(e) => e.kind(),
            GatewayError::NotFound(_) => "NotFound",
            GatewayError::Config(_) | GatewayError::Bind(_) | GatewayError::Internal(_) => {
                "InternalError"
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingSignatureData | GatewayError::Multipart(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::Submission(e) => submission_status(e),
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Config(_) | GatewayError::Bind(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Submission(e) => e.is_retryable(),
            _ => false,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.kind().to_string(),
            details: self.to_string(),
            retryable: self.is_retryable(),
        }
    }
}

/// HTTP status for a pipeline error.
pub fn submission_status(error: &SubmissionError) -> StatusCode {
    match error {
        SubmissionError::AttestationExpired { .. } | SubmissionError::AttestationReplayed => {
            StatusCode::UNAUTHORIZED
        }
        SubmissionError::AuthorizationDenied { .. } => StatusCode::FORBIDDEN,
        SubmissionError::AuthorizationCheckFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
        SubmissionError::StorageWriteFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        SubmissionError::MalformedAttestation(_)
        | SubmissionError::MalformedDeclaredHashes(_)
        | SubmissionError::EmptyBatch
        | SubmissionError::InvalidSignatureLength { .. }
        | SubmissionError::InvalidSignatureEncoding(_)
        | SubmissionError::RecoveryFailure(_)
        | SubmissionError::ProjectIdMismatch { .. }
        | SubmissionError::FileCountMismatch { .. }
        | SubmissionError::UploadCountMismatch { .. }
        | SubmissionError::FileHashMismatch(_)
        | SubmissionError::ContentHashMismatch { .. }
        | SubmissionError::IdentifierTooLong { .. } => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
