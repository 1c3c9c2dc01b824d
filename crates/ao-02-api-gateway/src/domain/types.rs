//! Request and response bodies of the HTTP surface.

use crate::domain::error::GatewayError;
use ao_01_submission_verification::{
    Address, FileRecord, SubmissionBatch, SubmissionReceipt, UploadedFile,
};
use serde::{Deserialize, Serialize};

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".into(),
            message: "Server is running".into(),
        }
    }
}

/// Error body shared by every route
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// Stable kind code
    pub error: String,
    /// Human-readable message
    pub details: String,
    /// Whether the same request may succeed later
    pub retryable: bool,
}

/// Fields of the `POST /api/upload` multipart form.
///
/// Text parts are kept verbatim; `files` parts are collected in order.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub project_id: String,
    pub project_description: String,
    pub data_date: String,
    pub core_data: String,
    pub hash_results: String,
    pub signature_data: String,
    pub signature: String,
    pub files: Vec<UploadedFile>,
}

impl UploadForm {
    /// Store a text part. Unknown names are ignored.
    pub fn set_text(&mut self, name: &str, value: String) {
        let slot = match name {
            "projectId" => &mut self.project_id,
            "projectDescription" => &mut self.project_description,
            "dataDate" => &mut self.data_date,
            "coreData" => &mut self.core_data,
            "hashResults" => &mut self.hash_results,
            "signatureData" => &mut self.signature_data,
            "signature" => &mut self.signature,
            _ => return,
        };
        *slot = value;
    }

    /// Build the pipeline input. Moves the files out of the form.
    pub fn take_batch(&mut self) -> Result<SubmissionBatch, GatewayError> {
        if self.signature_data.trim().is_empty() || self.signature.trim().is_empty() {
            return Err(GatewayError::MissingSignatureData);
        }

        let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.to_string());

        Ok(SubmissionBatch {
            project_id: self.project_id.clone(),
            project_description: non_empty(&self.project_description),
            attestation: self.signature_data.clone(),
            signature: self.signature.trim().to_string(),
            declared_hashes: non_empty(&self.hash_results),
            files: std::mem::take(&mut self.files),
        })
    }

    /// Success body for this form and its receipt.
    pub fn accepted(self, receipt: SubmissionReceipt) -> UploadResponse {
        UploadResponse {
            success: true,
            data: UploadData {
                project_id: self.project_id,
                project_description: self.project_description,
                data_date: self.data_date,
                core_data: self.core_data,
                hash_results: self.hash_results,
                signer_address: receipt.signer,
                uploaded_files: receipt.files,
            },
        }
    }
}

/// Body of a successful `POST /api/upload`
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub data: UploadData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadData {
    pub project_id: String,
    pub project_description: String,
    pub data_date: String,
    pub core_data: String,
    pub hash_results: String,
    pub signer_address: Address,
    pub uploaded_files: Vec<FileRecord>,
}
