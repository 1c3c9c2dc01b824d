//! # Canonical Message
//!
//! Rebuilds the exact string the submitter signed from a parsed attestation.
//!
//! Format (version 1), no whitespace, keys in this order:
//!
//! ```text
//! {"projectId":"..","dataDate":"..","coreDataHash":"..","fileHashes":[".."],"timestamp":N}
//! ```
//!
//! Strings use standard JSON escaping, matching `JSON.stringify` on the
//! signing side.

use super::entities::Attestation;
use super::errors::SubmissionError;
use serde::Serialize;

/// Version of the signed message layout.
pub const CANONICAL_FORMAT_VERSION: u32 = 1;

/// Wire shape of the signed message. Field order is the serialized key order.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignedMessageV1<'a> {
    project_id: &'a str,
    data_date: &'a str,
    core_data_hash: &'a str,
    file_hashes: &'a [String],
    timestamp: i64,
}

/// Build the canonical signed message for an attestation.
pub fn canonical_message(attestation: &Attestation) -> Result<String, SubmissionError> {
    let message = SignedMessageV1 {
        project_id: &attestation.project_id,
        data_date: &attestation.data_date,
        core_data_hash: &attestation.core_data_hash,
        file_hashes: &attestation.file_hashes,
        timestamp: attestation.timestamp,
    };

    serde_json::to_string(&message).map_err(|e| SubmissionError::MalformedAttestation(e.to_string()))
}
