//! # Domain Entities
//!
//! Core data structures for attested submissions.

use super::errors::SubmissionError;
use super::recovery::keccak256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// =============================================================================
// Signer Identity
// =============================================================================

/// Ethereum-style address derived from public key (last 20 bytes of keccak256(pubkey))
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// EIP-55 mixed-case checksum encoding, `0x`-prefixed.
    pub fn to_checksum_hex(&self) -> String {
        let lower = hex::encode(self.0);
        let digest = keccak256(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                digest[i / 2] >> 4
            } else {
                digest[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum_hex())
    }
}

impl FromStr for Address {
    type Err = String;

    /// Parses `0x`-prefixed or bare hex. Checksum casing is not enforced.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() != 40 {
            return Err(format!("address must be 40 hex characters, got {}", digits.len()));
        }
        let bytes = hex::decode(digits).map_err(|e| e.to_string())?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Address(out))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum_hex())
    }
}

// =============================================================================
// Submission Input
// =============================================================================

/// Signed statement binding a project, a list of file hashes and a time.
///
/// Never mutated after parsing.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    pub project_id: String,
    pub data_date: String,
    pub core_data_hash: String,
    /// Hex content hashes, paired by position with the uploaded files
    pub file_hashes: Vec<String>,
    /// Milliseconds since the Unix epoch, set by the signer
    pub timestamp: i64,
}

impl Attestation {
    /// Parse the JSON attestation blob sent alongside the files.
    pub fn from_json(raw: &str) -> Result<Self, SubmissionError> {
        serde_json::from_str(raw).map_err(|e| SubmissionError::MalformedAttestation(e.to_string()))
    }
}

/// One entry of the caller-declared hash list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredFileHash {
    pub file_name: String,
    #[serde(default)]
    pub file_size: u64,
    /// Hex hash, optionally `0x`-prefixed
    pub hash_value: String,
}

impl DeclaredFileHash {
    /// Parse the JSON array of declared hashes.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, SubmissionError> {
        serde_json::from_str(raw)
            .map_err(|e| SubmissionError::MalformedDeclaredHashes(e.to_string()))
    }
}

/// A received file, as handed over by the transport layer.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub content: Vec<u8>,
}

/// Everything the transport layer extracted from one upload request.
#[derive(Clone, Debug)]
pub struct SubmissionBatch {
    pub project_id: String,
    pub project_description: Option<String>,
    /// Raw JSON attestation
    pub attestation: String,
    /// Hex signature, `0x` optional
    pub signature: String,
    /// Raw JSON array of [`DeclaredFileHash`], if the caller sent one
    pub declared_hashes: Option<String>,
    pub files: Vec<UploadedFile>,
}

// =============================================================================
// Authorization
// =============================================================================

/// Answer of the authorization oracle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationDecision {
    pub authorized: bool,
    pub diagnostic: Option<String>,
}

impl AuthorizationDecision {
    pub fn allow() -> Self {
        Self {
            authorized: true,
            diagnostic: None,
        }
    }

    pub fn deny(diagnostic: impl Into<String>) -> Self {
        Self {
            authorized: false,
            diagnostic: Some(diagnostic.into()),
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// A committed object in the content store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// Lowercase hex SHA-256 of the bytes
    pub content_hash: String,
    /// Name of the object file on disk
    pub object_name: String,
    /// Path relative to the upload root, safe to show to callers
    pub relative_path: String,
    /// Absolute path; internal use only
    pub path: PathBuf,
    pub size: u64,
}

/// Outcome for one accepted file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub file_name: String,
    pub file_size: u64,
    pub file_hash: String,
    #[serde(rename = "file_path")]
    pub storage_path: String,
    pub upload_time: DateTime<Utc>,
    pub content_type: String,
    pub signer: Address,
    pub signature: String,
}

/// Outcome for an accepted batch. All files share one signer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub signer: Address,
    pub project_id: String,
    pub data_date: String,
    pub core_data_hash: String,
    pub files: Vec<FileRecord>,
}
