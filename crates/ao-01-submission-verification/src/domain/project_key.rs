//! # Project Keys
//!
//! The authorization contract indexes projects by `bytes32`. A project id is
//! stored left-aligned in the word with zero fill, which is how the signing
//! client writes it and how `toUtf8String` reads it back.

use super::errors::SubmissionError;

/// 32-byte project key.
pub type ProjectKey = [u8; 32];

/// Encode a project id as its `bytes32` key.
pub fn project_key(project_id: &str) -> Result<ProjectKey, SubmissionError> {
    let bytes = project_id.as_bytes();
    if bytes.len() > 32 {
        return Err(SubmissionError::IdentifierTooLong {
            length: bytes.len(),
        });
    }

    let mut key = [0u8; 32];
    key[..bytes.len()].copy_from_slice(bytes);
    Ok(key)
}

/// Parse a `0x`-prefixed (or bare) 64-digit hex key.
pub fn parse_project_key_hex(hex_key: &str) -> Result<ProjectKey, String> {
    let digits = hex_key.strip_prefix("0x").unwrap_or(hex_key);
    let bytes = hex::decode(digits).map_err(|e| e.to_string())?;
    ProjectKey::try_from(bytes.as_slice())
        .map_err(|_| format!("project key must be 32 bytes, got {}", bytes.len()))
}

/// `0x`-prefixed lowercase hex.
pub fn project_key_to_hex(key: &ProjectKey) -> String {
    format!("0x{}", hex::encode(key))
}

/// Decode the id back out of a key, stopping at the first zero byte.
pub fn project_key_to_string(key: &ProjectKey) -> String {
    let end = key.iter().position(|&b| b == 0).unwrap_or(key.len());
    String::from_utf8_lossy(&key[..end]).into_owned()
}
