//! # Consistency Checks
//!
//! Cross-validates the attestation against the batch it arrived with: the
//! declared project id, the caller-declared hash list and the received bytes.
//!
//! Hex comparisons ignore case and an optional `0x` prefix.

use super::entities::{Attestation, DeclaredFileHash};
use super::errors::SubmissionError;

/// Strip an optional `0x` prefix.
pub fn strip_hex_prefix(hash: &str) -> &str {
    hash.strip_prefix("0x").unwrap_or(hash)
}

/// Compare two hex hashes, ignoring case and `0x`.
pub fn hashes_match(a: &str, b: &str) -> bool {
    strip_hex_prefix(a).eq_ignore_ascii_case(strip_hex_prefix(b))
}

/// The attested project must be the one the batch is submitted for.
pub fn check_project_id(attestation: &Attestation, project_id: &str) -> Result<(), SubmissionError> {
    if attestation.project_id != project_id {
        return Err(SubmissionError::ProjectIdMismatch {
            attested: attestation.project_id.clone(),
            declared: project_id.to_string(),
        });
    }
    Ok(())
}

/// Declared list must have one entry per attested hash, equal by position.
///
/// Reports the first mismatching file.
pub fn check_declared_hashes(
    attestation: &Attestation,
    declared: &[DeclaredFileHash],
) -> Result<(), SubmissionError> {
    if declared.len() != attestation.file_hashes.len() {
        return Err(SubmissionError::FileCountMismatch {
            attested: attestation.file_hashes.len(),
            declared: declared.len(),
        });
    }

    for (entry, attested) in declared.iter().zip(&attestation.file_hashes) {
        if !hashes_match(&entry.hash_value, attested) {
            return Err(SubmissionError::FileHashMismatch(entry.file_name.clone()));
        }
    }
    Ok(())
}

/// Pair every uploaded file with its declared entry.
///
/// An upload takes the first unused entry carrying its file name; uploads
/// whose name matches no free entry take the entry at their own position.
/// The number of uploads must equal the number of declared entries.
pub fn bind_uploads<'a>(
    declared: &'a [DeclaredFileHash],
    upload_names: &[&str],
) -> Result<Vec<&'a DeclaredFileHash>, SubmissionError> {
    if upload_names.len() != declared.len() {
        return Err(SubmissionError::UploadCountMismatch {
            expected: declared.len(),
            uploaded: upload_names.len(),
        });
    }

    let mut used = vec![false; declared.len()];
    let mut slots: Vec<Option<usize>> = upload_names
        .iter()
        .map(|name| {
            let index = declared
                .iter()
                .enumerate()
                .position(|(i, entry)| !used[i] && entry.file_name == *name)?;
            used[index] = true;
            Some(index)
        })
        .collect();

    for (position, slot) in slots.iter_mut().enumerate() {
        if slot.is_none() {
            // Prefer the same position, otherwise any free entry
            let index = if !used[position] {
                position
            } else {
                used.iter().position(|u| !u).ok_or_else(|| {
                    SubmissionError::FileHashMismatch(upload_names[position].to_string())
                })?
            };
            used[index] = true;
            *slot = Some(index);
        }
    }

    Ok(slots
        .into_iter()
        .flatten()
        .map(|index| &declared[index])
        .collect())
}

/// Received bytes must hash to the declared value.
pub fn check_content_hash(
    file_name: &str,
    declared: &str,
    computed: &str,
) -> Result<(), SubmissionError> {
    if !hashes_match(declared, computed) {
        return Err(SubmissionError::ContentHashMismatch {
            file: file_name.to_string(),
            declared: strip_hex_prefix(declared).to_ascii_lowercase(),
            computed: computed.to_string(),
        });
    }
    Ok(())
}
