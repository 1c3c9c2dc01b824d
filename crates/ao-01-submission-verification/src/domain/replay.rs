//! # Replay Guard
//!
//! Stateless freshness check on the attestation timestamp.

use super::errors::SubmissionError;

/// Maximum accepted attestation age in milliseconds.
pub const FRESHNESS_WINDOW_MS: i64 = 300_000;

/// Reject iff `now_ms - timestamp_ms > window_ms`.
///
/// An attestation exactly `window_ms` old is accepted. Timestamps in the
/// future are accepted.
pub fn check_freshness(
    timestamp_ms: i64,
    now_ms: i64,
    window_ms: i64,
) -> Result<(), SubmissionError> {
    let age_ms = now_ms.saturating_sub(timestamp_ms);
    if age_ms > window_ms {
        return Err(SubmissionError::AttestationExpired { age_ms, window_ms });
    }
    Ok(())
}
