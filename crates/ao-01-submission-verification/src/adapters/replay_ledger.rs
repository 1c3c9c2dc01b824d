//! # Replay Ledger
//!
//! Optional in-memory record of accepted attestations, used to reject a
//! second submission of the same signed attestation while it is still fresh.
//!
//! Entries are keyed by `keccak256(signer || message digest)`, so the two
//! encodings of one ECDSA signature (low-S and high-S) share an entry. An
//! entry is dropped once its attestation falls out of the freshness window;
//! from then on the freshness gate rejects the attestation anyway.
//! Future-dated attestations are recorded at claim time, so no entry
//! outlives one window after it was inserted.

use crate::domain::entities::Address;
use crate::domain::errors::SubmissionError;
use crate::domain::recovery::{keccak256, Hash};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Anti-replay ledger for accepted attestations.
pub struct ReplayLedger {
    /// key -> earlier of attestation timestamp and claim time (ms)
    entries: Mutex<HashMap<Hash, i64>>,
    window_ms: i64,
    stats: Mutex<ReplayLedgerStats>,
}

/// Ledger statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayLedgerStats {
    /// Total claims checked
    pub total_checked: u64,
    /// Replays detected
    pub replays_detected: u64,
    /// Entries currently held
    pub entries: usize,
}

impl ReplayLedger {
    pub fn new(window_ms: i64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            window_ms,
            stats: Mutex::new(ReplayLedgerStats::default()),
        }
    }

    /// Ledger key for one signed attestation.
    pub fn key(signer: &Address, message_digest: &Hash) -> Hash {
        let mut input = [0u8; 52];
        input[..20].copy_from_slice(signer.as_bytes());
        input[20..].copy_from_slice(message_digest);
        keccak256(&input)
    }

    /// Record `key` as in use, or fail if it already is.
    ///
    /// Expired entries are pruned first.
    pub fn claim(&self, key: Hash, attested_ms: i64, now_ms: i64) -> Result<(), SubmissionError> {
        let mut entries = self.entries.lock();
        entries.retain(|_, ts| now_ms.saturating_sub(*ts) <= self.window_ms);

        let mut stats = self.stats.lock();
        stats.total_checked += 1;

        if entries.contains_key(&key) {
            stats.replays_detected += 1;
            return Err(SubmissionError::AttestationReplayed);
        }

        entries.insert(key, attested_ms.min(now_ms));
        Ok(())
    }

    /// Forget a claim whose submission did not go through.
    pub fn release(&self, key: &Hash) {
        self.entries.lock().remove(key);
    }

    /// Get statistics.
    pub fn stats(&self) -> ReplayLedgerStats {
        let mut stats = self.stats.lock().clone();
        stats.entries = self.entries.lock().len();
        stats
    }
}
