//! Gateway counters, exposed as JSON on `GET /metrics`.

use ao_01_submission_verification::{SubmissionError, SubmissionReceipt};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// API Gateway metrics
#[derive(Default)]
pub struct GatewayMetrics {
    pub requests_total: AtomicU64,

    // Submission outcomes
    pub submissions_accepted: AtomicU64,
    pub submissions_rejected: AtomicU64,
    pub files_stored: AtomicU64,
    /// Oracle could not be asked (timeouts, RPC errors)
    pub authorization_failures: AtomicU64,

    // Retrieval
    pub retrievals_hit: AtomicU64,
    pub retrievals_miss: AtomicU64,
}

/// Point-in-time copy of [`GatewayMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub submissions_accepted: u64,
    pub submissions_rejected: u64,
    pub files_stored: u64,
    pub authorization_failures: u64,
    pub retrievals_hit: u64,
    pub retrievals_miss: u64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request
    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one submission.
    ///
    /// A rejected batch may still have stored files before the failing one;
    /// only accepted batches count toward `files_stored`.
    pub fn record_submission(&self, result: &Result<SubmissionReceipt, SubmissionError>) {
        match result {
            Ok(receipt) => {
                self.submissions_accepted.fetch_add(1, Ordering::Relaxed);
                self.files_stored
                    .fetch_add(receipt.files.len() as u64, Ordering::Relaxed);
            }
            Err(e) => {
                self.submissions_rejected.fetch_add(1, Ordering::Relaxed);
                if matches!(e, SubmissionError::AuthorizationCheckFailed(_)) {
                    self.authorization_failures.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    /// Record a retrieval lookup
    pub fn record_retrieval(&self, found: bool) {
        if found {
            self.retrievals_hit.fetch_add(1, Ordering::Relaxed);
        } else {
            self.retrievals_miss.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            submissions_accepted: self.submissions_accepted.load(Ordering::Relaxed),
            submissions_rejected: self.submissions_rejected.load(Ordering::Relaxed),
            files_stored: self.files_stored.load(Ordering::Relaxed),
            authorization_failures: self.authorization_failures.load(Ordering::Relaxed),
            retrievals_hit: self.retrievals_hit.load(Ordering::Relaxed),
            retrievals_miss: self.retrievals_miss.load(Ordering::Relaxed),
        }
    }
}

/// Middleware counting every request that reaches the router.
pub async fn track_requests(
    State(metrics): State<Arc<GatewayMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    metrics.record_request();
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ao_01_submission_verification::{Address, FileRecord};

    fn receipt(files: usize) -> SubmissionReceipt {
        SubmissionReceipt {
            signer: Address([1; 20]),
            project_id: "p1".into(),
            data_date: String::new(),
            core_data_hash: String::new(),
            files: (0..files)
                .map(|i| FileRecord {
                    file_name: format!("{i}.txt"),
                    file_size: 1,
                    file_hash: "00".repeat(32),
                    storage_path: format!("p1/{i}"),
                    upload_time: Default::default(),
                    content_type: String::new(),
                    signer: Address([1; 20]),
                    signature: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_submission_outcomes() {
        let metrics = GatewayMetrics::new();

        metrics.record_submission(&Ok(receipt(3)));
        metrics.record_submission(&Err(SubmissionError::AuthorizationCheckFailed(
            "timeout".into(),
        )));
        metrics.record_submission(&Err(SubmissionError::EmptyBatch));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.submissions_accepted, 1);
        assert_eq!(snapshot.files_stored, 3);
        assert_eq!(snapshot.submissions_rejected, 2);
        assert_eq!(snapshot.authorization_failures, 1);
    }

    #[test]
    fn test_retrievals() {
        let metrics = GatewayMetrics::new();
        metrics.record_retrieval(true);
        metrics.record_retrieval(false);
        metrics.record_retrieval(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.retrievals_hit, 1);
        assert_eq!(snapshot.retrievals_miss, 2);
    }

    #[test]
    fn test_snapshot_serializes_flat() {
        let metrics = GatewayMetrics::new();
        metrics.record_request();

        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["requests_total"], 1);
        assert_eq!(json["files_stored"], 0);
    }
}
