//! # Submission Pipeline
//!
//! Application service that implements the `SubmissionApi` trait.
//!
//! ## Gate order
//!
//! 1. Parse the attestation and the declared hash list
//! 2. Rebuild the canonical message and recover the signer
//! 3. Freshness window, then the optional replay ledger
//! 4. Project id consistency
//! 5. Authorization oracle
//! 6. Declared hashes against the attestation and uploads bound to their
//!    expected hashes (all files, before any write). Without a declared list
//!    uploads bind to the attested hashes by position.
//! 7. Per file: stage, content hash check, commit
//!
//! The first failing file ends the batch. Files committed before it stay
//! stored; callers re-submit the rest.

use crate::adapters::fs_store::LocalContentStore;
use crate::adapters::oracle::build_oracle;
use crate::adapters::replay_ledger::{ReplayLedger, ReplayLedgerStats};
use crate::config::{ConfigError, PipelineConfig, ReplayConfig};
use crate::domain::canonical::canonical_message;
use crate::domain::consistency::{
    bind_uploads, check_content_hash, check_declared_hashes, check_project_id,
};
use crate::domain::entities::{
    Address, Attestation, DeclaredFileHash, FileRecord, StoredObject, SubmissionBatch,
    SubmissionReceipt, UploadedFile,
};
use crate::domain::errors::SubmissionError;
use crate::domain::naming::project_dir_name;
use crate::domain::project_key::project_key;
use crate::domain::recovery::{decode_signature, personal_message_hash, recover_from_prehash, Hash};
use crate::domain::replay::{check_freshness, FRESHNESS_WINDOW_MS};
use crate::ports::inbound::SubmissionApi;
use crate::ports::outbound::{AuthorizationOracle, ContentStore, StagedContent, TimeSource};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Submission pipeline.
///
/// Holds no per-request state; one instance serves all requests.
pub struct SubmissionPipeline<S: ContentStore> {
    store: Arc<S>,
    oracle: Arc<dyn AuthorizationOracle>,
    clock: Arc<dyn TimeSource>,
    ledger: Option<ReplayLedger>,
    freshness_window_ms: i64,
}

/// A verified signer, before authorization.
struct Verified {
    attestation: Attestation,
    declared: Option<Vec<DeclaredFileHash>>,
    signer: Address,
    digest: Hash,
}

impl<S: ContentStore> SubmissionPipeline<S> {
    /// Create a pipeline with the default freshness window and no replay ledger.
    pub fn new(
        store: Arc<S>,
        oracle: Arc<dyn AuthorizationOracle>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            store,
            oracle,
            clock,
            ledger: None,
            freshness_window_ms: FRESHNESS_WINDOW_MS,
        }
    }

    /// Apply the freshness window and enable the ledger if configured.
    pub fn with_replay_config(mut self, config: &ReplayConfig) -> Self {
        self.freshness_window_ms = config.freshness_window_ms;
        self.ledger = config
            .reject_duplicates
            .then(|| ReplayLedger::new(config.freshness_window_ms));
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Ledger statistics, when duplicate rejection is enabled.
    pub fn replay_stats(&self) -> Option<ReplayLedgerStats> {
        self.ledger.as_ref().map(ReplayLedger::stats)
    }

    /// Verify a batch and store its files.
    #[instrument(skip_all, fields(project_id = %batch.project_id, files = batch.files.len()))]
    pub async fn submit(&self, batch: SubmissionBatch) -> Result<SubmissionReceipt, SubmissionError> {
        let result = self.run(batch).await;

        match &result {
            Ok(receipt) => info!(
                signer = %receipt.signer,
                stored = receipt.files.len(),
                "submission accepted"
            ),
            Err(e) if e.is_retryable() => error!(kind = e.kind(), error = %e, "submission failed"),
            Err(e) => warn!(kind = e.kind(), error = %e, "submission rejected"),
        }
        result
    }

    async fn run(&self, batch: SubmissionBatch) -> Result<SubmissionReceipt, SubmissionError> {
        let verified = self.verify(&batch)?;

        let now = self.clock.now_millis();
        check_freshness(verified.attestation.timestamp, now, self.freshness_window_ms)?;

        let claim = match &self.ledger {
            Some(ledger) => {
                let key = ReplayLedger::key(&verified.signer, &verified.digest);
                ledger.claim(key, verified.attestation.timestamp, now)?;
                Some((ledger, key))
            }
            None => None,
        };

        let mut committed = 0usize;
        let result = self.authorize_and_store(batch, verified, &mut committed).await;

        if let (Err(_), Some((ledger, key))) = (&result, claim) {
            if committed == 0 {
                ledger.release(&key);
            }
        }
        result
    }

    /// Parse, canonicalize and recover. Pure.
    fn verify(&self, batch: &SubmissionBatch) -> Result<Verified, SubmissionError> {
        let attestation = Attestation::from_json(&batch.attestation)?;

        if batch.files.is_empty() {
            return Err(SubmissionError::EmptyBatch);
        }

        let declared = match batch.declared_hashes.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(DeclaredFileHash::parse_list(raw)?),
        };

        let message = canonical_message(&attestation)?;
        let signature = decode_signature(&batch.signature)?;
        let digest = personal_message_hash(message.as_bytes());
        let signer = recover_from_prehash(&digest, &signature)?;
        debug!(%signer, "signer recovered");

        Ok(Verified {
            attestation,
            declared,
            signer,
            digest,
        })
    }

    async fn authorize_and_store(
        &self,
        batch: SubmissionBatch,
        verified: Verified,
        committed: &mut usize,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let Verified {
            attestation,
            declared,
            signer,
            ..
        } = verified;

        check_project_id(&attestation, &batch.project_id)?;
        project_key(&batch.project_id)?;

        let decision = self.oracle.is_authorized(&signer, &batch.project_id).await?;
        if !decision.authorized {
            if let Some(diagnostic) = &decision.diagnostic {
                debug!(diagnostic = %diagnostic, "authorization denied");
            }
            return Err(SubmissionError::AuthorizationDenied {
                signer: signer.to_string(),
                project_id: batch.project_id,
            });
        }

        let expected_hashes: Vec<String> = match &declared {
            Some(declared) => {
                check_declared_hashes(&attestation, declared)?;
                let names: Vec<&str> = batch.files.iter().map(|f| f.file_name.as_str()).collect();
                bind_uploads(declared, &names)?
                    .into_iter()
                    .map(|entry| entry.hash_value.clone())
                    .collect()
            }
            None => {
                if batch.files.len() != attestation.file_hashes.len() {
                    return Err(SubmissionError::UploadCountMismatch {
                        expected: attestation.file_hashes.len(),
                        uploaded: batch.files.len(),
                    });
                }
                debug!("no declared hash list; binding uploads to attested hashes by position");
                attestation.file_hashes.clone()
            }
        };

        let project_dir = project_dir_name(&batch.project_id, batch.project_description.as_deref());
        let mut records = Vec::with_capacity(batch.files.len());

        for (file, expected) in batch.files.into_iter().zip(expected_hashes) {
            let UploadedFile {
                file_name,
                content_type,
                content,
            } = file;

            let object = self
                .store_file(&project_dir, &file_name, content, &expected)
                .await?;
            *committed += 1;
            debug!(file = %file_name, hash = %object.content_hash, "file stored");

            records.push(FileRecord {
                file_size: object.size,
                file_hash: object.content_hash,
                storage_path: object.relative_path,
                upload_time: self.timestamp(),
                content_type: content_type.unwrap_or_default(),
                signer,
                signature: batch.signature.clone(),
                file_name,
            });
        }

        Ok(SubmissionReceipt {
            signer,
            project_id: batch.project_id,
            data_date: attestation.data_date,
            core_data_hash: attestation.core_data_hash,
            files: records,
        })
    }

    /// Stage, check and commit one file on the blocking pool.
    async fn store_file(
        &self,
        project_dir: &str,
        file_name: &str,
        content: Vec<u8>,
        expected_hash: &str,
    ) -> Result<StoredObject, SubmissionError> {
        let write_failed = |reason: String| SubmissionError::StorageWriteFailed {
            file: file_name.to_string(),
            reason,
        };

        let store = Arc::clone(&self.store);
        let dir = project_dir.to_string();
        let staged = tokio::task::spawn_blocking(move || store.stage(&dir, &content))
            .await
            .map_err(|e| write_failed(format!("storage task failed: {e}")))?
            .map_err(|e| write_failed(e.to_string()))?;

        if let Err(mismatch) = check_content_hash(file_name, expected_hash, staged.content_hash()) {
            let store = Arc::clone(&self.store);
            if let Err(e) = tokio::task::spawn_blocking(move || store.discard(staged)).await {
                debug!(file = %file_name, error = %e, "discard task failed");
            }
            return Err(mismatch);
        }

        let store = Arc::clone(&self.store);
        let arrival_ms = self.clock.now_millis();
        let name = file_name.to_string();
        tokio::task::spawn_blocking(move || store.commit(staged, arrival_ms, &name))
            .await
            .map_err(|e| write_failed(format!("storage task failed: {e}")))?
            .map_err(|e| write_failed(e.to_string()))
    }

    fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.clock.now_millis()).unwrap_or_else(Utc::now)
    }
}

impl SubmissionPipeline<LocalContentStore> {
    /// Wire the production adapters described by `config`.
    pub fn from_config(
        config: &PipelineConfig,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let oracle = build_oracle(&config.oracle)?;
        let store = LocalContentStore::open(&config.storage.upload_root).map_err(|e| {
            ConfigError::Invalid(format!("cannot open storage.upload_root: {}", e.kind()))
        })?;

        Ok(Self::new(Arc::new(store), oracle, clock).with_replay_config(&config.replay))
    }
}

#[async_trait::async_trait]
impl<S: ContentStore> SubmissionApi for SubmissionPipeline<S> {
    async fn submit(&self, batch: SubmissionBatch) -> Result<SubmissionReceipt, SubmissionError> {
        SubmissionPipeline::submit(self, batch).await
    }

    async fn locate(&self, hash_or_prefix: &str) -> Option<StoredObject> {
        self.store.locate(hash_or_prefix)
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
