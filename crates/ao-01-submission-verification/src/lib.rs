//! # Submission Verification Subsystem (AO-01)
//!
//! Verifies attested file submissions and stores the accepted files under
//! content-derived names.
//!
//! ## Architecture
//!
//! This subsystem follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): Canonical message, signer recovery, replay
//!   and consistency gates, naming rules. No I/O.
//! - **Ports Layer** (`ports/`): Inbound submission API, outbound oracle,
//!   store and clock traits
//! - **Adapters Layer** (`adapters/`): JSON-RPC authorization oracle, local
//!   filesystem store, system clock, replay ledger
//! - **Service Layer** (`service.rs`): The submission pipeline
//!
//! ## Pipeline
//!
//! ```text
//! Received → Canonicalized → SignatureRecovered → ReplayChecked → Authorized
//!          → [HashBound → Stored] per file → Completed
//! ```
//!
//! Any gate may end the run in `Rejected(reason)`; see [`SubmissionError`].
//!
//! ## Security Notes
//!
//! - The signed bytes are rebuilt from typed fields, never taken verbatim from
//!   the request
//! - Stored bytes are hashed independently of any caller-supplied hash
//! - The authorization oracle fails closed; the development bypass must be
//!   enabled explicitly in configuration

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::clock::{FixedTimeSource, SystemTimeSource};
pub use adapters::fs_store::LocalContentStore;
pub use adapters::oracle::{build_oracle, ContractAuthorizationOracle, DevBypassOracle};
pub use adapters::replay_ledger::{ReplayLedger, ReplayLedgerStats};
pub use config::{ConfigError, OracleConfig, PipelineConfig, ReplayConfig, StorageConfig};
pub use domain::canonical::{canonical_message, CANONICAL_FORMAT_VERSION};
pub use domain::entities::{
    Address, Attestation, AuthorizationDecision, DeclaredFileHash, FileRecord, StoredObject,
    SubmissionBatch, SubmissionReceipt, UploadedFile,
};
pub use domain::errors::SubmissionError;
pub use domain::project_key::{
    parse_project_key_hex, project_key, project_key_to_hex, project_key_to_string, ProjectKey,
};
pub use domain::recovery::{keccak256, personal_message_hash, recover_signer};
pub use ports::inbound::SubmissionApi;
pub use ports::outbound::{AuthorizationOracle, ContentStore, StagedContent, StoreError, TimeSource};
pub use service::SubmissionPipeline;
