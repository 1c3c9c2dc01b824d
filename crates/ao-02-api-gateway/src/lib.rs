//! AO-02 API Gateway - HTTP interface of the attested submission pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                  API GATEWAY (ao-02)                  │
//! ├───────────────────────────────────────────────────────┤
//! │   Trace → CORS → request counter → body limit         │
//! │                        │                              │
//! │   /health   /api/upload   /attach/:hash   /metrics    │
//! │                        │                              │
//! │               dyn SubmissionApi                       │
//! └────────────────────────┼──────────────────────────────┘
//!                          ▼
//!            ao-01 submission verification
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use ao_02_api_gateway::{ApiGatewayService, GatewayConfig};
//!
//! let config = GatewayConfig::default();
//! let service = ApiGatewayService::from_config(config)?;
//! service.serve(shutdown_signal()).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod middleware;
pub mod service;

// Re-exports for public API
pub use domain::config::{ConfigError, CorsConfig, GatewayConfig, HttpConfig};
pub use domain::error::{submission_status, GatewayError};
pub use domain::types::{ErrorBody, HealthResponse, UploadData, UploadForm, UploadResponse};
pub use middleware::metrics::MetricsSnapshot;
pub use middleware::GatewayMetrics;
pub use service::ApiGatewayService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
