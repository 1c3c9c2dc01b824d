//! # AO Telemetry
//!
//! Log subscriber setup shared by the attestation oracle binaries.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ao_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     init_telemetry(&config).expect("Failed to init telemetry");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AO_SERVICE_NAME` | `attestation-oracle` | Service name in log records |
//! | `AO_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter directives |
//! | `AO_JSON_LOGS` | `false` (`true` in containers) | One JSON object per line |
//! | `AO_CONSOLE_OUTPUT` | `true` | Write logs to stdout at all |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_telemetry};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install global subscriber: {0}")]
    Install(String),
}
