//! Pipeline configuration with validation.
//!
//! Built once at startup and injected; nothing here is read from globals.

use crate::domain::replay::FRESHNESS_WINDOW_MS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Placeholder left in sample configs for the contract address.
pub const PLACEHOLDER_ADDRESS: &str = "0x...";

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    /// On-chain authorization oracle
    pub oracle: OracleConfig,
    /// Content store location
    pub storage: StorageConfig,
    /// Freshness window and duplicate rejection
    pub replay: ReplayConfig,
}

impl PipelineConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.oracle.validate()?;

        if self.storage.upload_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("storage.upload_root cannot be empty".into()));
        }

        if self.replay.freshness_window_ms <= 0 {
            return Err(ConfigError::InvalidTimeout(
                "replay.freshness_window_ms must be positive".into(),
            ));
        }

        Ok(())
    }
}

/// Authorization oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OracleConfig {
    /// JSON-RPC endpoint of the chain node
    pub rpc_url: String,
    /// Address of the authorization contract
    pub contract_address: String,
    /// Upper bound on one authorization call
    pub timeout_ms: u64,
    /// Treat every signer as authorized when the oracle is not configured.
    /// Development only.
    pub allow_unconfigured_bypass: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            contract_address: String::new(),
            timeout_ms: 5_000,
            allow_unconfigured_bypass: false,
        }
    }
}

impl OracleConfig {
    /// Whether both the endpoint and a real contract address are set.
    pub fn is_configured(&self) -> bool {
        let address = self.contract_address.trim();
        !self.rpc_url.trim().is_empty() && !address.is_empty() && address != PLACEHOLDER_ADDRESS
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.is_configured() {
            if self.allow_unconfigured_bypass {
                return Ok(());
            }
            return Err(ConfigError::OracleNotConfigured);
        }

        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "oracle.timeout_ms cannot be 0".into(),
            ));
        }

        if self.contract_address.trim().parse::<crate::Address>().is_err() {
            return Err(ConfigError::Invalid(
                "oracle.contract_address is not a 20-byte hex address".into(),
            ));
        }

        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(
                "oracle.rpc_url must be an http(s) URL".into(),
            ));
        }

        Ok(())
    }
}

/// Content store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory; one subdirectory per project
    pub upload_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_root: PathBuf::from("./uploads"),
        }
    }
}

/// Replay protection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReplayConfig {
    /// Maximum attestation age
    pub freshness_window_ms: i64,
    /// Remember accepted signatures for the window and reject repeats
    pub reject_duplicates: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            freshness_window_ms: FRESHNESS_WINDOW_MS,
            reject_duplicates: false,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Oracle endpoint or contract missing and the bypass is not enabled
    #[error("authorization oracle is not configured (set oracle.rpc_url and oracle.contract_address, or oracle.allow_unconfigured_bypass for development)")]
    OracleNotConfigured,
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured_oracle() -> OracleConfig {
        OracleConfig {
            rpc_url: "http://127.0.0.1:8545".into(),
            contract_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".into(),
            ..OracleConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.oracle.timeout_ms, 5_000);
        assert!(!config.oracle.allow_unconfigured_bypass);
        assert_eq!(config.storage.upload_root, PathBuf::from("./uploads"));
        assert_eq!(config.replay.freshness_window_ms, 300_000);
        assert!(!config.replay.reject_duplicates);
    }

    /// Unconfigured oracle fails closed unless the bypass is explicit
    #[test]
    fn test_unconfigured_oracle_requires_bypass() {
        assert_eq!(
            PipelineConfig::default().validate(),
            Err(ConfigError::OracleNotConfigured)
        );

        let mut config = PipelineConfig::default();
        config.oracle.allow_unconfigured_bypass = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_placeholder_address_is_unconfigured() {
        let oracle = OracleConfig {
            contract_address: PLACEHOLDER_ADDRESS.into(),
            ..configured_oracle()
        };
        assert!(!oracle.is_configured());
        assert!(configured_oracle().is_configured());
    }

    #[test]
    fn test_configured_oracle_validation() {
        assert!(configured_oracle().validate().is_ok());

        let bad_address = OracleConfig {
            contract_address: "0x1234".into(),
            ..configured_oracle()
        };
        assert!(matches!(bad_address.validate(), Err(ConfigError::Invalid(_))));

        let zero_timeout = OracleConfig {
            timeout_ms: 0,
            ..configured_oracle()
        };
        assert!(matches!(
            zero_timeout.validate(),
            Err(ConfigError::InvalidTimeout(_))
        ));

        let bad_url = OracleConfig {
            rpc_url: "ws://node".into(),
            ..configured_oracle()
        };
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"oracle":{"allow_unconfigured_bypass":true},"replay":{"reject_duplicates":true}}"#,
        )
        .unwrap();
        assert!(config.oracle.allow_unconfigured_bypass);
        assert_eq!(config.oracle.timeout_ms, 5_000);
        assert!(config.replay.reject_duplicates);
        assert_eq!(config.replay.freshness_window_ms, 300_000);
    }
}
