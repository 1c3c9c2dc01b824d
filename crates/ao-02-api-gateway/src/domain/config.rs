//! Gateway configuration with validation.
//!
//! Loaded in three layers: defaults, an optional TOML file, then `AO_*`
//! environment variables. Command line flags are applied last by the binary.

use ao_01_submission_verification::{ConfigError as PipelineConfigError, PipelineConfig};
use ao_telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Submission pipeline (oracle, storage, replay)
    pub pipeline: PipelineConfig,
    /// Logging
    pub telemetry: TelemetryConfig,
}

impl GatewayConfig {
    /// Parse a TOML document. Missing sections keep their defaults.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.http.validate()?;
        self.cors.validate()?;
        self.pipeline.validate()?;
        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }

    /// Apply `AO_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `AO_*` overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("AO_HTTP_HOST") {
            self.http.host = parse_var("AO_HTTP_HOST", &v)?;
        }
        if let Some(v) = lookup("AO_HTTP_PORT") {
            self.http.port = parse_var("AO_HTTP_PORT", &v)?;
        }
        if let Some(v) = lookup("AO_MAX_UPLOAD_BYTES") {
            self.http.max_upload_bytes = parse_var("AO_MAX_UPLOAD_BYTES", &v)?;
        }

        let oracle = &mut self.pipeline.oracle;
        if let Some(v) = lookup("AO_RPC_URL") {
            oracle.rpc_url = v;
        }
        if let Some(v) = lookup("AO_CONTRACT_ADDRESS") {
            oracle.contract_address = v;
        }
        if let Some(v) = lookup("AO_ORACLE_TIMEOUT_MS") {
            oracle.timeout_ms = parse_var("AO_ORACLE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("AO_ALLOW_UNCONFIGURED_BYPASS") {
            oracle.allow_unconfigured_bypass = parse_flag("AO_ALLOW_UNCONFIGURED_BYPASS", &v)?;
        }

        if let Some(v) = lookup("AO_UPLOAD_ROOT") {
            self.pipeline.storage.upload_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("AO_FRESHNESS_WINDOW_MS") {
            self.pipeline.replay.freshness_window_ms = parse_var("AO_FRESHNESS_WINDOW_MS", &v)?;
        }
        if let Some(v) = lookup("AO_REJECT_DUPLICATES") {
            self.pipeline.replay.reject_duplicates = parse_flag("AO_REJECT_DUPLICATES", &v)?;
        }

        self.telemetry.apply_overrides(&lookup);
        Ok(())
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::Invalid(format!("{key}: {e}")))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(ConfigError::Invalid(format!("{key}: expected a boolean, got {other:?}"))),
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8080)
    pub port: u16,
    /// Upper bound on one upload request body
    pub max_upload_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8080,
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }
}

impl HttpConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_upload_bytes cannot be 0".into(),
            ));
        }
        Ok(())
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,
    /// Allowed origins ("*" for all)
    pub allowed_origins: Vec<String>,
    /// Allowed methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers ("*" for all)
    pub allowed_headers: Vec<String>,
    /// Expose headers
    pub expose_headers: Vec<String>,
    /// Max age for preflight cache
    pub max_age: u64,
    /// Allow credentials
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: ["POST", "OPTIONS", "GET", "PUT", "DELETE"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allowed_headers: [
                "Content-Type",
                "Content-Length",
                "Accept-Encoding",
                "X-CSRF-Token",
                "Authorization",
                "Accept",
                "Origin",
                "Cache-Control",
                "X-Requested-With",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
            expose_headers: vec!["Content-Disposition".to_string()],
            max_age: 86400, // 24 hours
            allow_credentials: false,
        }
    }
}

impl CorsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let wildcard = |list: &[String]| list.iter().any(|v| v == "*");
        // Browsers refuse credentialed responses with wildcard headers
        if self.enabled
            && self.allow_credentials
            && (wildcard(&self.allowed_origins) || wildcard(&self.allowed_headers))
        {
            return Err(ConfigError::Invalid(
                "cors.allow_credentials requires explicit origins and headers".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file is not valid TOML of the expected shape
    #[error("invalid configuration file: {0}")]
    Parse(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Pipeline section rejected
    #[error(transparent)]
    Pipeline(#[from] PipelineConfigError),
}
