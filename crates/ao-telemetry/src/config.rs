//! Telemetry configuration from environment variables.

use serde::{Deserialize, Serialize};
use std::env;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to the root span
    pub service_name: String,

    /// Filter directives (`info`, `ao_02_api_gateway=debug,info`, ...)
    pub log_level: String,

    /// Whether to enable console output
    pub console_output: bool,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "attestation-oracle".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Override fields from `lookup`, which maps variable names to values.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        if let Some(name) = lookup("AO_SERVICE_NAME") {
            self.service_name = name;
        }

        if let Some(level) = lookup("AO_LOG_LEVEL").or_else(|| lookup("RUST_LOG")) {
            self.log_level = level;
        }

        if let Some(v) = lookup("AO_CONSOLE_OUTPUT") {
            self.console_output = v.to_lowercase() != "false" && v != "0";
        }

        match lookup("AO_JSON_LOGS") {
            Some(v) => self.json_logs = v.to_lowercase() == "true" || v == "1",
            None if is_container => self.json_logs = true,
            None => {}
        }
    }
}
