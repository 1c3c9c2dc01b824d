//! # Authorization Oracle Adapters
//!
//! - [`ContractAuthorizationOracle`]: read-only `eth_call` of
//!   `isAuthorizedSubmitter(bytes32,address) returns (bool)` over JSON-RPC
//! - [`DevBypassOracle`]: answers "authorized" for everyone; only built when
//!   the oracle is unconfigured and the bypass is enabled explicitly
//!
//! Errors never include the RPC endpoint.

use crate::config::{ConfigError, OracleConfig};
use crate::domain::entities::{Address, AuthorizationDecision};
use crate::domain::errors::SubmissionError;
use crate::domain::project_key::{project_key, ProjectKey};
use crate::domain::recovery::keccak256;
use crate::ports::outbound::AuthorizationOracle;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Solidity signature of the authorization view function.
pub const IS_AUTHORIZED_SUBMITTER: &str = "isAuthorizedSubmitter(bytes32,address)";

// =============================================================================
// ABI ENCODING
// =============================================================================

/// First four bytes of `keccak256(signature)`.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata for `isAuthorizedSubmitter(pid, submitter)`.
pub fn encode_is_authorized_call(key: &ProjectKey, submitter: &Address) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32 + 32);
    data.extend_from_slice(&function_selector(IS_AUTHORIZED_SUBMITTER));
    data.extend_from_slice(key);
    // address is left-padded to a 32-byte word
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(submitter.as_bytes());
    data
}

/// Decode a single ABI `bool` return word.
pub fn decode_bool(word: &[u8]) -> Result<bool, String> {
    if word.len() != 32 {
        return Err(format!("expected 32-byte bool, got {} bytes", word.len()));
    }
    if word[..31].iter().any(|&b| b != 0) {
        return Err("bool word has non-zero high bytes".into());
    }
    match word[31] {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(format!("invalid bool value {other}")),
    }
}

// =============================================================================
// JSON-RPC ORACLE
// =============================================================================

/// JSON-RPC request structure.
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: T,
    id: u64,
}

/// JSON-RPC response structure.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Serialize)]
struct CallObject {
    to: String,
    data: String,
}

/// Oracle backed by the on-chain authorization contract.
pub struct ContractAuthorizationOracle {
    http_client: reqwest::Client,
    rpc_url: String,
    contract: Address,
    timeout: Duration,
    request_id: AtomicU64,
}

impl ContractAuthorizationOracle {
    /// Create a client for a configured oracle.
    pub fn new(config: &OracleConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        if !config.is_configured() {
            return Err(ConfigError::OracleNotConfigured);
        }

        let contract = config
            .contract_address
            .trim()
            .parse()
            .map_err(ConfigError::Invalid)?;
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConfigError::Invalid(format!("cannot build HTTP client: {}", e.without_url())))?;

        Ok(Self {
            http_client,
            rpc_url: config.rpc_url.trim().to_string(),
            contract,
            timeout: config.timeout(),
            request_id: AtomicU64::new(1),
        })
    }

    pub fn contract(&self) -> &Address {
        &self.contract
    }

    /// `eth_call` against the latest block; returns the raw return data.
    async fn eth_call(&self, data: Vec<u8>) -> Result<Vec<u8>, String> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: "eth_call",
            params: (
                CallObject {
                    to: format!("0x{}", hex::encode(self.contract.as_bytes())),
                    data: format!("0x{}", hex::encode(data)),
                },
                "latest",
            ),
            id,
        };

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.describe(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("node returned HTTP {status}"));
        }

        let body: JsonRpcResponse<String> = response.json().await.map_err(|e| self.describe(e))?;
        if let Some(error) = body.error {
            return Err(format!("RPC error {}: {}", error.code, error.message));
        }

        let result = body
            .result
            .ok_or_else(|| "RPC response missing result".to_string())?;
        hex::decode(result.strip_prefix("0x").unwrap_or(&result))
            .map_err(|e| format!("result is not hex: {e}"))
    }

    fn describe(&self, error: reqwest::Error) -> String {
        if error.is_timeout() {
            format!("oracle call timed out after {}ms", self.timeout.as_millis())
        } else {
            error.without_url().to_string()
        }
    }
}

#[async_trait::async_trait]
impl AuthorizationOracle for ContractAuthorizationOracle {
    async fn is_authorized(
        &self,
        signer: &Address,
        project_id: &str,
    ) -> Result<AuthorizationDecision, SubmissionError> {
        let key = project_key(project_id)?;
        let data = encode_is_authorized_call(&key, signer);

        let word = self
            .eth_call(data)
            .await
            .map_err(SubmissionError::AuthorizationCheckFailed)?;
        let authorized = decode_bool(&word).map_err(SubmissionError::AuthorizationCheckFailed)?;

        debug!(%signer, project_id, authorized, "authorization oracle answered");
        Ok(if authorized {
            AuthorizationDecision::allow()
        } else {
            AuthorizationDecision::deny(format!(
                "{signer} is not an owner or authorized submitter of {project_id}"
            ))
        })
    }
}

// =============================================================================
// DEVELOPMENT BYPASS
// =============================================================================

/// Authorizes every signer. Development only.
#[derive(Debug, Default)]
pub struct DevBypassOracle;

#[async_trait::async_trait]
impl AuthorizationOracle for DevBypassOracle {
    async fn is_authorized(
        &self,
        signer: &Address,
        project_id: &str,
    ) -> Result<AuthorizationDecision, SubmissionError> {
        debug!(%signer, project_id, "authorization bypassed");
        Ok(AuthorizationDecision {
            authorized: true,
            diagnostic: Some("oracle not configured; development bypass".into()),
        })
    }
}

/// Build the oracle described by `config`.
///
/// An unconfigured oracle is an error unless `allow_unconfigured_bypass` is set.
pub fn build_oracle(config: &OracleConfig) -> Result<Arc<dyn AuthorizationOracle>, ConfigError> {
    if config.is_configured() {
        return Ok(Arc::new(ContractAuthorizationOracle::new(config)?));
    }

    if config.allow_unconfigured_bypass {
        warn!("authorization oracle not configured; every signer will be accepted (development bypass)");
        return Ok(Arc::new(DevBypassOracle));
    }

    Err(ConfigError::OracleNotConfigured)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_known_vector() {
        assert_eq!(
            function_selector("transfer(address,uint256)"),
            [0xa9, 0x05, 0x9c, 0xbb]
        );
    }

    #[test]
    fn test_call_layout() {
        let key = project_key("p1").unwrap();
        let submitter = Address([0xAB; 20]);
        let data = encode_is_authorized_call(&key, &submitter);

        assert_eq!(data.len(), 68);
        assert_eq!(&data[..4], &function_selector(IS_AUTHORIZED_SUBMITTER));
        assert_eq!(&data[4..6], b"p1");
        assert!(data[6..36].iter().all(|&b| b == 0));
        assert!(data[36..48].iter().all(|&b| b == 0));
        assert_eq!(&data[48..], &[0xAB; 20]);
    }

    #[test]
    fn test_decode_bool() {
        let mut word = [0u8; 32];
        assert_eq!(decode_bool(&word), Ok(false));
        word[31] = 1;
        assert_eq!(decode_bool(&word), Ok(true));
        word[31] = 2;
        assert!(decode_bool(&word).is_err());
        word[31] = 1;
        word[0] = 1;
        assert!(decode_bool(&word).is_err());

        // Empty return data: no contract at the address
        assert!(decode_bool(&[]).is_err());
    }

    #[test]
    fn test_build_oracle_fails_closed() {
        assert_eq!(
            build_oracle(&OracleConfig::default()).err(),
            Some(ConfigError::OracleNotConfigured)
        );
    }

    #[tokio::test]
    async fn test_bypass_only_when_enabled() {
        let config = OracleConfig {
            contract_address: "0x...".into(),
            rpc_url: "http://127.0.0.1:8545".into(),
            allow_unconfigured_bypass: true,
            ..OracleConfig::default()
        };
        let oracle = build_oracle(&config).unwrap();
        let decision = oracle.is_authorized(&Address([1; 20]), "p1").await.unwrap();
        assert!(decision.authorized);
    }

    /// Connection failures are transient, never a denial
    #[tokio::test]
    async fn test_unreachable_node_is_check_failure() {
        let config = OracleConfig {
            // Port 9 (discard) on localhost is closed in test environments
            rpc_url: "http://127.0.0.1:9".into(),
            contract_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".into(),
            timeout_ms: 2_000,
            allow_unconfigured_bypass: false,
        };
        let oracle = ContractAuthorizationOracle::new(&config).unwrap();

        let err = oracle
            .is_authorized(&Address([1; 20]), "p1")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.kind(), "AuthorizationCheckFailed");
        assert!(!err.to_string().contains("127.0.0.1"));
    }

    #[tokio::test]
    async fn test_long_project_id_rejected_before_call() {
        let config = OracleConfig {
            rpc_url: "http://127.0.0.1:9".into(),
            contract_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".into(),
            ..OracleConfig::default()
        };
        let oracle = ContractAuthorizationOracle::new(&config).unwrap();

        let err = oracle
            .is_authorized(&Address([1; 20]), &"x".repeat(40))
            .await
            .unwrap_err();
        assert_eq!(err, SubmissionError::IdentifierTooLong { length: 40 });
    }
}
