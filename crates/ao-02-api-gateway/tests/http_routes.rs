//! Route tests through the full middleware stack via `tower::ServiceExt::oneshot`.

use ao_01_submission_verification::{
    canonical_message, keccak256, personal_message_hash, Address, Attestation,
    AuthorizationDecision, AuthorizationOracle, FixedTimeSource, LocalContentStore,
    SubmissionError, SubmissionPipeline,
};
use ao_02_api_gateway::{ApiGatewayService, GatewayConfig};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use k256::ecdsa::SigningKey;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const NOW: i64 = 1_717_171_717_000;
const BOUNDARY: &str = "ao-test-boundary-7MA4YWxkTrZu0gW";

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Clone, Copy)]
enum Answer {
    Allow,
    Deny,
    Unavailable,
}

struct FixedOracle(Answer);

#[async_trait::async_trait]
impl AuthorizationOracle for FixedOracle {
    async fn is_authorized(
        &self,
        _signer: &Address,
        _project_id: &str,
    ) -> Result<AuthorizationDecision, SubmissionError> {
        match self.0 {
            Answer::Allow => Ok(AuthorizationDecision::allow()),
            Answer::Deny => Ok(AuthorizationDecision::deny("not a submitter")),
            Answer::Unavailable => Err(SubmissionError::AuthorizationCheckFailed(
                "oracle call timed out after 5000ms".into(),
            )),
        }
    }
}

struct Gateway {
    _root: TempDir,
    app: Router,
}

fn gateway_with(answer: Answer, config: GatewayConfig) -> Gateway {
    let root = TempDir::new().unwrap();
    let store = Arc::new(LocalContentStore::open(root.path()).unwrap());
    let pipeline = SubmissionPipeline::new(
        store,
        Arc::new(FixedOracle(answer)),
        Arc::new(FixedTimeSource(NOW)),
    );
    let service = ApiGatewayService::new(config, Arc::new(pipeline)).unwrap();
    Gateway {
        app: service.router(),
        _root: root,
    }
}

fn gateway(answer: Answer) -> Gateway {
    gateway_with(answer, GatewayConfig::default())
}

fn address_of(key: &SigningKey) -> Address {
    let point = key.verifying_key().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Address(address)
}

fn sign(key: &SigningKey, message: &str) -> String {
    let digest = personal_message_hash(message.as_bytes());
    let (sig, recid) = key.sign_prehash_recoverable(&digest).unwrap();
    let mut bytes = sig.to_bytes().to_vec();
    bytes.push(recid.to_byte() + 27);
    format!("0x{}", hex::encode(bytes))
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Text parts of a correctly signed upload of `a.txt` = `content`.
fn signed_fields(key: &SigningKey, content: &[u8], timestamp: i64) -> Vec<(String, String)> {
    let signature_data = json!({
        "projectId": "p1",
        "dataDate": "2024-06-01",
        "coreDataHash": "0xc0ffee",
        "fileHashes": [sha256_hex(content)],
        "timestamp": timestamp,
    })
    .to_string();
    let message = canonical_message(&Attestation::from_json(&signature_data).unwrap()).unwrap();
    let hash_results = json!([{
        "fileName": "a.txt",
        "fileSize": content.len(),
        "hashValue": format!("0x{}", sha256_hex(content)),
    }])
    .to_string();

    vec![
        ("projectId".into(), "p1".into()),
        ("projectDescription".into(), "Soil samples".into()),
        ("dataDate".into(), "2024-06-01".into()),
        ("coreData".into(), "{\"ph\":6.5}".into()),
        ("hashResults".into(), hash_results),
        ("signature".into(), sign(key, &message)),
        ("signatureData".into(), signature_data),
    ]
}

fn upload_request(fields: &[(String, String)], files: &[(&str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (file_name, content) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\nContent-Type: text/plain\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_health() {
    let gw = gateway(Answer::Allow);
    let (status, body) = send_json(&gw.app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "message": "Server is running"}));
}

/// Test: signed upload is stored and downloadable by full hash and by prefix
#[tokio::test]
async fn test_upload_then_download() {
    let gw = gateway(Answer::Allow);
    let key = SigningKey::random(&mut rand::thread_rng());
    let fields = signed_fields(&key, b"hello", NOW - 5_000);

    let (status, body) =
        send_json(&gw.app, upload_request(&fields, &[("a.txt", b"hello".as_slice())])).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    let data = &body["data"];
    assert_eq!(data["projectId"], "p1");
    assert_eq!(data["projectDescription"], "Soil samples");
    assert_eq!(data["coreData"], "{\"ph\":6.5}");
    assert_eq!(data["signerAddress"], address_of(&key).to_checksum_hex());

    let record = &data["uploadedFiles"][0];
    let hash = sha256_hex(b"hello");
    assert_eq!(record["file_name"], "a.txt");
    assert_eq!(record["file_size"], 5);
    assert_eq!(record["file_hash"], hash);
    assert!(record["file_path"]
        .as_str()
        .unwrap()
        .starts_with("p1-Soil_samples/"));

    let response = gw
        .app
        .clone()
        .oneshot(get(&format!("/attach/{hash}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/octet-stream"
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with(&format!("attachment; filename=\"{hash}_")));
    assert!(disposition.ends_with("_a_txt\""));

    let (status, bytes) = send(&gw.app, get(&format!("/attach/{}", &hash[..8]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"hello");
}

#[tokio::test]
async fn test_missing_signature_data() {
    let gw = gateway(Answer::Allow);
    let key = SigningKey::random(&mut rand::thread_rng());
    let fields: Vec<_> = signed_fields(&key, b"hello", NOW)
        .into_iter()
        .filter(|(name, _)| name != "signatureData")
        .collect();

    let (status, body) =
        send_json(&gw.app, upload_request(&fields, &[("a.txt", b"hello".as_slice())])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "MissingSignatureData");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn test_denied_signer_is_forbidden() {
    let gw = gateway(Answer::Deny);
    let key = SigningKey::random(&mut rand::thread_rng());
    let fields = signed_fields(&key, b"hello", NOW);

    let (status, body) =
        send_json(&gw.app, upload_request(&fields, &[("a.txt", b"hello".as_slice())])).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "AuthorizationDenied");
    assert_eq!(body["retryable"], false);

    let (status, _) = send(&gw.app, get(&format!("/attach/{}", sha256_hex(b"hello")))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oracle_outage_is_retryable() {
    let gw = gateway(Answer::Unavailable);
    let key = SigningKey::random(&mut rand::thread_rng());
    let fields = signed_fields(&key, b"hello", NOW);

    let (status, body) =
        send_json(&gw.app, upload_request(&fields, &[("a.txt", b"hello".as_slice())])).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "AuthorizationCheckFailed");
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn test_expired_attestation_is_unauthorized() {
    let gw = gateway(Answer::Allow);
    let key = SigningKey::random(&mut rand::thread_rng());
    let fields = signed_fields(&key, b"hello", NOW - 300_001);

    let (status, body) =
        send_json(&gw.app, upload_request(&fields, &[("a.txt", b"hello".as_slice())])).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "AttestationExpired");
}

/// Test: bytes that differ from the declared hash are rejected and not served
#[tokio::test]
async fn test_tampered_content_is_bad_request() {
    let gw = gateway(Answer::Allow);
    let key = SigningKey::random(&mut rand::thread_rng());
    let fields = signed_fields(&key, b"hello", NOW);

    let (status, body) =
        send_json(&gw.app, upload_request(&fields, &[("a.txt", b"HELLO".as_slice())])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ContentHashMismatch");

    let (status, _) = send(&gw.app, get(&format!("/attach/{}", sha256_hex(b"HELLO")))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_hash_not_found() {
    let gw = gateway(Answer::Allow);
    let (status, body) = send_json(&gw.app, get(&format!("/attach/{}", "ab".repeat(32)))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let mut config = GatewayConfig::default();
    config.http.max_upload_bytes = 1024;
    let gw = gateway_with(Answer::Allow, config);

    let key = SigningKey::random(&mut rand::thread_rng());
    let content = vec![b'x'; 4096];
    let fields = signed_fields(&key, &content, NOW);

    let (status, _) = send(&gw.app, upload_request(&fields, &[("big.bin", content.as_slice())])).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_metrics_count_outcomes() {
    let gw = gateway(Answer::Allow);
    let key = SigningKey::random(&mut rand::thread_rng());

    let fields = signed_fields(&key, b"hello", NOW);
    let (status, _) = send(&gw.app, upload_request(&fields, &[("a.txt", b"hello".as_slice())])).await;
    assert_eq!(status, StatusCode::OK);

    let expired = signed_fields(&key, b"hello", NOW - 400_000);
    let (status, _) = send(&gw.app, upload_request(&expired, &[("a.txt", b"hello".as_slice())])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    send(&gw.app, get(&format!("/attach/{}", sha256_hex(b"hello")))).await;
    send(&gw.app, get("/attach/0000000000")).await;

    let (status, metrics) = send_json(&gw.app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["submissions_accepted"], 1);
    assert_eq!(metrics["submissions_rejected"], 1);
    assert_eq!(metrics["files_stored"], 1);
    assert_eq!(metrics["retrievals_hit"], 1);
    assert_eq!(metrics["retrievals_miss"], 1);
    assert_eq!(metrics["requests_total"], 5);
}
