//! API Gateway service: HTTP surface of the submission pipeline.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /health` | liveness |
//! | `POST /api/upload` | multipart submission |
//! | `GET /attach/:hash` | download a stored object by hash or hash prefix |
//! | `GET /metrics` | JSON counters |

use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::domain::types::{HealthResponse, UploadForm};
use crate::middleware::{create_cors_layer, track_requests, GatewayMetrics};
use ao_01_submission_verification::{
    SubmissionApi, SubmissionPipeline, SystemTimeSource, UploadedFile,
};
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::future::Future;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// API Gateway service state
pub struct ApiGatewayService {
    config: GatewayConfig,
    api: Arc<dyn SubmissionApi>,
    metrics: Arc<GatewayMetrics>,
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    api: Arc<dyn SubmissionApi>,
    metrics: Arc<GatewayMetrics>,
}

impl ApiGatewayService {
    /// Create a gateway in front of an existing pipeline.
    pub fn new(config: GatewayConfig, api: Arc<dyn SubmissionApi>) -> Result<Self, GatewayError> {
        config
            .http
            .validate()
            .and_then(|_| config.cors.validate())
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        Ok(Self {
            config,
            api,
            metrics: Arc::new(GatewayMetrics::new()),
        })
    }

    /// Validate `config` and wire the production pipeline.
    pub fn from_config(config: GatewayConfig) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let pipeline =
            SubmissionPipeline::from_config(&config.pipeline, Arc::new(SystemTimeSource))
                .map_err(|e| GatewayError::Config(e.to_string()))?;

        Self::new(config, Arc::new(pipeline))
    }

    /// Get metrics
    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Build the HTTP router with its middleware stack.
    pub fn router(&self) -> Router {
        let state = AppState {
            api: Arc::clone(&self.api),
            metrics: Arc::clone(&self.metrics),
        };
        let limit = self.config.http.max_upload_bytes;

        let middleware = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(create_cors_layer(&self.config.cors))
            .layer(axum::middleware::from_fn_with_state(
                Arc::clone(&self.metrics),
                track_requests,
            ))
            .layer(DefaultBodyLimit::max(limit))
            .layer(RequestBodyLimitLayer::new(limit));

        Router::new()
            .route("/health", get(health_check))
            .route("/api/upload", post(handle_upload))
            .route("/attach/:hash", get(handle_attach))
            .route("/metrics", get(handle_metrics))
            .layer(middleware)
            .with_state(state)
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.http_addr();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))?;

        info!(addr = %addr, "Starting HTTP server");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        info!("API Gateway stopped");
        Ok(())
    }
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

async fn handle_metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

/// `POST /api/upload`
async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, GatewayError> {
    let mut form = read_form(multipart).await?;
    let batch = form.take_batch()?;

    let result = state.api.submit(batch).await;
    state.metrics.record_submission(&result);

    Ok(Json(form.accepted(result?)))
}

/// Drain the multipart stream into an [`UploadForm`].
async fn read_form(mut multipart: Multipart) -> Result<UploadForm, GatewayError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::Multipart(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "files" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let content = field
                .bytes()
                .await
                .map_err(|e| GatewayError::Multipart(e.body_text()))?;

            debug!(file = %file_name, size = content.len(), "file part received");
            form.files.push(UploadedFile {
                file_name,
                content_type,
                content: content.to_vec(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| GatewayError::Multipart(e.body_text()))?;
            form.set_text(&name, value);
        }
    }

    Ok(form)
}

/// `GET /attach/:hash`
async fn handle_attach(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let located = state.api.locate(&hash).await;
    let Some(object) = located else {
        state.metrics.record_retrieval(false);
        return Err(GatewayError::NotFound(hash));
    };

    let bytes = match tokio::fs::read(&object.path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            // Indexed but gone from disk
            warn!(hash = %object.content_hash, kind = ?e.kind(), "stored object unreadable");
            state.metrics.record_retrieval(false);
            return Err(GatewayError::NotFound(hash));
        }
    };
    state.metrics.record_retrieval(true);

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", object.object_name),
            ),
        ],
        bytes,
    ))
}
