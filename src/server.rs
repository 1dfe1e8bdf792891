//! HTTP façade over the fusion engine.
//!
//! ## Endpoints
//!
//! - `GET /` service information
//! - `GET /health` backend status, `503` until a snapshot is installed
//! - `POST /search` search with a JSON body
//! - `GET /search` search with query-string parameters
//! - `POST /admin/reload` build a new snapshot and swap it in
//!
//! Unknown paths answer with a JSON `404`. Invalid input maps to `422`, a
//! missing or unusable index to `503`, anything else to `500`.

use axum::Router;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use clipseek_fusion::{
    BackendStatus, ErrorKind, FusionConfig, FusionEngine, RankedResult, SearchOutcome,
    SearchRequest,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{Instrument, info};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{Result, ServiceError};
use crate::reload::{SnapshotLoader, reload};

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Search parameters accepted as a JSON body or a query string.
///
/// Omitted fields take the engine's configured defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    /// Natural-language query.
    pub query: String,
    /// Number of results to return.
    #[serde(default)]
    pub top_k: Option<usize>,
    /// Minimum composite score, inclusive.
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Whether to expand the query into variants.
    #[serde(default)]
    pub use_enhancement: Option<bool>,
}

impl SearchParams {
    /// Resolve omitted fields against `config`.
    pub fn into_request(self, config: &FusionConfig) -> SearchRequest {
        SearchRequest::new(self.query)
            .with_top_k(self.top_k.unwrap_or(config.default_top_k))
            .with_threshold(self.threshold.unwrap_or(config.default_threshold))
            .with_enhancement(self.use_enhancement.unwrap_or(true))
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Body of a successful search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The query as submitted.
    pub query: String,
    /// Ranked results, best first.
    pub results: Vec<RankedResult>,
    /// Engine time for the call in milliseconds.
    pub timing_ms: f64,
    /// Texts of the variants that were dispatched.
    pub enhanced_queries: Vec<String>,
    /// `results.len()`.
    pub results_count: usize,
    /// Description of the backend that served the call.
    pub meta: SearchMeta,
}

/// Backend description attached to every search response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchMeta {
    /// Compute device label.
    pub device: String,
    /// Encoder model name.
    pub model: String,
    /// Vector index kind.
    pub index_type: String,
    /// Images in the corpus.
    pub total_images: usize,
}

impl From<BackendStatus> for SearchMeta {
    fn from(status: BackendStatus) -> Self {
        Self {
            device: status.device,
            model: status.model,
            index_type: status.index_type,
            total_images: status.total_images,
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"healthy"` when returned with `200`.
    pub status: String,
    /// Status of the installed backend.
    #[serde(flatten)]
    pub backend: BackendStatus,
}

/// Body of a successful `POST /admin/reload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadResponse {
    /// Always `"success"`.
    pub status: String,
    /// Human-readable summary.
    pub message: String,
    /// Load time rounded to hundredths of a second.
    pub load_time_seconds: f64,
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Reason phrase of the status code.
    pub error: String,
    /// What went wrong.
    pub detail: String,
    /// Unix time in seconds.
    pub timestamp: f64,
}

impl ErrorResponse {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            error: status.canonical_reason().unwrap_or("Error").to_owned(),
            detail: detail.into(),
            timestamp: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
        }
    }
}

fn error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(status, detail))).into_response()
}

/// HTTP status for a failed call.
pub fn status_for(err: &ServiceError) -> StatusCode {
    match err.kind() {
        ErrorKind::InvalidInput => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        }
        error_response(status, self.to_string())
    }
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Shared state for axum handlers.
pub struct AppState<L: SnapshotLoader> {
    engine: Arc<FusionEngine<L::Backend>>,
    loader: Arc<L>,
    reload_lock: Arc<Mutex<()>>,
    images_route: Arc<str>,
}

impl<L: SnapshotLoader> Clone for AppState<L> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            loader: Arc::clone(&self.loader),
            reload_lock: Arc::clone(&self.reload_lock),
            images_route: Arc::clone(&self.images_route),
        }
    }
}

impl<L: SnapshotLoader> AppState<L> {
    /// State serving `engine`, reloading through `loader`.
    pub fn new(engine: Arc<FusionEngine<L::Backend>>, loader: Arc<L>, config: &ServerConfig) -> Self {
        Self {
            engine,
            loader,
            reload_lock: Arc::new(Mutex::new(())),
            images_route: Arc::from(config.images_route.trim_end_matches('/')),
        }
    }

    /// The engine behind the handlers.
    pub fn engine(&self) -> &Arc<FusionEngine<L::Backend>> {
        &self.engine
    }
}

/// Build the façade router.
pub fn router<L: SnapshotLoader>(state: AppState<L>) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health::<L>))
        .route(
            "/search",
            get(handle_search_query::<L>).post(handle_search_json::<L>),
        )
        .route("/admin/reload", post(handle_reload::<L>))
        .fallback(handle_not_found)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// ApiServer
// ---------------------------------------------------------------------------

/// The façade served from a background task.
pub struct ApiServer {
    /// The address the server is listening on.
    addr: SocketAddr,
    /// Handle to the background server task.
    handle: JoinHandle<()>,
}

impl ApiServer {
    /// Start the HTTP server.
    ///
    /// Binds to `{config.host}:{config.port}` (use port `0` for auto-assign)
    /// and begins serving in a background tokio task.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Server`] if the TCP listener cannot bind.
    pub async fn start<L: SnapshotLoader>(state: AppState<L>, config: &ServerConfig) -> Result<Self> {
        let app = router(state);

        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| ServiceError::Server(format!("bind to {bind_addr} failed: {e}")))?;

        let addr = listener
            .local_addr()
            .map_err(|e| ServiceError::Server(format!("failed to get local addr: {e}")))?;

        info!("search API listening on http://{addr}");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("search API server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// `GET /` service information.
async fn handle_root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Visual Semantic Search API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
        "health": "/health",
    }))
}

/// `GET /health` status of the installed backend.
async fn handle_health<L: SnapshotLoader>(State(state): State<AppState<L>>) -> Response {
    match state.engine.status() {
        Some(backend) => Json(HealthResponse {
            status: "healthy".to_owned(),
            backend,
        })
        .into_response(),
        None => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Search engine not initialized",
        ),
    }
}

/// `POST /search` with a JSON body.
async fn handle_search_json<L: SnapshotLoader>(
    State(state): State<AppState<L>>,
    payload: std::result::Result<Json<SearchParams>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(params)) => run_search(&state, params).await,
        Err(rejection) => error_response(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text()),
    }
}

/// `GET /search` with query-string parameters.
async fn handle_search_query<L: SnapshotLoader>(
    State(state): State<AppState<L>>,
    params: std::result::Result<Query<SearchParams>, QueryRejection>,
) -> Response {
    match params {
        Ok(Query(params)) => run_search(&state, params).await,
        Err(rejection) => error_response(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text()),
    }
}

async fn run_search<L: SnapshotLoader>(state: &AppState<L>, params: SearchParams) -> Response {
    let request = params.into_request(state.engine.config());
    let span = tracing::info_span!("search", request_id = %Uuid::new_v4());

    async move {
        match state.engine.search(&request).await {
            Ok(outcome) => {
                info!(
                    results = outcome.results.len(),
                    elapsed_ms = outcome.elapsed_ms,
                    "search completed"
                );
                Json(search_response(&state.images_route, request.query, outcome)).into_response()
            }
            Err(err) => ServiceError::from(err).into_response(),
        }
    }
    .instrument(span)
    .await
}

/// Shape an outcome for the wire. `meta` describes the snapshot that
/// produced the results, even if a reload has landed since.
fn search_response(images_route: &str, query: String, outcome: SearchOutcome) -> SearchResponse {
    let results: Vec<RankedResult> = outcome
        .results
        .into_iter()
        .map(|mut result| {
            result.image_path = format!("{images_route}/{}", result.filename);
            result
        })
        .collect();
    SearchResponse {
        query,
        results_count: results.len(),
        results,
        timing_ms: outcome.elapsed_ms,
        enhanced_queries: outcome.variants.into_iter().map(|v| v.text).collect(),
        meta: SearchMeta::from(outcome.status),
    }
}

/// `POST /admin/reload` build and install a new snapshot.
async fn handle_reload<L: SnapshotLoader>(State(state): State<AppState<L>>) -> Response {
    // One reload at a time; searches are never blocked.
    let _guard = state.reload_lock.lock().await;
    match reload(&state.engine, state.loader.as_ref()).await {
        Ok(report) => Json(ReloadResponse {
            status: "success".to_owned(),
            message: "Search engine reloaded successfully".to_owned(),
            load_time_seconds: report.load_time_seconds,
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Fallback for unknown paths.
async fn handle_not_found(uri: Uri) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("Endpoint {} not found", uri.path()),
    )
}
