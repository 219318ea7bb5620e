//! JSON HTTP API over the current dataset snapshot.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (version and current dataset version) |
//! | `GET`  | `/items?q=&limit=` | Filtered items from the current snapshot |
//! | `GET`  | `/stats` | Dataset statistics |
//! | `POST` | `/dataset` | Replace the dataset (raw file bytes, `x-admin-password` header) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "no_data", "message": "no dataset loaded" } }
//! ```
//!
//! Error codes: `bad_request` (400), `missing_columns` (400), `unreadable` (400),
//! `forbidden` (403), `no_data` (503), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, DefaultBodyLimit, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::load;
use crate::search::{item_views, search_page};
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::stats::{compute_stats, SnapshotStats};
use crate::update::{apply_update, UpdateError, UpdateOutcome};

/// Header carrying the admin password for `POST /dataset`.
pub const PASSWORD_HEADER: &str = "x-admin-password";

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<SnapshotStore>,
    /// Serializes dataset updates so fingerprint comparison and rename
    /// happen as one step.
    update_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<SnapshotStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            update_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let max_upload = state.config.server.max_upload_bytes;

    Router::new()
        .route("/health", get(handle_health))
        .route("/items", get(handle_items))
        .route("/stats", get(handle_stats))
        .route("/dataset", post(handle_upload))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(cors)
        .with_state(state)
}

/// Load the configured dataset and serve until the process is stopped.
///
/// A dataset that fails to load is logged and the server starts with no
/// data, so a corrected file can still be uploaded.
pub async fn run_server(config: Config) -> Result<()> {
    let store = Arc::new(SnapshotStore::new());
    match load::load_into(&store, &config) {
        Ok(Some(snapshot)) => tracing::info!(version = snapshot.version, "serving dataset"),
        Ok(None) => {}
        Err(e) => tracing::error!("{:#}", e),
    }

    let bind_addr = config.server.bind.clone();
    let app = router(AppState::new(config, store));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn app_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> AppError {
    AppError {
        status,
        code,
        message: message.into(),
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    app_error(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn no_data() -> AppError {
    app_error(
        StatusCode::SERVICE_UNAVAILABLE,
        "no_data",
        "no dataset loaded",
    )
}

impl From<UpdateError> for AppError {
    fn from(err: UpdateError) -> Self {
        let message = err.to_string();
        match err {
            UpdateError::Disabled | UpdateError::Forbidden => {
                app_error(StatusCode::FORBIDDEN, "forbidden", message)
            }
            UpdateError::Missing(_) => app_error(StatusCode::BAD_REQUEST, "missing_columns", message),
            UpdateError::Read(_) => app_error(StatusCode::BAD_REQUEST, "unreadable", message),
            UpdateError::Io { .. } => {
                tracing::error!("{}", message);
                app_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
            }
        }
    }
}

fn current(state: &AppState) -> Result<Arc<Snapshot>, AppError> {
    state.store.current().ok_or_else(no_data)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    /// `null` until a dataset has been loaded.
    dataset_version: Option<u64>,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        dataset_version: state.store.current().map(|s| s.version),
    })
}

// ============ GET /items ============

#[derive(Deserialize)]
struct ItemsParams {
    #[serde(default)]
    q: String,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct ItemsResponse<'a> {
    version: u64,
    total: usize,
    matched: usize,
    returned: usize,
    items: Vec<crate::format::ItemView<'a>>,
}

async fn handle_items(
    State(state): State<AppState>,
    params: Result<Query<ItemsParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params.map_err(|e| bad_request(e.body_text()))?;
    let limit = params.limit.unwrap_or(state.config.display.limit);
    if limit == 0 {
        return Err(bad_request("limit must be >= 1"));
    }
    let snapshot = current(&state)?;

    let page = search_page(&snapshot.dataset, &params.q, limit);
    let today = chrono::Local::now().date_naive();
    tracing::debug!(q = %params.q, matched = page.matched, "items query");

    let body = ItemsResponse {
        version: snapshot.version,
        total: page.total,
        matched: page.matched,
        returned: page.items.len(),
        items: item_views(&page.items, &state.config, today),
    };
    Ok(Json(body).into_response())
}

// ============ GET /stats ============

async fn handle_stats(State(state): State<AppState>) -> Result<Json<SnapshotStats>, AppError> {
    let snapshot = current(&state)?;
    let today = chrono::Local::now().date_naive();
    Ok(Json(SnapshotStats {
        version: snapshot.version,
        source: snapshot.source.clone(),
        fingerprint: snapshot.fingerprint.clone(),
        loaded_at: snapshot.loaded_at,
        stats: compute_stats(&snapshot.dataset, today, state.config.display.expiring_days),
    }))
}

// ============ POST /dataset ============

#[derive(Serialize)]
struct UploadResponse {
    status: UpdateOutcome,
    version: u64,
    rows: usize,
    warnings: usize,
}

async fn handle_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, AppError> {
    let password = headers
        .get(PASSWORD_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let _guard = state.update_lock.lock().await;
    let config = state.config.clone();
    let applied = tokio::task::spawn_blocking(move || apply_update(&config, &body, &password))
        .await
        .map_err(|e| app_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string()))??;

    load::log_dataset(&applied.loaded, "upload");
    let rows = applied.loaded.dataset.len();
    let warnings = applied.loaded.dataset.warnings.len();

    let version = match state.store.current() {
        Some(snap)
            if applied.outcome == UpdateOutcome::Unchanged
                && snap.fingerprint == applied.loaded.fingerprint =>
        {
            snap.version
        }
        _ => {
            state
                .store
                .replace(applied.loaded.dataset, applied.loaded.fingerprint, "upload")
                .version
        }
    };

    Ok(Json(UploadResponse {
        status: applied.outcome,
        version,
        rows,
        warnings,
    }))
}
