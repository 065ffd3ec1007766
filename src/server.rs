//! HTTP API consumed by the Che.Comex dashboard.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/hs-codes?q=&limit=` | Search the HS catalogue |
//! | `POST` | `/api/classify` | Classify a product description |
//! | `GET`  | `/api/market-analysis` | Ranked destination opportunities |
//! | `GET`  | `/api/documents/required` | Documents, tariff and NTMs for one destination |
//! | `GET`  | `/api/tariffs` | Tariff rate and NTMs for one destination |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid HS code: abc" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the dashboard can be
//! served from a different origin.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use comex_core::classify::{Classification, Classifier, HsCatalogue};
use comex_core::models::ModelError;
use comex_core::regulatory::RegulatoryProfile;

use crate::analysis::{market_analysis, AnalysisQuery, MarketAnalysis};
use crate::classifier::create_classifier;
use crate::config::Config;
use crate::db;
use crate::documents::{self, TariffInfo};
use crate::migrate::migrate_pool;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: SqlitePool,
    pub classifier: Arc<dyn Classifier>,
    pub catalogue: Arc<HsCatalogue>,
}

impl AppState {
    pub fn new(config: Config, pool: SqlitePool) -> anyhow::Result<Self> {
        let classifier: Arc<dyn Classifier> = Arc::from(create_classifier(&config)?);
        Ok(Self {
            config: Arc::new(config),
            pool,
            classifier,
            catalogue: Arc::new(HsCatalogue::builtin()),
        })
    }
}

/// Builds the router with every route and the CORS layer.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/hs-codes", get(handle_hs_codes))
        .route("/api/classify", post(handle_classify))
        .route("/api/market-analysis", get(handle_market_analysis))
        .route("/api/documents/required", get(handle_required_documents))
        .route("/api/tariffs", get(handle_tariffs))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind`.
///
/// Runs migrations first so a fresh database file can be served right
/// away. The server runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;

    let app = build_router(AppState::new(config.clone(), pool)?);

    tracing::info!(bind = %bind_addr, "starting HTTP server");
    println!("Che.Comex API listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
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
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Maps request-level failures to 400 and everything else to 500.
///
/// Validation failures surface either as a typed [`ModelError`] or as
/// `bail!` messages from the analysis and documents layers.
fn classify_error(err: anyhow::Error) -> AppError {
    let msg = err.to_string();
    if err.downcast_ref::<ModelError>().is_some()
        || msg.contains("invalid")
        || msg.contains("must")
        || msg.contains("could not classify")
    {
        bad_request(msg)
    } else {
        tracing::error!(error = %err, "request failed");
        internal(msg)
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/hs-codes ============

#[derive(Deserialize)]
struct HsSearchQuery {
    #[serde(default)]
    q: String,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct HsCodeItem {
    code: String,
    description: String,
}

#[derive(Serialize)]
struct HsSearchResponse {
    results: Vec<HsCodeItem>,
}

/// Handler for `GET /api/hs-codes`.
///
/// An empty `q` lists the start of the catalogue. `limit` defaults to 20
/// and is capped at 100.
async fn handle_hs_codes(
    State(state): State<AppState>,
    query: Result<Query<HsSearchQuery>, QueryRejection>,
) -> Result<Json<HsSearchResponse>, AppError> {
    let Query(query) = query.map_err(|e| bad_request(e.body_text()))?;
    let limit = query.limit.unwrap_or(20).min(100);
    let results = state
        .catalogue
        .search(&query.q, limit)
        .into_iter()
        .map(|e| HsCodeItem {
            code: e.code.to_string(),
            description: e.description.to_string(),
        })
        .collect();
    Ok(Json(HsSearchResponse { results }))
}

// ============ POST /api/classify ============

#[derive(Deserialize)]
struct ClassifyRequest {
    description: String,
}

async fn handle_classify(
    State(state): State<AppState>,
    body: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<Classification>, AppError> {
    let Json(req) = body.map_err(|e| bad_request(e.body_text()))?;
    if req.description.trim().is_empty() {
        return Err(bad_request("description must not be empty"));
    }

    match state
        .classifier
        .classify(&req.description)
        .await
        .map_err(classify_error)?
    {
        Some(c) => Ok(Json(c)),
        None => Err(not_found(format!(
            "no HS code matches: {}",
            req.description
        ))),
    }
}

// ============ GET /api/market-analysis ============

async fn handle_market_analysis(
    State(state): State<AppState>,
    query: Result<Query<AnalysisQuery>, QueryRejection>,
) -> Result<Json<MarketAnalysis>, AppError> {
    let Query(query) = query.map_err(|e| bad_request(e.body_text()))?;
    let analysis = market_analysis(
        &state.config,
        &state.pool,
        state.classifier.as_ref(),
        &query,
    )
    .await
    .map_err(classify_error)?;
    Ok(Json(analysis))
}

// ============ GET /api/documents/required, /api/tariffs ============

#[derive(Deserialize)]
struct DocumentsQuery {
    hs_code: String,
    country: String,
    origin: Option<String>,
}

async fn handle_required_documents(
    State(state): State<AppState>,
    query: Result<Query<DocumentsQuery>, QueryRejection>,
) -> Result<Json<RegulatoryProfile>, AppError> {
    let Query(q) = query.map_err(|e| bad_request(e.body_text()))?;
    let profile = documents::requirements(&state.pool, &q.hs_code, &q.country, q.origin.as_deref())
        .await
        .map_err(classify_error)?;
    Ok(Json(profile))
}

#[derive(Deserialize)]
struct TariffQuery {
    hs_code: String,
    country: String,
}

async fn handle_tariffs(
    State(state): State<AppState>,
    query: Result<Query<TariffQuery>, QueryRejection>,
) -> Result<Json<TariffInfo>, AppError> {
    let Query(q) = query.map_err(|e| bad_request(e.body_text()))?;
    let info = documents::tariff(&state.pool, &q.hs_code, &q.country)
        .await
        .map_err(classify_error)?;
    Ok(Json(info))
}
