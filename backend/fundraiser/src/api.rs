//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::errors::FundraiserError;
use crate::masking::mask_email;
use crate::progress::{self, ProgressSummary};
use crate::schema::{Contribution, Investor, Record, ValidationError, Violation};
use crate::store::{self, Document, Filter, Limit, Storage};

const DEFAULT_INVESTOR_LIMIT: u32 = 50;
const DEFAULT_CONTRIBUTION_LIMIT: u32 = 100;

/// Longest error detail handed back to callers.
const MAX_ERROR_DETAIL: usize = 120;
/// Longest store error shown on the diagnostic endpoint.
const MAX_DIAGNOSTIC_DETAIL: usize = 80;
const MAX_LISTED_COLLECTIONS: usize = 10;

#[derive(Clone)]
pub struct ApiState {
    pub storage: Storage,
    /// Fixed at startup.
    pub target: f64,
    pub database_url_set: bool,
    pub database_name: Option<String>,
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/test", get(diagnostics))
        .route("/api/investors", get(list_investors).post(create_investor))
        .route(
            "/api/contributions",
            get(list_contributions).post(create_contribution),
        )
        .route("/api/progress", get(get_progress))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub message: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct DiagnosticsResponse {
    pub backend: &'static str,
    pub database: String,
    pub database_url: &'static str,
    pub database_name: String,
    pub connection_status: &'static str,
    pub collections: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct InsertedResponse {
    pub inserted_id: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<Violation>>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
}

// ─────────────────────────────────────────────────────────
// Error mapping
// ─────────────────────────────────────────────────────────

/// Boundary error: validation failures go back verbatim, an unreadable body
/// keeps the extractor's status, everything else becomes a generic 500 with
/// a truncated detail.
pub enum ApiError {
    Body(JsonRejection),
    Service(FundraiserError),
}

impl From<FundraiserError> for ApiError {
    fn from(e: FundraiserError) -> Self {
        Self::Service(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Service(FundraiserError::Validation(e))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::Body(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            Self::Body(rejection) => {
                warn!("Rejected request body: {}", rejection.body_text());
                return (
                    rejection.status(),
                    Json(ErrorResponse {
                        error: truncate(&rejection.body_text(), MAX_ERROR_DETAIL),
                        violations: Some(vec![Violation::new("body", "json")]),
                    }),
                )
                    .into_response();
            }
            Self::Service(err) => err,
        };

        match err {
            FundraiserError::Validation(v) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    error: v.to_string(),
                    violations: Some(v.violations),
                }),
            )
                .into_response(),
            other => {
                if other.is_storage() {
                    error!("Storage failure: {other}");
                } else {
                    warn!("Request failed: {other}");
                }
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: truncate(&other.to_string(), MAX_ERROR_DETAIL),
                        violations: None,
                    }),
                )
                    .into_response()
            }
        }
    }
}

fn truncate(message: &str, max_chars: usize) -> String {
    message.chars().take(max_chars).collect()
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /`
pub async fn root() -> impl IntoResponse {
    Json(StatusResponse {
        status: "ok",
        service: "backend",
        message: "VIP Fundraiser API running",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /test`
///
/// Reports backend and store connectivity. Never fails: store problems are
/// folded into the report.
pub async fn diagnostics(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let mut report = DiagnosticsResponse {
        backend: "running",
        database: "not available".to_string(),
        database_url: if state.database_url_set { "set" } else { "not set" },
        database_name: state
            .database_name
            .clone()
            .unwrap_or_else(|| "not set".to_string()),
        connection_status: "not connected",
        collections: Vec::new(),
    };

    if let Ok(store) = state.storage.get() {
        match store.collections().await {
            Ok(mut collections) => {
                collections.truncate(MAX_LISTED_COLLECTIONS);
                report.collections = collections;
                report.database = "connected & working".to_string();
                report.connection_status = "connected";
            }
            Err(e) => {
                warn!("Store check failed: {e}");
                report.database = format!(
                    "connected but error: {}",
                    truncate(&e.to_string(), MAX_DIAGNOSTIC_DETAIL)
                );
            }
        }
    }

    Json(report)
}

/// `POST /api/investors`
pub async fn create_investor(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<InsertedResponse>, ApiError> {
    let Json(payload) = payload?;
    insert::<Investor>(&state, payload).await
}

/// `GET /api/investors?limit=`
///
/// Emails are masked in the response; stored documents are untouched.
pub async fn list_investors(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let limit = Limit::from_request(params.limit, DEFAULT_INVESTOR_LIMIT);
    let mut docs =
        store::get_documents::<Investor>(state.storage.get()?, &Filter::new(), limit).await?;

    for doc in &mut docs {
        if let Some(Value::String(email)) = doc.fields.get_mut("email") {
            *email = mask_email(email);
        }
    }
    Ok(Json(docs))
}

/// `POST /api/contributions`
pub async fn create_contribution(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<InsertedResponse>, ApiError> {
    let Json(payload) = payload?;
    insert::<Contribution>(&state, payload).await
}

/// `GET /api/contributions?limit=`
pub async fn list_contributions(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let limit = Limit::from_request(params.limit, DEFAULT_CONTRIBUTION_LIMIT);
    let docs =
        store::get_documents::<Contribution>(state.storage.get()?, &Filter::new(), limit).await?;
    Ok(Json(docs))
}

/// `GET /api/progress`
pub async fn get_progress(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ProgressSummary>, ApiError> {
    let summary = progress::compute_progress(state.storage.get()?, state.target).await?;
    Ok(Json(summary))
}

/// Validate before touching the store, so a rejected payload leaves no trace.
async fn insert<R: Record>(
    state: &ApiState,
    payload: Value,
) -> Result<Json<InsertedResponse>, ApiError> {
    let record = R::parse(payload)?;
    let inserted_id = store::create_document(state.storage.get()?, &record).await?;
    Ok(Json(InsertedResponse { inserted_id }))
}

// ─────────────────────────────────────────────────────────
// Router tests
// ─────────────────────────────────────────────────────────
