//! Axum API server module
//!
//! REST surface over the risk scorer: one health endpoint and one
//! prediction endpoint. All shared state is loaded once in [`AppState::new`]
//! before the listener binds; request handlers only read it.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::encodings::EncodingTables;
use crate::model::RiskModel;
use crate::scorer::{DiseaseRisk, RiskError, RiskRequest, RiskScorer};

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub scorer: Arc<RiskScorer>,
}

impl AppState {
    /// Load the model and both lookup tables from `model_dir`.
    ///
    /// Any failure propagates out and must abort startup: the service never
    /// serves with partially loaded state.
    pub fn new(model_dir: &str) -> anyhow::Result<Self> {
        let dir = Path::new(model_dir);

        tracing::info!("Loading encoding tables...");
        let tables = EncodingTables::load(dir)?;
        tracing::info!(
            "Loaded {} disease encodings, {} stage-disease mappings",
            tables.disease_count(),
            tables.mapping_count()
        );

        tracing::info!("Loading risk model...");
        let model = RiskModel::load(&dir.join("model.json"))?;
        tracing::info!("Risk model loaded");

        Ok(Self {
            scorer: Arc::new(RiskScorer::new(tables, model)),
        })
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/predict/disease-risk", post(predict_disease_risk))
        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new()) // gzip + brotli compression
        .layer(CorsLayer::permissive()) // Allow all origins (adjust for production)
        .layer(TraceLayer::new_for_http()) // Request logging
        .with_state(state)
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "model_loaded": true,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn predict_disease_risk(
    State(state): State<AppState>,
    Json(payload): Json<RiskRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::debug!(
        "Scoring disease risk for crop='{}', stage='{}'",
        payload.crop,
        payload.stage
    );

    // Inference is CPU-bound and the model is opaque: run the scoring loop
    // on the blocking pool so a slow forward pass cannot stall the executor.
    let scorer = state.scorer.clone();
    let request = payload.clone();
    let ranked = tokio::task::spawn_blocking(move || scorer.predict(&request))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    // serde_json is built with preserve_order, so the map serializes in
    // rank order (descending percentage).
    let mut risk = serde_json::Map::new();
    for DiseaseRisk {
        disease,
        percentage,
        level,
    } in ranked
    {
        risk.insert(
            disease,
            serde_json::json!({ "percentage": percentage, "level": level }),
        );
    }

    Ok(Json(serde_json::json!({
        "crop": payload.crop,
        "stage": payload.stage,
        "risk": risk,
    })))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    /// The request referenced names the tables do not know; 400.
    BadRequest(String),
    /// The stage-disease map and the encodings disagree; the asset is
    /// broken, not the request; 500.
    DataIntegrity(String),
    Internal(String),
}

impl From<RiskError> for AppError {
    fn from(err: RiskError) -> Self {
        match err {
            RiskError::UnknownCrop(_)
            | RiskError::UnknownStage(_)
            | RiskError::NoDiseaseMapping { .. } => AppError::BadRequest(err.to_string()),
            RiskError::MissingDiseaseEncoding(_) => AppError::DataIntegrity(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::DataIntegrity(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
