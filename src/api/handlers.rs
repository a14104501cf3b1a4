use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::api::dto::{HealthResponse, MessageResponse};
use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::models::Composite;

/// GET /api/data - build the composite dashboard document
pub async fn get_data(State(state): State<Arc<AppState>>) -> Result<Json<Composite>, ApiError> {
    info!("Received request for dashboard data");
    let start = Instant::now();

    let output = state.pipeline.build().await.map_err(|e| {
        error!("Dashboard build failed: {}", e);
        ApiError::DataUnavailable
    })?;

    info!(
        "Dashboard document built in {:.2}s ({} KPI warnings)",
        start.elapsed().as_secs_f64(),
        output.warnings.len()
    );

    Ok(Json(output.composite))
}

/// POST /api/data - overwrite the stored template
pub async fn save_data(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(document) = payload.map_err(|e| {
        error!("Rejected template body: {}", e.body_text());
        ApiError::WriteFailed
    })?;

    state.pipeline.store().save(&document).await.map_err(|e| {
        error!("Template save failed: {}", e);
        ApiError::WriteFailed
    })?;

    Ok(Json(MessageResponse::new(
        "Base data template saved successfully!",
    )))
}

/// GET /health - liveness probe
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        started_at: state.started_at,
        uptime_secs: state.uptime_secs(),
    })
}
