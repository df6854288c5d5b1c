use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub storage: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = if state.records.ping().await {
        "connected"
    } else {
        "disconnected"
    };

    let storage = match state.storage.bucket_exists(&state.config.s3_bucket).await {
        Ok(true) => "connected",
        Ok(false) => "bucket_missing",
        Err(e) => {
            tracing::warn!("Storage health probe failed: {}", e);
            "disconnected"
        }
    };

    let status = if database == "connected" && storage == "connected" {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        database: database.to_string(),
        storage: storage.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
