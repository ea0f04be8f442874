use std::sync::Arc;

use axum::{Json, extract::Extension, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

use crate::app::errors::ApiError;
use crate::app::services::AppState;

pub async fn health(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let database = if state.stores.ping().await {
        "connected"
    } else {
        "disconnected"
    };

    Json(json!({
        "success": true,
        "message": "FinTrack API is running",
        "environment": state.environment.as_str(),
        "timestamp": Utc::now().to_rfc3339(),
        "database": database,
    }))
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("API endpoint not found")
}
