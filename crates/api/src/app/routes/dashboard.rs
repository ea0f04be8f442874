use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use crate::app::{dto, errors::ApiError, services::AppState};
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/stats", get(stats))
        .route("/recent-transactions", get(recent_transactions))
}

pub async fn stats(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    let stats = state.services.dashboard.stats(current.id()).await?;
    Ok(Json(json!({ "success": true, "stats": stats })).into_response())
}

pub async fn recent_transactions(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<dto::RecentQuery>,
) -> Result<Response, ApiError> {
    let transactions = state
        .services
        .dashboard
        .recent(current.id(), query.limit())
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": transactions.len(),
        "transactions": transactions,
    }))
    .into_response())
}
