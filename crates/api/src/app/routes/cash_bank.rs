use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use fintrack_ledger::BalanceUpdate;

use crate::app::{dto, errors::ApiError, services::AppState};
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new().route("/", get(get_balances).put(set_balances))
}

pub async fn get_balances(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    let record = state.services.balances.get(current.id()).await?;

    Ok(Json(json!({
        "success": true,
        "data": dto::cash_bank_to_json(&record),
    }))
    .into_response())
}

pub async fn set_balances(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    payload: Result<Json<BalanceUpdate>, JsonRejection>,
) -> Result<Response, ApiError> {
    let update = dto::body(payload)?;
    let record = state.services.balances.set(current.id(), update).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Balances updated successfully",
        "data": dto::cash_bank_to_json(&record),
    }))
    .into_response())
}
