use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::json;

use fintrack_ledger::{TransactionDraft, TransactionPatch};

use crate::app::{dto, errors::ApiError, services::AppState};
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_transaction))
        .route("/person/:person_id", get(list_by_person))
        .route("/:id", put(update_transaction).delete(delete_transaction))
}

pub async fn list_by_person(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(person_id): Path<String>,
) -> Result<Response, ApiError> {
    let person_id = dto::person_id(&person_id)?;
    let transactions = state
        .services
        .ledger
        .transactions_for_person(current.id(), person_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": transactions.len(),
        "transactions": transactions,
    }))
    .into_response())
}

pub async fn create_transaction(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    payload: Result<Json<TransactionDraft>, JsonRejection>,
) -> Result<Response, ApiError> {
    let draft = dto::body(payload)?;
    let transaction = state
        .services
        .ledger
        .create_transaction(current.id(), draft)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Transaction created successfully",
            "transaction": transaction,
        })),
    )
        .into_response())
}

pub async fn update_transaction(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    payload: Result<Json<TransactionPatch>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = dto::transaction_id(&id)?;
    let patch = dto::body(payload)?;
    let transaction = state
        .services
        .ledger
        .update_transaction(current.id(), id, patch)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Transaction updated successfully",
        "transaction": transaction,
    }))
    .into_response())
}

pub async fn delete_transaction(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = dto::transaction_id(&id)?;
    state
        .services
        .ledger
        .delete_transaction(current.id(), id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Transaction deleted successfully",
    }))
    .into_response())
}
