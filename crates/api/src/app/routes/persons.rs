use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use fintrack_ledger::{PersonDraft, PersonPatch};

use crate::app::{dto, errors::ApiError, services::AppState};
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_person))
        .route("/section/:section_type", get(list_by_section))
        .route(
            "/:id",
            get(get_person).put(update_person).delete(delete_person),
        )
}

pub async fn list_by_section(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(section_type): Path<String>,
) -> Result<Response, ApiError> {
    let section = dto::section(&section_type)?;
    let persons = state
        .services
        .ledger
        .list_persons(current.user(), section)
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": persons.len(),
        "persons": persons,
    }))
    .into_response())
}

pub async fn get_person(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = dto::person_id(&id)?;
    let person = state.services.ledger.get_person(current.id(), id).await?;

    Ok(Json(json!({ "success": true, "person": person })).into_response())
}

pub async fn create_person(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    payload: Result<Json<PersonDraft>, JsonRejection>,
) -> Result<Response, ApiError> {
    let draft = dto::body(payload)?;
    let person = state
        .services
        .ledger
        .create_person(current.user(), draft)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Person created successfully",
            "person": person,
        })),
    )
        .into_response())
}

pub async fn update_person(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    payload: Result<Json<PersonPatch>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = dto::person_id(&id)?;
    let patch = dto::body(payload)?;
    let person = state
        .services
        .ledger
        .update_person(current.id(), id, patch)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Person updated successfully",
        "person": person,
    }))
    .into_response())
}

pub async fn delete_person(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = dto::person_id(&id)?;
    state.services.ledger.delete_person(current.id(), id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Person deleted successfully",
    }))
    .into_response())
}
