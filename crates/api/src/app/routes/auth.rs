use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use fintrack_auth::{Credentials, ProfilePatch, RegistrationDraft};

use crate::app::{dto, errors::ApiError, services::AppState};
use crate::context::CurrentUser;

pub async fn register(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<RegistrationDraft>, JsonRejection>,
) -> Result<Response, ApiError> {
    let draft = dto::body(payload)?;
    let session = state.services.identity.register(draft).await?;

    Ok((
        StatusCode::CREATED,
        Json(dto::session_to_json("User registered successfully", &session)),
    )
        .into_response())
}

pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, ApiError> {
    let credentials = dto::body(payload)?;
    let session = state.services.identity.login(credentials).await?;

    Ok(Json(dto::session_to_json("Login successful", &session)).into_response())
}

pub async fn profile(Extension(current): Extension<CurrentUser>) -> Response {
    Json(json!({
        "success": true,
        "user": current.user().profile(),
    }))
    .into_response()
}

pub async fn update_profile(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    payload: Result<Json<ProfilePatch>, JsonRejection>,
) -> Result<Response, ApiError> {
    let patch = dto::body(payload)?;
    let user = state
        .services
        .identity
        .update_profile(current.id(), patch)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "user": user.profile(),
    }))
    .into_response())
}

pub async fn interest_access(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Response {
    let has_access = state.services.identity.has_interest_access(current.user());
    Json(json!({ "success": true, "hasAccess": has_access })).into_response()
}
