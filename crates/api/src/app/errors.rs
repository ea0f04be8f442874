//! Consistent error responses.
//!
//! Every failure leaves the API as `{success: false, message, errors?, error?}`.
//! `error` carries internal detail and is only attached in development, by
//! [`expose_internal_detail`].

use axum::{
    Json,
    extract::{Request, State, rejection::JsonRejection},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::{debug, error};

use fintrack_core::{DomainError, FieldError};
use fintrack_infra::{Environment, ServiceError};

const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    errors: Vec<FieldError>,
    detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            errors: Vec::new(),
            detail: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(errors) => Self {
                errors,
                ..Self::new(StatusCode::BAD_REQUEST, "Validation failed")
            },
            DomainError::Conflict(msg) => Self::new(StatusCode::BAD_REQUEST, msg),
            DomainError::NotFound(what) => Self::not_found(format!("{what} not found")),
            DomainError::Unauthenticated(msg) => Self::unauthorized(msg),
            DomainError::AccessDenied(msg) => Self::new(StatusCode::FORBIDDEN, msg),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e) => e.into(),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            detail: Some(rejection.body_text()),
            ..Self::new(StatusCode::BAD_REQUEST, "Invalid request body")
        }
    }
}

/// Internal detail riding along on an error response until
/// [`expose_internal_detail`] decides whether the client may see it.
#[derive(Debug, Clone)]
struct ErrorDetail {
    message: String,
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), detail = ?self.detail, "request failed");
        } else if !self.errors.is_empty() {
            debug!(errors = ?self.errors, "validation failed");
        }

        let mut response = (self.status, Json(envelope(&self.message, &self.errors))).into_response();
        if let Some(detail) = self.detail {
            response.extensions_mut().insert(ErrorDetail {
                message: self.message,
                detail,
            });
        }
        response
    }
}

fn envelope(message: &str, errors: &[FieldError]) -> Value {
    let mut body = json!({
        "success": false,
        "message": message,
    });
    if !errors.is_empty() {
        body["errors"] = json!(errors);
    }
    body
}

/// Adds the `error` detail field to failed responses in development.
pub async fn expose_internal_detail(
    State(environment): State<Environment>,
    req: Request,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;
    let Some(ErrorDetail { message, detail }) = response.extensions_mut().remove::<ErrorDetail>()
    else {
        return response;
    };
    if !environment.is_development() {
        return response;
    }

    let mut body = envelope(&message, &[]);
    body["error"] = Value::String(detail);
    (response.status(), Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fintrack_infra::StoreError;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::invalid_field("name", "required"), StatusCode::BAD_REQUEST),
            (DomainError::conflict("taken"), StatusCode::BAD_REQUEST),
            (DomainError::not_found("Person"), StatusCode::NOT_FOUND),
            (DomainError::unauthenticated("no"), StatusCode::UNAUTHORIZED),
            (DomainError::access_denied("no"), StatusCode::FORBIDDEN),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn not_found_names_the_record() {
        let err = ApiError::from(DomainError::not_found("Transaction"));
        assert_eq!(err.message, "Transaction not found");
    }

    #[test]
    fn store_failures_are_generic_500s() {
        let err = ApiError::from(ServiceError::Store(StoreError::Backend(
            "connection refused".to_string(),
        )));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, INTERNAL_MESSAGE);
        assert_eq!(err.detail.as_deref(), Some("store backend failure: connection refused"));
    }

    #[test]
    fn envelope_lists_field_errors_only_when_present() {
        let plain = envelope("nope", &[]);
        assert!(plain.get("errors").is_none());

        let body = envelope("Validation failed", &[FieldError::new("amount", "must be positive")]);
        assert_eq!(body["errors"][0]["field"], "amount");
        assert_eq!(body["success"], false);
    }
}
