//! Domain error model.

use serde::Serialize;
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Domain-level error.
///
/// Deterministic business failures only. Storage and transport failures are
/// modelled by the layers that own them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// One or more input fields failed validation.
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// A uniqueness rule was violated (e.g. duplicate person name in a section).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The record does not exist or is not owned by the caller.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Missing, invalid or expired credentials, or an inactive account.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The caller lacks an entitlement for a gated feature.
    #[error("access denied: {0}")]
    AccessDenied(String),
}

impl DomainError {
    pub fn validation(fields: Vec<FieldError>) -> Self {
        Self::Validation(fields)
    }

    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound(entity)
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn access_denied(msg: impl Into<String>) -> Self {
        Self::AccessDenied(msg.into())
    }
}

/// Collects field errors while validating a request, then fails once.
#[derive(Debug, Default)]
pub struct Violations(Vec<FieldError>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    /// Record `message` against `field` when `ok` is false.
    pub fn check(&mut self, ok: bool, field: &'static str, message: &str) {
        if !ok {
            self.push(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> DomainResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self.0))
        }
    }
}
