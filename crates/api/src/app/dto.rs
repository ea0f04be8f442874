//! Request extraction helpers and JSON response mapping.

use axum::{Json, extract::rejection::JsonRejection};
use serde::Deserialize;
use serde_json::{Value, json};

use fintrack_core::{DomainError, PersonId, TransactionId};
use fintrack_infra::services::Session;
use fintrack_ledger::{CashBank, RecentLimit, SectionType};

use crate::app::errors::ApiError;

// -------------------------
// Request helpers
// -------------------------

/// Unwrap a JSON body, turning malformed input into a 400 envelope.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(ApiError::from)
}

pub fn person_id(raw: &str) -> Result<PersonId, ApiError> {
    raw.parse()
        .map_err(|_| DomainError::invalid_field("id", "Invalid person ID").into())
}

pub fn transaction_id(raw: &str) -> Result<TransactionId, ApiError> {
    raw.parse()
        .map_err(|_| DomainError::invalid_field("id", "Invalid transaction ID").into())
}

pub fn section(raw: &str) -> Result<SectionType, ApiError> {
    raw.parse::<SectionType>().map_err(ApiError::from)
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<String>,
}

impl RecentQuery {
    pub fn limit(&self) -> RecentLimit {
        RecentLimit::parse(self.limit.as_deref())
    }
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn session_to_json(message: &str, session: &Session) -> Value {
    json!({
        "success": true,
        "message": message,
        "token": session.token,
        "user": session.user.profile(),
    })
}

pub fn cash_bank_to_json(record: &CashBank) -> Value {
    let snapshot = record.snapshot();
    json!({
        "cash": snapshot.cash,
        "bank": snapshot.bank,
        "total": snapshot.total,
        "updatedAt": record.updated_at,
        "history": record.history,
    })
}
