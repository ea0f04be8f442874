use core::str::FromStr;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fintrack_core::{
    DomainError, DomainResult, Entity, Owned, PersonId, TransactionId, UserId, Violations,
};

use crate::validate;

/// Settlement state of a transaction.
///
/// `Partial` and `Cancelled` count toward a section's total but toward
/// neither its pending nor its completed sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    #[default]
    Completed,
    Partial,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Partial => "partial",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "partial" => Ok(TransactionStatus::Partial),
            "cancelled" => Ok(TransactionStatus::Cancelled),
            _ => Err(DomainError::invalid_field("status", "Invalid status")),
        }
    }
}

/// Optional per-transaction details. Unknown keys are kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TransactionMetadata {
    /// Deep merge: keys present in `patch` overwrite, everything else is kept.
    pub fn merge(&mut self, patch: TransactionMetadata) {
        if patch.interest_rate.is_some() {
            self.interest_rate = patch.interest_rate;
        }
        if patch.principal.is_some() {
            self.principal = patch.principal;
        }
        if patch.category.is_some() {
            self.category = patch.category;
        }
        if patch.payment_method.is_some() {
            self.payment_method = patch.payment_method;
        }
        for (key, value) in patch.extra {
            match (self.extra.get_mut(&key), value) {
                (Some(serde_json::Value::Object(existing)), serde_json::Value::Object(incoming)) => {
                    for (k, v) in incoming {
                        existing.insert(k, v);
                    }
                }
                (_, value) => {
                    self.extra.insert(key, value);
                }
            }
        }
    }
}

/// A monetary movement between the user and one person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub person_id: PersonId,
    pub user_id: UserId,
    pub date: DateTime<Utc>,
    pub amount: Decimal,
    pub remarks: String,
    pub status: TransactionStatus,
    /// Free-form sub-category.
    #[serde(rename = "type")]
    pub kind: String,
    pub metadata: TransactionMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Transaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for Transaction {
    fn owner(&self) -> UserId {
        self.user_id
    }
}

impl Transaction {
    /// Record a new transaction. The caller has already checked that the
    /// person belongs to `user_id`.
    pub fn record(user_id: UserId, new: NewTransaction, now: DateTime<Utc>) -> Self {
        Self {
            id: TransactionId::new(),
            person_id: new.person_id,
            user_id,
            date: new.date.unwrap_or(now),
            amount: new.amount,
            remarks: new.remarks,
            status: new.status,
            kind: new.kind,
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: TransactionChanges, now: DateTime<Utc>) {
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(remarks) = patch.remarks {
            self.remarks = remarks;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(metadata) = patch.metadata {
            self.metadata.merge(metadata);
        }
        self.updated_at = now;
    }
}

/// Unvalidated transaction creation input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    pub person_id: Option<String>,
    pub date: Option<String>,
    pub amount: Option<Decimal>,
    pub remarks: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub metadata: Option<TransactionMetadata>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub person_id: PersonId,
    /// `None` means "now" at record time.
    pub date: Option<DateTime<Utc>>,
    pub amount: Decimal,
    pub remarks: String,
    pub status: TransactionStatus,
    pub kind: String,
    pub metadata: TransactionMetadata,
}

impl TransactionDraft {
    pub fn validate(self) -> DomainResult<NewTransaction> {
        let mut v = Violations::new();

        let person_id = self
            .person_id
            .as_deref()
            .and_then(|id| id.parse::<PersonId>().ok());
        v.check(person_id.is_some(), "personId", "Invalid person ID");

        check_amount(self.amount, &mut v);

        let date = parse_optional_date(self.date.as_deref(), &mut v);
        let status = parse_optional_status(self.status.as_deref(), &mut v);

        let remarks = self.remarks.as_deref().map(str::trim).unwrap_or_default();
        v.check(
            validate::is_valid_remarks(remarks),
            "remarks",
            "Remarks too long (max 500 characters)",
        );

        v.into_result()?;

        match (person_id, self.amount) {
            (Some(person_id), Some(amount)) => Ok(NewTransaction {
                person_id,
                date,
                amount,
                remarks: remarks.to_string(),
                status: status.unwrap_or_default(),
                kind: self.kind.as_deref().map(str::trim).unwrap_or_default().to_string(),
                metadata: self.metadata.unwrap_or_default(),
            }),
            _ => Err(DomainError::invalid_field("personId", "Invalid person ID")),
        }
    }
}

/// Partial transaction update input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    pub date: Option<String>,
    pub amount: Option<Decimal>,
    pub remarks: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub metadata: Option<TransactionMetadata>,
}

/// Validated transaction changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionChanges {
    pub date: Option<DateTime<Utc>>,
    pub amount: Option<Decimal>,
    pub remarks: Option<String>,
    pub status: Option<TransactionStatus>,
    pub kind: Option<String>,
    pub metadata: Option<TransactionMetadata>,
}

impl TransactionPatch {
    pub fn validate(self) -> DomainResult<TransactionChanges> {
        let mut v = Violations::new();

        if self.amount.is_some() {
            check_amount(self.amount, &mut v);
        }

        let date = parse_optional_date(self.date.as_deref(), &mut v);
        let status = parse_optional_status(self.status.as_deref(), &mut v);

        let remarks = self.remarks.map(|r| r.trim().to_string());
        if let Some(remarks) = &remarks {
            v.check(
                validate::is_valid_remarks(remarks),
                "remarks",
                "Remarks too long (max 500 characters)",
            );
        }

        v.into_result()?;

        Ok(TransactionChanges {
            date,
            amount: self.amount,
            remarks,
            status,
            kind: self.kind.map(|k| k.trim().to_string()),
            metadata: self.metadata,
        })
    }
}

fn check_amount(amount: Option<Decimal>, v: &mut Violations) {
    match amount {
        Some(a) if a > Decimal::ZERO => v.check(
            validate::is_within_amount_limit(a),
            "amount",
            &validate::amount_limit_message("Amount"),
        ),
        _ => v.push("amount", "Amount must be greater than 0"),
    }
}

fn parse_optional_date(input: Option<&str>, v: &mut Violations) -> Option<DateTime<Utc>> {
    let raw = input?;
    let parsed = validate::parse_date(raw);
    v.check(parsed.is_some(), "date", "Invalid date format");
    parsed
}

fn parse_optional_status(input: Option<&str>, v: &mut Violations) -> Option<TransactionStatus> {
    let raw = input?;
    match raw.parse::<TransactionStatus>() {
        Ok(status) => Some(status),
        Err(_) => {
            v.push("status", "Invalid status");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft(amount: i64) -> TransactionDraft {
        TransactionDraft {
            person_id: Some(PersonId::new().to_string()),
            amount: Some(Decimal::from(amount)),
            ..Default::default()
        }
    }

    fn fields(err: DomainError) -> Vec<&'static str> {
        match err {
            DomainError::Validation(fields) => fields.into_iter().map(|f| f.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_status_to_completed_and_date_to_now() {
        let new = draft(100).validate().unwrap();
        assert_eq!(new.status, TransactionStatus::Completed);
        assert!(new.date.is_none());

        let now = Utc::now();
        let tx = Transaction::record(UserId::new(), new, now);
        assert_eq!(tx.date, now);
        assert_eq!(tx.created_at, now);
    }

    #[test]
    fn rejects_zero_amount_bad_status_and_bad_date() {
        let mut d = draft(0);
        d.status = Some("settled".to_string());
        d.date = Some("yesterday".to_string());

        assert_eq!(fields(d.validate().unwrap_err()), vec!["amount", "date", "status"]);
    }

    #[test]
    fn rejects_missing_person_and_amount() {
        let err = TransactionDraft::default().validate().unwrap_err();
        assert_eq!(fields(err), vec!["personId", "amount"]);
    }

    #[test]
    fn rejects_long_remarks() {
        let mut d = draft(5);
        d.remarks = Some("x".repeat(501));
        assert_eq!(fields(d.validate().unwrap_err()), vec!["remarks"]);
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut tx = Transaction::record(UserId::new(), draft(100).validate().unwrap(), Utc::now());
        tx.remarks = "keep".to_string();

        let changes = TransactionPatch {
            status: Some("pending".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        tx.apply(changes, Utc::now());

        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.amount, Decimal::from(100));
        assert_eq!(tx.remarks, "keep");
    }

    #[test]
    fn patch_rejects_non_positive_amount() {
        let err = TransactionPatch {
            amount: Some(Decimal::ZERO),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(fields(err), vec!["amount"]);
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        let limit = Decimal::from(validate::AMOUNT_MAX_UNITS);
        assert!(draft(validate::AMOUNT_MAX_UNITS).validate().is_ok());

        let mut d = draft(1);
        d.amount = Some(Decimal::MAX);
        assert_eq!(fields(d.validate().unwrap_err()), vec!["amount"]);

        let err = TransactionPatch {
            amount: Some(limit + Decimal::ONE),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(fields(err), vec!["amount"]);
    }

    #[test]
    fn metadata_is_deep_merged() {
        let mut base: TransactionMetadata = serde_json::from_value(json!({
            "interestRate": 2.5,
            "category": "rent",
            "bank": { "name": "First", "branch": "North" }
        }))
        .unwrap();

        let patch: TransactionMetadata = serde_json::from_value(json!({
            "paymentMethod": "upi",
            "bank": { "branch": "South" },
            "reference": "INV-7"
        }))
        .unwrap();

        base.merge(patch);

        assert_eq!(base.interest_rate, Some(Decimal::new(25, 1)));
        assert_eq!(base.category.as_deref(), Some("rent"));
        assert_eq!(base.payment_method.as_deref(), Some("upi"));
        assert_eq!(base.extra["bank"], json!({ "name": "First", "branch": "South" }));
        assert_eq!(base.extra["reference"], json!("INV-7"));
    }

    #[test]
    fn serialises_kind_as_type() {
        let tx = Transaction::record(UserId::new(), draft(1).validate().unwrap(), Utc::now());
        let value = serde_json::to_value(&tx).unwrap();
        assert!(value.get("type").is_some());
        assert_eq!(value["status"], json!("completed"));
    }
}
