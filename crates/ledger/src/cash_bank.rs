use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fintrack_core::{DomainResult, UserId, Violations};

use crate::validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceKind {
    Cash,
    Bank,
}

/// Audit entry appended whenever a balance actually changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChange {
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: BalanceKind,
    pub previous_amount: Decimal,
    pub new_amount: Decimal,
    pub change: Decimal,
}

/// The single cash/bank record a user owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashBank {
    pub user_id: UserId,
    pub cash: Decimal,
    pub bank: Decimal,
    pub history: Vec<BalanceChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read view of a balance record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    pub cash: Decimal,
    pub bank: Decimal,
    pub total: Decimal,
}

/// Direct-set request; omitted fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct BalanceUpdate {
    pub cash: Option<Decimal>,
    pub bank: Option<Decimal>,
}

impl BalanceUpdate {
    pub fn validate(&self) -> DomainResult<()> {
        let mut v = Violations::new();
        if let Some(cash) = self.cash {
            v.check(cash >= Decimal::ZERO, "cash", "Cash amount must be 0 or greater");
            v.check(
                validate::is_within_amount_limit(cash),
                "cash",
                &validate::amount_limit_message("Cash amount"),
            );
        }
        if let Some(bank) = self.bank {
            v.check(bank >= Decimal::ZERO, "bank", "Bank amount must be 0 or greater");
            v.check(
                validate::is_within_amount_limit(bank),
                "bank",
                &validate::amount_limit_message("Bank amount"),
            );
        }
        v.into_result()
    }
}

impl CashBank {
    /// The zero-balance record materialised on first access.
    pub fn empty(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            cash: Decimal::ZERO,
            bank: Decimal::ZERO,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn total(&self) -> Decimal {
        self.cash.saturating_add(self.bank)
    }

    pub fn snapshot(&self) -> BalanceSnapshot {
        BalanceSnapshot {
            cash: self.cash,
            bank: self.bank,
            total: self.total(),
        }
    }

    /// Set balances directly, appending one history entry per changed field.
    pub fn apply(&mut self, update: BalanceUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        update.validate()?;

        if let Some(cash) = update.cash {
            self.set(BalanceKind::Cash, cash, now);
        }
        if let Some(bank) = update.bank {
            self.set(BalanceKind::Bank, bank, now);
        }
        self.updated_at = now;
        Ok(())
    }

    fn set(&mut self, kind: BalanceKind, amount: Decimal, now: DateTime<Utc>) {
        let slot = match kind {
            BalanceKind::Cash => &mut self.cash,
            BalanceKind::Bank => &mut self.bank,
        };
        let previous = *slot;
        if previous == amount {
            return;
        }
        *slot = amount;
        self.history.push(BalanceChange {
            date: now,
            kind,
            previous_amount: previous,
            new_amount: amount,
            change: amount.saturating_sub(previous),
        });
    }
}
