//! Pure reductions behind the dashboard.
//!
//! Fetching is the caller's job; everything here folds already-loaded
//! records into totals and is deterministic.

use std::collections::HashMap;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use rust_decimal::Decimal;
use serde::Serialize;

use fintrack_core::PersonId;

use crate::cash_bank::BalanceSnapshot;
use crate::person::Person;
use crate::section::SectionType;
use crate::transaction::{Transaction, TransactionStatus};

/// Three-bucket sum over a set of transactions.
///
/// `total` counts every amount; `pending` and `completed` only their own
/// status. Partial and cancelled amounts make `total` exceed
/// `pending + completed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SectionTotals {
    pub total: Decimal,
    pub pending: Decimal,
    pub completed: Decimal,
}

impl SectionTotals {
    pub fn record(&mut self, tx: &Transaction) {
        self.total = self.total.saturating_add(tx.amount);
        match tx.status {
            TransactionStatus::Pending => self.pending = self.pending.saturating_add(tx.amount),
            TransactionStatus::Completed => {
                self.completed = self.completed.saturating_add(tx.amount)
            }
            TransactionStatus::Partial | TransactionStatus::Cancelled => {}
        }
    }

    pub fn from_transactions<'a>(txs: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut totals = Self::default();
        for tx in txs {
            totals.record(tx);
        }
        totals
    }
}

impl Add for SectionTotals {
    type Output = SectionTotals;

    fn add(self, rhs: Self) -> Self::Output {
        SectionTotals {
            total: self.total.saturating_add(rhs.total),
            pending: self.pending.saturating_add(rhs.pending),
            completed: self.completed.saturating_add(rhs.completed),
        }
    }
}

impl AddAssign for SectionTotals {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for SectionTotals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(SectionTotals::default(), Add::add)
    }
}

/// Per-person totals plus how many transactions produced them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonStats {
    pub transaction_count: usize,
    #[serde(flatten)]
    pub totals: SectionTotals,
}

impl PersonStats {
    pub fn from_transactions(txs: &[Transaction]) -> Self {
        Self {
            transaction_count: txs.len(),
            totals: SectionTotals::from_transactions(txs),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_lent: Decimal,
    pub total_borrowed: Decimal,
    pub available_cash: Decimal,
    pub total_expenses: Decimal,
}

/// Complete financial snapshot for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub lending: SectionTotals,
    pub borrowing: SectionTotals,
    pub earnings: SectionTotals,
    pub expenses: SectionTotals,
    pub interest: SectionTotals,
    pub cash_bank: BalanceSnapshot,
    pub net_balance: Decimal,
    pub summary: DashboardSummary,
}

impl DashboardStats {
    /// Assemble the snapshot. Sections absent from `sections` count as zero.
    pub fn assemble(sections: &HashMap<SectionType, SectionTotals>, cash_bank: BalanceSnapshot) -> Self {
        let get = |section| sections.get(&section).copied().unwrap_or_default();
        let lending = get(SectionType::Lending);
        let borrowing = get(SectionType::Borrowing);
        let expenses = get(SectionType::Expenses);

        Self {
            lending,
            borrowing,
            earnings: get(SectionType::Earnings),
            expenses,
            interest: get(SectionType::Interest),
            cash_bank,
            net_balance: lending.total.saturating_sub(borrowing.total),
            summary: DashboardSummary {
                total_lent: lending.total,
                total_borrowed: borrowing.total,
                available_cash: cash_bank.total,
                total_expenses: expenses.total,
            },
        }
    }
}

/// The owning person's identity, attached to a recent transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonSummary {
    pub id: PersonId,
    pub name: String,
    pub section_type: SectionType,
}

impl From<&Person> for PersonSummary {
    fn from(person: &Person) -> Self {
        Self {
            id: person.id,
            name: person.name.clone(),
            section_type: person.section_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub person: Option<PersonSummary>,
}

/// Bounded `limit` for the recent-transactions feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentLimit(usize);

impl RecentLimit {
    pub const DEFAULT: usize = 10;
    pub const MAX: usize = 100;

    pub fn new(limit: usize) -> Self {
        match limit {
            0 => Self(Self::DEFAULT),
            n => Self(n.min(Self::MAX)),
        }
    }

    /// Lenient query-string parsing: anything unusable falls back to the default.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse::<usize>().ok())
            .map(Self::new)
            .unwrap_or_default()
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for RecentLimit {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// Sort by date, newest first.
///
/// `txs` is expected in creation order; the sort is stable, so equal dates
/// keep that order.
pub fn newest_first(mut txs: Vec<Transaction>) -> Vec<Transaction> {
    txs.sort_by(|a, b| b.date.cmp(&a.date));
    txs
}

/// The `limit` most recent transactions, ordered as [`newest_first`].
pub fn most_recent(txs: Vec<Transaction>, limit: RecentLimit) -> Vec<Transaction> {
    let mut txs = newest_first(txs);
    txs.truncate(limit.get());
    txs
}
