//! Ledger domain module (persons, transactions, cash/bank balances).
//!
//! Business rules for a user's counterparties and the money moving between
//! them, implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage). The reduction half of the dashboard lives in [`summary`].

pub mod cash_bank;
pub mod person;
pub mod section;
pub mod summary;
pub mod transaction;
pub mod validate;

pub use cash_bank::{BalanceChange, BalanceKind, BalanceSnapshot, BalanceUpdate, CashBank};
pub use person::{NewPerson, Person, PersonDraft, PersonMetadata, PersonPatch, duplicate_name};
pub use section::SectionType;
pub use summary::{
    DashboardStats, DashboardSummary, PersonStats, PersonSummary, RecentLimit, RecentTransaction,
    SectionTotals, most_recent, newest_first,
};
pub use transaction::{
    NewTransaction, Transaction, TransactionChanges, TransactionDraft, TransactionMetadata,
    TransactionPatch, TransactionStatus,
};
