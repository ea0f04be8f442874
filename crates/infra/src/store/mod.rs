//! Persistence boundary.
//!
//! Three narrow async traits, one per aggregate family, each with an
//! in-memory and a Postgres implementation. Every read and write is scoped
//! by the owning [`UserId`]; ownership checks never rely on the caller
//! filtering results.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use fintrack_auth::User;
use fintrack_core::{PersonId, TransactionId, UserId};
use fintrack_ledger::{CashBank, Person, SectionType, Transaction};

pub mod handle;
pub mod in_memory;
pub mod postgres;

pub use handle::{StoreConfig, StoreHandle};
pub use in_memory::{InMemoryBalanceStore, InMemoryLedgerStore, InMemoryUserStore};
pub use postgres::PostgresStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("uniqueness violation: {0}")]
    Conflict(String),

    /// The backing store failed (connection, query, decoding, poisoned lock).
    #[error("store backend failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` if the email or public id is taken.
    async fn insert(&self, user: User) -> StoreResult<()>;

    async fn get(&self, id: UserId) -> StoreResult<Option<User>>;

    /// `email` must already be normalised.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn update(&self, user: &User) -> StoreResult<()>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Fails with `Conflict` if an active person already holds the
    /// `(owner, name, section)` slot. The check and the insert are atomic.
    async fn insert_person(&self, person: Person) -> StoreResult<()>;

    /// Overwrites the stored row. Fails with `Conflict` if the new name
    /// collides with another active person in the same section.
    async fn update_person(&self, person: &Person) -> StoreResult<()>;

    async fn get_person(&self, owner: UserId, id: PersonId) -> StoreResult<Option<Person>>;

    /// Active persons in `section`, newest first.
    async fn list_persons(&self, owner: UserId, section: SectionType) -> StoreResult<Vec<Person>>;

    /// Persons (active or not) among `ids`, in no particular order.
    async fn persons_by_ids(&self, owner: UserId, ids: &[PersonId]) -> StoreResult<Vec<Person>>;

    async fn insert_transaction(&self, tx: Transaction) -> StoreResult<()>;

    async fn update_transaction(&self, tx: &Transaction) -> StoreResult<()>;

    async fn get_transaction(
        &self,
        owner: UserId,
        id: TransactionId,
    ) -> StoreResult<Option<Transaction>>;

    /// Returns whether a row was removed.
    async fn delete_transaction(&self, owner: UserId, id: TransactionId) -> StoreResult<bool>;

    /// Every transaction of `person`, in creation order.
    async fn transactions_for_person(
        &self,
        owner: UserId,
        person: PersonId,
    ) -> StoreResult<Vec<Transaction>>;

    /// The `limit` latest transactions by date; equal dates keep creation order.
    async fn recent_transactions(&self, owner: UserId, limit: usize)
    -> StoreResult<Vec<Transaction>>;
}

#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Fetch the owner's record, creating a zero one on first access.
    ///
    /// Concurrent first calls for the same owner resolve to one record.
    async fn get_or_create(&self, owner: UserId, now: DateTime<Utc>) -> StoreResult<CashBank>;

    async fn save(&self, record: &CashBank) -> StoreResult<()>;
}
