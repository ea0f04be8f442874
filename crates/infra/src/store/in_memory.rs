//! In-memory stores for tests/dev.
//!
//! Each store keeps its rows behind one `RwLock`, so a uniqueness check and
//! the write it guards happen under the same write guard.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use fintrack_auth::User;
use fintrack_core::{Entity, Owned, PersonId, TransactionId, UserId};
use fintrack_ledger::{CashBank, Person, RecentLimit, SectionType, Transaction, most_recent};

use super::{BalanceStore, LedgerStore, StoreError, StoreResult, UserStore};

/// Rows keyed by id that remember insertion order.
#[derive(Debug)]
struct EntityTable<E: Entity> {
    next_seq: u64,
    rows: BTreeMap<u64, E>,
    index: HashMap<E::Id, u64>,
}

impl<E: Entity> Default for EntityTable<E> {
    fn default() -> Self {
        Self {
            next_seq: 0,
            rows: BTreeMap::new(),
            index: HashMap::new(),
        }
    }
}

impl<E: Entity> EntityTable<E> {
    fn insert(&mut self, row: E) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(*row.id(), seq);
        self.rows.insert(seq, row);
    }

    fn get(&self, id: &E::Id) -> Option<&E> {
        self.index.get(id).and_then(|seq| self.rows.get(seq))
    }

    fn get_mut(&mut self, id: &E::Id) -> Option<&mut E> {
        let seq = self.index.get(id)?;
        self.rows.get_mut(seq)
    }

    fn remove(&mut self, id: &E::Id) -> Option<E> {
        let seq = self.index.remove(id)?;
        self.rows.remove(&seq)
    }

    /// Rows in insertion order.
    fn iter(&self) -> impl Iterator<Item = &E> {
        self.rows.values()
    }
}

impl<E: Owned> EntityTable<E> {
    fn get_owned(&self, owner: UserId, id: &E::Id) -> Option<&E> {
        self.get(id).filter(|row| row.is_owned_by(owner))
    }

    fn owned_by(&self, owner: UserId) -> impl Iterator<Item = &E> {
        self.iter().filter(move |row| row.is_owned_by(owner))
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("in-memory store lock poisoned".to_string())
}

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| poisoned())
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| poisoned())
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<EntityTable<User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: User) -> StoreResult<()> {
        let mut table = write(&self.inner)?;
        if table.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("email {} is taken", user.email)));
        }
        if table.iter().any(|u| u.public_id == user.public_id) {
            return Err(StoreError::Conflict(format!(
                "public id {} is taken",
                user.public_id
            )));
        }
        table.insert(user);
        Ok(())
    }

    async fn get(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(read(&self.inner)?.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(read(&self.inner)?
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        let mut table = write(&self.inner)?;
        match table.get_mut(&user.id) {
            Some(row) => {
                *row = user.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!("user {} vanished", user.id))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ledger
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct LedgerTables {
    persons: EntityTable<Person>,
    transactions: EntityTable<Transaction>,
}

impl LedgerTables {
    fn name_taken(&self, candidate: &Person) -> bool {
        self.persons.iter().any(|p| {
            p.id != candidate.id
                && candidate.is_active
                && p.occupies(candidate.user_id, &candidate.name, candidate.section_type)
        })
    }
}

fn name_conflict(person: &Person) -> StoreError {
    StoreError::Conflict(format!(
        "active person {:?} already exists in {}",
        person.name, person.section_type
    ))
}

#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<LedgerTables>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert_person(&self, person: Person) -> StoreResult<()> {
        let mut tables = write(&self.inner)?;
        if tables.name_taken(&person) {
            return Err(name_conflict(&person));
        }
        tables.persons.insert(person);
        Ok(())
    }

    async fn update_person(&self, person: &Person) -> StoreResult<()> {
        let mut tables = write(&self.inner)?;
        if tables.name_taken(person) {
            return Err(name_conflict(person));
        }
        match tables.persons.get_mut(&person.id) {
            Some(row) if row.is_owned_by(person.user_id) => {
                *row = person.clone();
                Ok(())
            }
            _ => Err(StoreError::Backend(format!("person {} vanished", person.id))),
        }
    }

    async fn get_person(&self, owner: UserId, id: PersonId) -> StoreResult<Option<Person>> {
        Ok(read(&self.inner)?.persons.get_owned(owner, &id).cloned())
    }

    async fn list_persons(&self, owner: UserId, section: SectionType) -> StoreResult<Vec<Person>> {
        let tables = read(&self.inner)?;
        let mut persons: Vec<Person> = tables
            .persons
            .owned_by(owner)
            .filter(|p| p.is_active && p.section_type == section)
            .cloned()
            .collect();
        // Insertion order is creation order; newest first.
        persons.reverse();
        Ok(persons)
    }

    async fn persons_by_ids(&self, owner: UserId, ids: &[PersonId]) -> StoreResult<Vec<Person>> {
        let wanted: HashSet<&PersonId> = ids.iter().collect();
        Ok(read(&self.inner)?
            .persons
            .owned_by(owner)
            .filter(|p| wanted.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn insert_transaction(&self, tx: Transaction) -> StoreResult<()> {
        write(&self.inner)?.transactions.insert(tx);
        Ok(())
    }

    async fn update_transaction(&self, tx: &Transaction) -> StoreResult<()> {
        let mut tables = write(&self.inner)?;
        match tables.transactions.get_mut(&tx.id) {
            Some(row) if row.is_owned_by(tx.user_id) => {
                *row = tx.clone();
                Ok(())
            }
            _ => Err(StoreError::Backend(format!("transaction {} vanished", tx.id))),
        }
    }

    async fn get_transaction(
        &self,
        owner: UserId,
        id: TransactionId,
    ) -> StoreResult<Option<Transaction>> {
        Ok(read(&self.inner)?.transactions.get_owned(owner, &id).cloned())
    }

    async fn delete_transaction(&self, owner: UserId, id: TransactionId) -> StoreResult<bool> {
        let mut tables = write(&self.inner)?;
        if tables.transactions.get_owned(owner, &id).is_none() {
            return Ok(false);
        }
        Ok(tables.transactions.remove(&id).is_some())
    }

    async fn transactions_for_person(
        &self,
        owner: UserId,
        person: PersonId,
    ) -> StoreResult<Vec<Transaction>> {
        Ok(read(&self.inner)?
            .transactions
            .owned_by(owner)
            .filter(|t| t.person_id == person)
            .cloned()
            .collect())
    }

    async fn recent_transactions(
        &self,
        owner: UserId,
        limit: usize,
    ) -> StoreResult<Vec<Transaction>> {
        let all: Vec<Transaction> = read(&self.inner)?
            .transactions
            .owned_by(owner)
            .cloned()
            .collect();
        Ok(most_recent(all, RecentLimit::new(limit)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Balances
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryBalanceStore {
    inner: RwLock<HashMap<UserId, CashBank>>,
}

impl InMemoryBalanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BalanceStore for InMemoryBalanceStore {
    async fn get_or_create(&self, owner: UserId, now: DateTime<Utc>) -> StoreResult<CashBank> {
        if let Some(existing) = read(&self.inner)?.get(&owner) {
            return Ok(existing.clone());
        }
        let mut map = write(&self.inner)?;
        Ok(map
            .entry(owner)
            .or_insert_with(|| CashBank::empty(owner, now))
            .clone())
    }

    async fn save(&self, record: &CashBank) -> StoreResult<()> {
        write(&self.inner)?.insert(record.user_id, record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use super::*;
    use chrono::Duration;
    use fintrack_auth::{Registration, User};
    use fintrack_ledger::{
        NewTransaction, PersonDraft, TransactionMetadata, TransactionStatus,
    };
    use rust_decimal::Decimal;

    fn person(owner: UserId, name: &str, section: &str) -> Person {
        let new = PersonDraft {
            name: Some(name.to_string()),
            section_type: Some(section.to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        Person::register(owner, new, Utc::now())
    }

    fn tx(owner: UserId, person: PersonId, amount: i64) -> Transaction {
        Transaction::record(
            owner,
            NewTransaction {
                person_id: person,
                date: None,
                amount: Decimal::from(amount),
                remarks: String::new(),
                status: TransactionStatus::Completed,
                kind: String::new(),
                metadata: TransactionMetadata::default(),
            },
            Utc::now(),
        )
    }

    fn user(email: &str, public_id: &str) -> User {
        User::register(
            Registration {
                email: email.to_string(),
                password: "secret1".to_string(),
                display_name: String::new(),
            },
            "hash".to_string(),
            public_id.to_string(),
            BTreeSet::new(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn users_are_unique_by_email_and_public_id() {
        let store = InMemoryUserStore::new();
        store.insert(user("a@x.io", "a_1")).await.unwrap();

        assert!(matches!(
            store.insert(user("a@x.io", "a_2")).await,
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            store.insert(user("b@x.io", "a_1")).await,
            Err(StoreError::Conflict(_))
        ));
        assert!(store.find_by_email("a@x.io").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn active_names_are_unique_per_section() {
        let store = InMemoryLedgerStore::new();
        let owner = UserId::new();

        store.insert_person(person(owner, "Alice", "lending")).await.unwrap();
        assert!(matches!(
            store.insert_person(person(owner, "Alice", "lending")).await,
            Err(StoreError::Conflict(_))
        ));
        store.insert_person(person(owner, "Alice", "borrowing")).await.unwrap();
        store.insert_person(person(UserId::new(), "Alice", "lending")).await.unwrap();
    }

    #[tokio::test]
    async fn deactivated_names_can_be_reused() {
        let store = InMemoryLedgerStore::new();
        let owner = UserId::new();
        let mut alice = person(owner, "Alice", "lending");
        store.insert_person(alice.clone()).await.unwrap();

        alice.deactivate(Utc::now());
        store.update_person(&alice).await.unwrap();

        store.insert_person(person(owner, "Alice", "lending")).await.unwrap();
        let listed = store.list_persons(owner, SectionType::Lending).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_ne!(listed[0].id, alice.id);
    }

    #[tokio::test]
    async fn rename_into_taken_name_conflicts() {
        let store = InMemoryLedgerStore::new();
        let owner = UserId::new();
        store.insert_person(person(owner, "Alice", "lending")).await.unwrap();
        let mut bob = person(owner, "Bob", "lending");
        store.insert_person(bob.clone()).await.unwrap();

        bob.name = "Alice".to_string();
        assert!(matches!(
            store.update_person(&bob).await,
            Err(StoreError::Conflict(_))
        ));
        let stored = store.get_person(owner, bob.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Bob");
    }

    #[tokio::test]
    async fn foreign_rows_are_invisible() {
        let store = InMemoryLedgerStore::new();
        let owner = UserId::new();
        let stranger = UserId::new();
        let alice = person(owner, "Alice", "lending");
        let t = tx(owner, alice.id, 10);
        store.insert_person(alice.clone()).await.unwrap();
        store.insert_transaction(t.clone()).await.unwrap();

        assert!(store.get_person(stranger, alice.id).await.unwrap().is_none());
        assert!(store.get_transaction(stranger, t.id).await.unwrap().is_none());
        assert!(!store.delete_transaction(stranger, t.id).await.unwrap());
        assert!(store
            .transactions_for_person(stranger, alice.id)
            .await
            .unwrap()
            .is_empty());
        assert!(store.delete_transaction(owner, t.id).await.unwrap());
        assert!(!store.delete_transaction(owner, t.id).await.unwrap());
    }

    #[tokio::test]
    async fn persons_are_listed_newest_first() {
        let store = InMemoryLedgerStore::new();
        let owner = UserId::new();
        let first = person(owner, "First", "earnings");
        let second = person(owner, "Second", "earnings");
        store.insert_person(first.clone()).await.unwrap();
        store.insert_person(second.clone()).await.unwrap();

        let listed = store.list_persons(owner, SectionType::Earnings).await.unwrap();
        assert_eq!(
            listed.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
    }

    #[tokio::test]
    async fn recent_transactions_sort_by_date_then_creation() {
        let store = InMemoryLedgerStore::new();
        let owner = UserId::new();
        let p = PersonId::new();
        let now = Utc::now();

        let mut old = tx(owner, p, 1);
        old.date = now - Duration::days(3);
        let mut a = tx(owner, p, 2);
        a.date = now;
        let mut b = tx(owner, p, 3);
        b.date = now;

        for t in [old.clone(), a.clone(), b.clone()] {
            store.insert_transaction(t).await.unwrap();
        }
        store.insert_transaction(tx(UserId::new(), p, 99)).await.unwrap();

        let recent = store.recent_transactions(owner, 10).await.unwrap();
        assert_eq!(
            recent.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![a.id, b.id, old.id]
        );
    }

    #[tokio::test]
    async fn concurrent_first_reads_create_one_balance_record() {
        let store = Arc::new(InMemoryBalanceStore::new());
        let owner = UserId::new();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.get_or_create(owner, Utc::now()).await })
            })
            .collect();

        let mut created = Vec::new();
        for h in handles {
            created.push(h.await.unwrap().unwrap().created_at);
        }
        created.dedup();
        assert_eq!(created.len(), 1);
        assert_eq!(store.inner.read().unwrap().len(), 1);
    }
}
