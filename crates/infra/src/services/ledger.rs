use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, instrument};

use fintrack_auth::{Entitlement, User, require_entitlement};
use fintrack_core::{DomainError, PersonId, TransactionId, UserId};
use fintrack_ledger::{
    Person, PersonDraft, PersonPatch, PersonStats, SectionType, Transaction, TransactionDraft,
    TransactionPatch, duplicate_name, newest_first,
};

use super::{ServiceError, ServiceResult};
use crate::store::{LedgerStore, StoreError};

/// A person together with the totals of its transactions.
#[derive(Debug, Clone, Serialize)]
pub struct PersonWithStats {
    #[serde(flatten)]
    pub person: Person,
    pub stats: PersonStats,
}

/// A person, its totals, and its transactions newest first.
#[derive(Debug, Clone, Serialize)]
pub struct PersonDetail {
    #[serde(flatten)]
    pub person: Person,
    pub stats: PersonStats,
    pub transactions: Vec<Transaction>,
}

/// Person and transaction CRUD, scoped to the calling user.
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn list_persons(
        &self,
        user: &User,
        section: SectionType,
    ) -> ServiceResult<Vec<PersonWithStats>> {
        require_section_access(user, section)?;

        let persons = self.store.list_persons(user.id, section).await?;
        try_join_all(persons.into_iter().map(|person| async move {
            let txs = self.store.transactions_for_person(user.id, person.id).await?;
            Ok::<_, ServiceError>(PersonWithStats {
                stats: PersonStats::from_transactions(&txs),
                person,
            })
        }))
        .await
    }

    #[instrument(skip(self), fields(user_id = %owner))]
    pub async fn get_person(&self, owner: UserId, id: PersonId) -> ServiceResult<PersonDetail> {
        let person = self.owned_person(owner, id).await?;
        let txs = self.store.transactions_for_person(owner, id).await?;
        Ok(PersonDetail {
            stats: PersonStats::from_transactions(&txs),
            transactions: newest_first(txs),
            person,
        })
    }

    #[instrument(skip(self, user, draft), fields(user_id = %user.id))]
    pub async fn create_person(&self, user: &User, draft: PersonDraft) -> ServiceResult<Person> {
        let new = draft.validate()?;
        require_section_access(user, new.section_type)?;

        let person = Person::register(user.id, new, Utc::now());
        self.store
            .insert_person(person.clone())
            .await
            .map_err(|e| person_conflict(e, &person))?;

        debug!(person_id = %person.id, section = %person.section_type, "person created");
        Ok(person)
    }

    #[instrument(skip(self, patch), fields(user_id = %owner))]
    pub async fn update_person(
        &self,
        owner: UserId,
        id: PersonId,
        patch: PersonPatch,
    ) -> ServiceResult<Person> {
        let mut person = self.owned_person(owner, id).await?;
        let patch = patch.validate()?;
        let renamed = patch.renames(&person).is_some();

        person.apply(patch, Utc::now());
        self.store.update_person(&person).await.map_err(|e| {
            if renamed {
                person_conflict(e, &person)
            } else {
                e.into()
            }
        })?;
        Ok(person)
    }

    /// Soft delete. The person's transactions are left in place.
    #[instrument(skip(self), fields(user_id = %owner))]
    pub async fn delete_person(&self, owner: UserId, id: PersonId) -> ServiceResult<()> {
        let mut person = self.owned_person(owner, id).await?;
        person.deactivate(Utc::now());
        self.store.update_person(&person).await?;
        Ok(())
    }

    /// Transactions of an owned person (active or not), newest first.
    pub async fn transactions_for_person(
        &self,
        owner: UserId,
        person: PersonId,
    ) -> ServiceResult<Vec<Transaction>> {
        self.owned_person(owner, person).await?;
        let txs = self.store.transactions_for_person(owner, person).await?;
        Ok(newest_first(txs))
    }

    #[instrument(skip(self, draft), fields(user_id = %owner))]
    pub async fn create_transaction(
        &self,
        owner: UserId,
        draft: TransactionDraft,
    ) -> ServiceResult<Transaction> {
        let new = draft.validate()?;
        self.owned_person(owner, new.person_id).await?;

        let tx = Transaction::record(owner, new, Utc::now());
        self.store.insert_transaction(tx.clone()).await?;
        Ok(tx)
    }

    #[instrument(skip(self, patch), fields(user_id = %owner))]
    pub async fn update_transaction(
        &self,
        owner: UserId,
        id: TransactionId,
        patch: TransactionPatch,
    ) -> ServiceResult<Transaction> {
        let mut tx = self
            .store
            .get_transaction(owner, id)
            .await?
            .ok_or_else(|| DomainError::not_found("Transaction"))?;

        tx.apply(patch.validate()?, Utc::now());
        self.store.update_transaction(&tx).await?;
        Ok(tx)
    }

    #[instrument(skip(self), fields(user_id = %owner))]
    pub async fn delete_transaction(&self, owner: UserId, id: TransactionId) -> ServiceResult<()> {
        if self.store.delete_transaction(owner, id).await? {
            Ok(())
        } else {
            Err(DomainError::not_found("Transaction").into())
        }
    }

    async fn owned_person(&self, owner: UserId, id: PersonId) -> ServiceResult<Person> {
        self.store
            .get_person(owner, id)
            .await?
            .ok_or_else(|| DomainError::not_found("Person").into())
    }
}

fn require_section_access(user: &User, section: SectionType) -> ServiceResult<()> {
    if section.is_gated() {
        require_entitlement(user, Entitlement::InterestSection)?;
    }
    Ok(())
}

fn person_conflict(err: StoreError, person: &Person) -> ServiceError {
    match err {
        StoreError::Conflict(_) => duplicate_name(&person.name, person.section_type).into(),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use fintrack_auth::Registration;
    use fintrack_ledger::TransactionStatus;
    use rust_decimal::Decimal;

    use crate::store::InMemoryLedgerStore;

    fn service() -> LedgerService {
        LedgerService::new(Arc::new(InMemoryLedgerStore::new()))
    }

    fn user(entitlements: &[Entitlement]) -> User {
        User::register(
            Registration {
                email: "owner@example.com".to_string(),
                password: "secret1".to_string(),
                display_name: String::new(),
            },
            "hash".to_string(),
            "owner_00000000".to_string(),
            entitlements.iter().copied().collect::<BTreeSet<_>>(),
            Utc::now(),
        )
    }

    fn person_draft(name: &str, section: &str) -> PersonDraft {
        PersonDraft {
            name: Some(name.to_string()),
            section_type: Some(section.to_string()),
            ..Default::default()
        }
    }

    fn tx_draft(person: PersonId, amount: i64, status: &str) -> TransactionDraft {
        TransactionDraft {
            person_id: Some(person.to_string()),
            amount: Some(Decimal::from(amount)),
            status: Some(status.to_string()),
            ..Default::default()
        }
    }

    fn is_conflict(err: &ServiceError) -> bool {
        matches!(err, ServiceError::Domain(DomainError::Conflict(_)))
    }

    fn is_not_found(err: &ServiceError) -> bool {
        matches!(err, ServiceError::Domain(DomainError::NotFound(_)))
    }

    #[tokio::test]
    async fn duplicate_names_conflict_only_within_a_section() {
        let svc = service();
        let u = user(&[]);

        svc.create_person(&u, person_draft("Alice", "lending")).await.unwrap();
        let err = svc
            .create_person(&u, person_draft(" Alice ", "lending"))
            .await
            .unwrap_err();
        assert!(is_conflict(&err));
        assert!(err.to_string().contains("already exists in lending section"));

        svc.create_person(&u, person_draft("Alice", "borrowing")).await.unwrap();
    }

    #[tokio::test]
    async fn rename_conflicts_leave_the_record_untouched() {
        let svc = service();
        let u = user(&[]);
        svc.create_person(&u, person_draft("Alice", "lending")).await.unwrap();
        let bob = svc.create_person(&u, person_draft("Bob", "lending")).await.unwrap();

        let err = svc
            .update_person(
                u.id,
                bob.id,
                PersonPatch {
                    name: Some("Alice".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(is_conflict(&err));

        let stored = svc.get_person(u.id, bob.id).await.unwrap();
        assert_eq!(stored.person.name, "Bob");

        let same = svc
            .update_person(
                u.id,
                bob.id,
                PersonPatch {
                    name: Some("Bob".to_string()),
                    phone: Some("555".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(same.phone, "555");
    }

    #[tokio::test]
    async fn interest_section_requires_entitlement() {
        let svc = service();
        let plain = user(&[]);
        let entitled = user(&[Entitlement::InterestSection]);

        let err = svc
            .create_person(&plain, person_draft("Loan", "interest"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::AccessDenied(_))));
        assert!(svc.list_persons(&plain, SectionType::Interest).await.is_err());

        svc.create_person(&entitled, person_draft("Loan", "interest"))
            .await
            .unwrap();
        assert_eq!(
            svc.list_persons(&entitled, SectionType::Interest)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn listing_carries_per_person_stats() {
        let svc = service();
        let u = user(&[]);
        let p = svc.create_person(&u, person_draft("P1", "lending")).await.unwrap();
        svc.create_transaction(u.id, tx_draft(p.id, 100, "completed")).await.unwrap();
        svc.create_transaction(u.id, tx_draft(p.id, 50, "pending")).await.unwrap();

        let listed = svc.list_persons(&u, SectionType::Lending).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].stats.transaction_count, 2);
        assert_eq!(listed[0].stats.totals.total, Decimal::from(150));
        assert_eq!(listed[0].stats.totals.pending, Decimal::from(50));
    }

    #[tokio::test]
    async fn soft_deleted_person_keeps_its_transactions() {
        let svc = service();
        let u = user(&[]);
        let p = svc.create_person(&u, person_draft("P1", "expenses")).await.unwrap();
        svc.create_transaction(u.id, tx_draft(p.id, 10, "completed")).await.unwrap();

        svc.delete_person(u.id, p.id).await.unwrap();

        assert!(svc.list_persons(&u, SectionType::Expenses).await.unwrap().is_empty());
        let detail = svc.get_person(u.id, p.id).await.unwrap();
        assert!(!detail.person.is_active);
        assert_eq!(svc.transactions_for_person(u.id, p.id).await.unwrap().len(), 1);

        // The name is free again.
        svc.create_person(&u, person_draft("P1", "expenses")).await.unwrap();
    }

    #[tokio::test]
    async fn other_users_see_not_found() {
        let svc = service();
        let owner = user(&[]);
        let stranger = user(&[]);
        let p = svc.create_person(&owner, person_draft("P1", "lending")).await.unwrap();
        let t = svc
            .create_transaction(owner.id, tx_draft(p.id, 5, "pending"))
            .await
            .unwrap();

        assert!(is_not_found(&svc.get_person(stranger.id, p.id).await.unwrap_err()));
        assert!(is_not_found(
            &svc.update_person(stranger.id, p.id, PersonPatch::default())
                .await
                .unwrap_err()
        ));
        assert!(is_not_found(&svc.delete_person(stranger.id, p.id).await.unwrap_err()));
        assert!(is_not_found(
            &svc.transactions_for_person(stranger.id, p.id).await.unwrap_err()
        ));
        assert!(is_not_found(
            &svc.create_transaction(stranger.id, tx_draft(p.id, 1, "pending"))
                .await
                .unwrap_err()
        ));
        assert!(is_not_found(
            &svc.update_transaction(stranger.id, t.id, TransactionPatch::default())
                .await
                .unwrap_err()
        ));
        assert!(is_not_found(
            &svc.delete_transaction(stranger.id, t.id).await.unwrap_err()
        ));
    }

    #[tokio::test]
    async fn transaction_updates_merge_fields() {
        let svc = service();
        let u = user(&[]);
        let p = svc.create_person(&u, person_draft("P1", "lending")).await.unwrap();
        let t = svc
            .create_transaction(u.id, tx_draft(p.id, 100, "pending"))
            .await
            .unwrap();

        let updated = svc
            .update_transaction(
                u.id,
                t.id,
                TransactionPatch {
                    status: Some("completed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, TransactionStatus::Completed);
        assert_eq!(updated.amount, Decimal::from(100));

        svc.delete_transaction(u.id, t.id).await.unwrap();
        assert!(is_not_found(&svc.delete_transaction(u.id, t.id).await.unwrap_err()));
    }
}
