use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use fintrack_core::UserId;
use fintrack_ledger::{BalanceUpdate, CashBank};

use super::ServiceResult;
use crate::store::BalanceStore;

/// The single cash/bank record each user owns.
#[derive(Clone)]
pub struct BalanceService {
    store: Arc<dyn BalanceStore>,
}

impl BalanceService {
    pub fn new(store: Arc<dyn BalanceStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, owner: UserId) -> ServiceResult<CashBank> {
        Ok(self.store.get_or_create(owner, Utc::now()).await?)
    }

    /// Direct set of cash and/or bank. Negative values are rejected before
    /// anything is read or written.
    #[instrument(skip(self), fields(user_id = %owner))]
    pub async fn set(&self, owner: UserId, update: BalanceUpdate) -> ServiceResult<CashBank> {
        update.validate()?;

        let now = Utc::now();
        let mut record = self.store.get_or_create(owner, now).await?;
        record.apply(update, now)?;
        self.store.save(&record).await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fintrack_core::DomainError;
    use fintrack_ledger::BalanceSnapshot;
    use rust_decimal::Decimal;

    use crate::services::ServiceError;
    use crate::store::InMemoryBalanceStore;

    fn service() -> BalanceService {
        BalanceService::new(Arc::new(InMemoryBalanceStore::new()))
    }

    #[tokio::test]
    async fn first_reads_are_zero_and_stable() {
        let svc = service();
        let owner = UserId::new();

        let first = svc.get(owner).await.unwrap();
        let second = svc.get(owner).await.unwrap();
        assert_eq!(first.snapshot(), BalanceSnapshot::default());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn set_then_get() {
        let svc = service();
        let owner = UserId::new();

        svc.set(
            owner,
            BalanceUpdate {
                cash: Some(Decimal::from(200)),
                bank: Some(Decimal::from(300)),
            },
        )
        .await
        .unwrap();

        let snapshot = svc.get(owner).await.unwrap().snapshot();
        assert_eq!(snapshot.cash, Decimal::from(200));
        assert_eq!(snapshot.bank, Decimal::from(300));
        assert_eq!(snapshot.total, Decimal::from(500));
    }

    #[tokio::test]
    async fn omitted_fields_are_kept_and_history_grows() {
        let svc = service();
        let owner = UserId::new();
        svc.set(
            owner,
            BalanceUpdate {
                cash: Some(Decimal::from(10)),
                bank: Some(Decimal::from(20)),
            },
        )
        .await
        .unwrap();

        let record = svc
            .set(
                owner,
                BalanceUpdate {
                    cash: None,
                    bank: Some(Decimal::from(25)),
                },
            )
            .await
            .unwrap();

        assert_eq!(record.cash, Decimal::from(10));
        assert_eq!(record.history.len(), 3);
        assert_eq!(record.history[2].change, Decimal::from(5));
    }

    #[tokio::test]
    async fn negative_values_are_rejected() {
        let svc = service();
        let err = svc
            .set(
                UserId::new(),
                BalanceUpdate {
                    cash: Some(Decimal::from(-1)),
                    bank: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }
}
