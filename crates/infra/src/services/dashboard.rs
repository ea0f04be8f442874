//! Aggregation engine: per-section totals, net balance, recent activity.
//!
//! The five section reads run concurrently, as do the per-person
//! transaction reads inside each section. Any read failure fails the whole
//! request; no partial dashboard is ever returned.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use tracing::instrument;

use fintrack_core::{PersonId, UserId};
use fintrack_ledger::{
    DashboardStats, PersonSummary, RecentLimit, RecentTransaction, SectionTotals, SectionType,
};

use super::{ServiceError, ServiceResult};
use crate::store::{BalanceStore, LedgerStore};

#[derive(Clone)]
pub struct DashboardService {
    ledger: Arc<dyn LedgerStore>,
    balances: Arc<dyn BalanceStore>,
}

impl DashboardService {
    pub fn new(ledger: Arc<dyn LedgerStore>, balances: Arc<dyn BalanceStore>) -> Self {
        Self { ledger, balances }
    }

    #[instrument(skip(self), fields(user_id = %owner))]
    pub async fn stats(&self, owner: UserId) -> ServiceResult<DashboardStats> {
        let sections = try_join_all(
            SectionType::ALL
                .into_iter()
                .map(|section| self.section_totals(owner, section)),
        );
        let cash_bank = async {
            Ok::<_, ServiceError>(self.balances.get_or_create(owner, Utc::now()).await?)
        };

        let (sections, cash_bank) = tokio::try_join!(sections, cash_bank)?;
        let sections: HashMap<SectionType, SectionTotals> = sections.into_iter().collect();

        Ok(DashboardStats::assemble(&sections, cash_bank.snapshot()))
    }

    /// Sum of every active person's transactions in `section`.
    async fn section_totals(
        &self,
        owner: UserId,
        section: SectionType,
    ) -> ServiceResult<(SectionType, SectionTotals)> {
        let persons = self.ledger.list_persons(owner, section).await?;
        let per_person = try_join_all(persons.iter().map(|person| async move {
            let txs = self.ledger.transactions_for_person(owner, person.id).await?;
            Ok::<_, ServiceError>(SectionTotals::from_transactions(&txs))
        }))
        .await?;

        Ok((section, per_person.into_iter().sum()))
    }

    /// Latest transactions across all persons, each tagged with its person.
    #[instrument(skip(self), fields(user_id = %owner))]
    pub async fn recent(
        &self,
        owner: UserId,
        limit: RecentLimit,
    ) -> ServiceResult<Vec<RecentTransaction>> {
        let txs = self.ledger.recent_transactions(owner, limit.get()).await?;

        let ids: Vec<PersonId> = txs
            .iter()
            .map(|t| t.person_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let persons: HashMap<PersonId, PersonSummary> = self
            .ledger
            .persons_by_ids(owner, &ids)
            .await?
            .iter()
            .map(|p| (p.id, PersonSummary::from(p)))
            .collect();

        Ok(txs
            .into_iter()
            .map(|transaction| RecentTransaction {
                person: persons.get(&transaction.person_id).cloned(),
                transaction,
            })
            .collect())
    }
}
