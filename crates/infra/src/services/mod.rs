//! Application services: the operations the HTTP layer exposes.
//!
//! Each service owns `Arc`s to the stores it reads and is cheap to clone.
//! Inputs arrive as unvalidated drafts; validation, ownership scoping and
//! entitlement checks all happen here.

use std::sync::Arc;

use thiserror::Error;

use fintrack_auth::{EntitlementPolicy, Hs256Jwt};
use fintrack_core::DomainError;

use crate::store::{StoreError, StoreHandle};

pub mod balances;
pub mod dashboard;
pub mod identity;
pub mod ledger;

pub use balances::BalanceService;
pub use dashboard::DashboardService;
pub use identity::{IdentityService, Session};
pub use ledger::{LedgerService, PersonDetail, PersonWithStats};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Failures outside the domain and the stores (blocking pool, token signing).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// All services, wired against one store handle.
#[derive(Clone)]
pub struct Services {
    pub identity: IdentityService,
    pub ledger: LedgerService,
    pub balances: BalanceService,
    pub dashboard: DashboardService,
}

impl Services {
    pub fn new(stores: &StoreHandle, jwt: Arc<Hs256Jwt>, policy: EntitlementPolicy) -> Self {
        Self {
            identity: IdentityService::new(stores.users.clone(), jwt, policy),
            ledger: LedgerService::new(stores.ledger.clone()),
            balances: BalanceService::new(stores.balances.clone()),
            dashboard: DashboardService::new(stores.ledger.clone(), stores.balances.clone()),
        }
    }
}
