//! Explicitly owned store handle: opened at startup, closed at shutdown.

use std::sync::Arc;

use tracing::info;

use super::{
    BalanceStore, InMemoryBalanceStore, InMemoryLedgerStore, InMemoryUserStore, LedgerStore,
    PostgresStore, StoreResult, UserStore,
};

/// Which backend to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    InMemory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Clone)]
enum Backend {
    InMemory,
    Postgres(PostgresStore),
}

/// The set of stores every service is built from.
///
/// Cloning is cheap; all clones share the same underlying stores.
#[derive(Clone)]
pub struct StoreHandle {
    pub users: Arc<dyn UserStore>,
    pub ledger: Arc<dyn LedgerStore>,
    pub balances: Arc<dyn BalanceStore>,
    backend: Backend,
}

impl StoreHandle {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserStore::new()),
            ledger: Arc::new(InMemoryLedgerStore::new()),
            balances: Arc::new(InMemoryBalanceStore::new()),
            backend: Backend::InMemory,
        }
    }

    pub fn postgres(store: PostgresStore) -> Self {
        let shared = Arc::new(store.clone());
        Self {
            users: shared.clone(),
            ledger: shared.clone(),
            balances: shared,
            backend: Backend::Postgres(store),
        }
    }

    pub async fn open(config: &StoreConfig) -> StoreResult<Self> {
        match config {
            StoreConfig::InMemory => {
                info!(backend = "in_memory", "opening stores");
                Ok(Self::in_memory())
            }
            StoreConfig::Postgres {
                database_url,
                max_connections,
            } => {
                info!(backend = "postgres", max_connections, "opening stores");
                let store = PostgresStore::connect(database_url, *max_connections).await?;
                Ok(Self::postgres(store))
            }
        }
    }

    /// Whether the backend is reachable. In-memory stores always are.
    pub async fn ping(&self) -> bool {
        match &self.backend {
            Backend::InMemory => true,
            Backend::Postgres(store) => store.ping().await,
        }
    }

    pub async fn close(&self) {
        if let Backend::Postgres(store) = &self.backend {
            store.close().await;
        }
        info!("stores closed");
    }
}
