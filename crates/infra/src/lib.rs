//! Infrastructure layer: configuration, storage backends, and the services
//! that enforce ownership and aggregate ledger data on top of them.

pub mod config;
pub mod services;
pub mod store;

pub use config::{AppConfig, ConfigError, Environment};
pub use services::{ServiceError, ServiceResult, Services};
pub use store::{StoreConfig, StoreError, StoreHandle};
