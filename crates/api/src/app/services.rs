//! Service wiring: everything handlers reach through `Extension<Arc<AppState>>`.

use std::sync::Arc;

use fintrack_auth::{EntitlementPolicy, Hs256Jwt};
use fintrack_infra::{AppConfig, Environment, Services, StoreHandle};

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub stores: StoreHandle,
    pub environment: Environment,
}

impl AppState {
    /// Build the services against an already-opened store handle.
    pub fn new(config: &AppConfig, stores: StoreHandle) -> Self {
        let jwt = Arc::new(Hs256Jwt::new(&config.jwt_secret, config.jwt_ttl));
        let policy = EntitlementPolicy::new(config.interest_section_emails.iter());
        Self {
            services: Services::new(&stores, jwt, policy),
            stores,
            environment: config.environment,
        }
    }
}
