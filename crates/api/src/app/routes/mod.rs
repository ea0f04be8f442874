use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod cash_bank;
pub mod dashboard;
pub mod persons;
pub mod system;
pub mod transactions;

/// Endpoints reachable without a bearer token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
}

/// Endpoints scoped to the authenticated user.
pub fn router() -> Router {
    Router::new()
        .route("/auth/profile", get(auth::profile).put(auth::update_profile))
        .route("/auth/interest-access", get(auth::interest_access))
        .nest("/persons", persons::router())
        .nest("/transactions", transactions::router())
        .nest("/cash-bank", cash_bank::router())
        .nest("/dashboard", dashboard::router())
}
