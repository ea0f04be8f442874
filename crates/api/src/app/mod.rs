//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: the shared state handlers reach through `Extension`
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request extraction and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, middleware::from_fn, middleware::from_fn_with_state};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppState;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Everything is mounted under `/api`; unmatched paths fall through to a
/// JSON 404.
pub fn build_app(state: AppState) -> Router {
    let environment = state.environment;
    let auth_state = middleware::AuthState {
        identity: state.services.identity.clone(),
    };

    let protected = routes::router().route_layer(from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));
    let api = routes::public_router().merge(protected);

    Router::new()
        .nest("/api", api)
        .fallback(routes::system::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(middleware::trace_requests))
                .layer(from_fn_with_state(environment, errors::expose_internal_detail))
                .layer(Extension(Arc::new(state))),
        )
}
