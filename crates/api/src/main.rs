use std::net::SocketAddr;

use anyhow::Context;
use tracing::{error, info, warn};

use fintrack_api::app::{AppState, build_app};
use fintrack_infra::{AppConfig, StoreHandle};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fintrack_observability::init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return Err(e.into());
        }
    };

    let stores = StoreHandle::open(&config.store)
        .await
        .context("failed to open stores")?;

    let app = build_app(AppState::new(&config, stores.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        %addr,
        environment = config.environment.as_str(),
        "listening"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    stores.close().await;
    info!("shutdown complete");

    served.context("server error")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
