//! Slurm web portal: login, submit, list and cancel jobs.

use portal_api::config::PortalConfig;
use portal_api::server::{self, AppState};
use portal_api::session::SessionStore;
use portal_core::JobPortal;
use portal_registry::InMemoryJobRegistry;
use portal_slurm::SlurmCli;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PortalConfig::from_env()?;
    let auth = config.authenticator()?;
    let scheduler = SlurmCli::new(config.slurm.clone());
    tracing::info!(commands = ?scheduler.commands(), auth = ?config.auth, "scheduler and auth configured");

    let portal = JobPortal::new(
        Arc::new(scheduler),
        Arc::new(InMemoryJobRegistry::new()),
        config.portal.clone(),
    );
    let state = Arc::new(AppState {
        portal,
        auth,
        sessions: SessionStore::new(config.session_idle).with_max_sessions(config.max_sessions),
    });

    let app = server::router(state);
    tracing::info!("Slurm portal listening on {}", config.listen);
    axum::serve(
        tokio::net::TcpListener::bind(config.listen).await?,
        app.into_make_service(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
