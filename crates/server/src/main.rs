//! tokengate HTTP server.
//!
//! Configured from `TOKENGATE_*` environment variables; see
//! [`ServerConfig::from_env`].

use anyhow::Context;
use tokengate_authn::RevocationSweeper;
use tokengate_server::{AppState, ServerConfig, router};
use tokengate_storage::MemoryBackend;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tokengate=debug")),
        )
        .init();

    let config = ServerConfig::from_env().context("failed to load configuration")?;
    let prefix = config.normalized_prefix()?.to_owned();

    let state = AppState::new(&config.auth, MemoryBackend::new());
    let sweeper =
        config.auth.sweep_interval().map(|every| RevocationSweeper::spawn(state.revocations(), every));

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %listener.local_addr()?, prefix = %prefix, "tokengate listening");

    axum::serve(listener, router(state, &prefix))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(sweeper) = sweeper {
        sweeper.shutdown().await;
    }
    tracing::info!("tokengate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
