//! Runs the HTTP API until interrupted.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tasktime_core::SystemClock;
use tasktime_db::Database;
use tracing::info;

use crate::auth::TokenKeys;
use crate::{AppState, Config, router};

pub fn run(db: Database, config: &Config, bind: Option<SocketAddr>) -> Result<()> {
    let secret = config.signing_secret()?;
    let tokens = TokenKeys::new(secret, config.token_lifetime_secs);
    let state = AppState::new(db, Arc::new(SystemClock), tokens);
    let app = router(state, &config.cors_origins);
    let addr = bind.unwrap_or(config.bind_address);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        info!(address = %addr, "server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")?;

        info!("server stopped");
        Ok::<_, anyhow::Error>(())
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
