//! VIP Fundraiser API — entry point.
//!
//! Accepts investor sign-ups and contributions, stores them as documents,
//! and reports campaign progress against a fixed funding target over a
//! small Axum REST API.

mod api;
mod config;
mod db;
mod errors;
mod masking;
mod memory;
mod progress;
mod schema;
mod store;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use store::Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Connect and migrate; a missing or unreachable store degrades the
    // service instead of aborting startup.
    let storage = Storage::open(&config).await;

    let api_state = Arc::new(api::ApiState {
        storage: storage.clone(),
        target: config.target_amount,
        database_url_set: config.database_url.is_some(),
        database_name: config.database_name.clone(),
    });
    let app = api::router(api_state);

    let addr = format!("0.0.0.0:{}", config.port);
    info!(
        "API listening on http://{addr} (target {:.2})",
        config.target_amount
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    storage.close().await;
    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
