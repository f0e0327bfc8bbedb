//! # pgsentinel service binary
//!
//! Loads configuration, wires facade -> cache -> health checker -> router,
//! and serves until interrupted. Only startup failures (config parse,
//! socket bind) terminate the process; query failures after that surface as
//! HTTP 500s.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use pgsentinel::config::load_config;
use pgsentinel::logging::init_logging;
use pgsentinel::replication::{CachedDataSource, PgReplicationDataSource, ReplicationDataSource};
use pgsentinel::web::{self, AppState};

#[derive(Parser)]
#[command(name = "pgsentinel")]
#[command(about = "PostgreSQL replication health sidecar")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to the YAML configuration file
    config: PathBuf,

    /// Override the configured listen address
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    let listen = cli.listen.unwrap_or_else(|| config.server.listen.clone());
    let cache_ttl = config.cache_ttl();

    let data_source: Arc<dyn ReplicationDataSource> = Arc::new(CachedDataSource::with_ttl(
        PgReplicationDataSource::new(config.clone()),
        cache_ttl,
    ));

    let router = web::create_router(AppState::new(Arc::clone(&data_source)));

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    info!(%listen, host = %config.database.host, "pgsentinel listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    data_source.close().await;
    info!("pgsentinel stopped");
    Ok(())
}

async fn shutdown_signal() {
    // Serve until interrupted; bind-time errors already aborted startup.
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
