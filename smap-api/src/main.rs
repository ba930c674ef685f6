//! smap-api - SMAP compliance tracking REST service
//!
//! Manages the Klausul → Pilar → Elemen → SubElemen → Pengukuran hierarchy,
//! semester-based execution tracking with an audit trail, and bulk JSON
//! import with hierarchy auto-creation.

use anyhow::Result;
use clap::Parser;
use smap_api::{build_router, AppState};
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::info;

/// SMAP compliance tracking REST service
#[derive(Debug, Parser)]
#[command(name = "smap-api", version)]
struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long)]
    host: Option<IpAddr>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Path to the SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting SMAP API (smap-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = smap_common::config::resolve(cli.host, cli.port, cli.database)?;
    info!("Database path: {}", config.database_path.display());

    let pool = smap_common::db::init_database(&config.database_path).await?;

    let state = AppState::new(pool);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((config.host, config.port)).await?;
    info!("smap-api listening on http://{}:{}", config.host, config.port);
    info!("Health check: http://{}:{}/health", config.host, config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
