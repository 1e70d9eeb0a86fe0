use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use devlog_server::{AppState, Config};

/// Activity event ingestion and reporting daemon.
#[derive(Debug, Parser)]
#[command(name = "devlogd", version, about)]
struct Cli {
    /// Path to a config file (overrides the default location).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    let mut store = devlog_db::EventStore::open(&config.database_path)
        .context("failed to open database")?;

    // Legacy rows must be rewritten before any stats query runs.
    let migrated = store
        .migrate_legacy_events()
        .context("failed to migrate legacy events")?;
    if !migrated {
        tracing::debug!("no legacy events to migrate");
    }

    let state = AppState::new(store, config.projects_path, config.day_boundary);
    tracing::info!(addr = %config.listen_addr, "listening");
    devlog_server::serve(state, config.listen_addr)
        .await
        .context("server failed")?;

    Ok(())
}
