//! tubewatch-validator - Duplicate Grouping & Validation Service
//!
//! Ingests candidate videos from the discovery pipeline, groups duplicates
//! into canonical groups, ranks versions by quality, and re-validates
//! availability on a daily cadence, failing over to the best surviving
//! backup when a primary disappears.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use tubewatch_common::ValidationConfig;
use tubewatch_validator::services::{PlatformClient, StatusProbe, ValidationScheduler};
use tubewatch_validator::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting tubewatch-validator");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Optional first argument: explicit config file path
    let config_arg: Option<PathBuf> = std::env::args().nth(1).map(PathBuf::from);
    let mut config = ValidationConfig::load(config_arg.as_deref())?;

    // Open or create database
    let db_path = Path::new(&config.database_path).to_path_buf();
    info!("Database: {}", db_path.display());
    let db = tubewatch_common::db::init_database(&db_path).await?;
    info!("Database connection established");

    // Operator overrides from the settings table
    config.apply_settings(&db).await?;

    // Platform status client
    let api_key = config
        .platform_api_key
        .clone()
        .or_else(|| std::env::var("TUBEWATCH_API_KEY").ok())
        .unwrap_or_else(|| {
            warn!("No platform API key configured; status checks will be rejected upstream");
            String::new()
        });
    let probe: Arc<dyn StatusProbe> = match &config.platform_base_url {
        Some(base_url) => Arc::new(PlatformClient::with_base_url(api_key, base_url.clone())?),
        None => Arc::new(PlatformClient::new(api_key)?),
    };

    let state = AppState::new(db, config.clone(), probe);

    // Recurring validation cadence, independent of ingestion
    spawn_validation_cadence(state.scheduler.clone(), config.run_interval_secs);

    // Start server
    let app = tubewatch_validator::build_router(state);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", config.port)).await?;
    info!("Listening on http://127.0.0.1:{}", config.port);
    info!("Health check: http://127.0.0.1:{}/health", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Trigger one validation run per interval. A run already in flight (e.g.
/// operator-triggered) makes the tick a no-op rather than a second run.
fn spawn_validation_cadence(scheduler: Arc<ValidationScheduler>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick fires immediately; skip it so startup stays quiet
        interval.tick().await;

        loop {
            interval.tick().await;
            match scheduler.run().await {
                Ok(summary) => info!(
                    validated = summary.validated,
                    failed = summary.failed,
                    failovers = summary.failovers_triggered,
                    quota_used = summary.quota_used,
                    "Scheduled validation run finished"
                ),
                Err(tubewatch_common::Error::Conflict(_)) => {
                    tracing::debug!("Validation run already active, skipping scheduled tick")
                }
                Err(e) => tracing::error!(error = %e, "Scheduled validation run failed"),
            }
        }
    });
}
