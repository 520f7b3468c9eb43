//! tubewatch-validator library interface
//!
//! Exposes the application state, router and domain services for the
//! binary and for integration testing.

pub mod api;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use services::{CandidateIngestor, GroupResolver, StatusProbe, ValidationScheduler};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tubewatch_common::ValidationConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Service configuration
    pub config: ValidationConfig,
    /// Ingestion entry point: resolve, score, arbitrate
    pub ingestor: Arc<CandidateIngestor>,
    /// Validation run orchestrator; owns the single-run lease
    pub scheduler: Arc<ValidationScheduler>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: ValidationConfig, probe: Arc<dyn StatusProbe>) -> Self {
        let resolver = GroupResolver::new(
            db.clone(),
            config.similarity_threshold,
            config.year_tolerance,
        );
        let ingestor = Arc::new(CandidateIngestor::new(db.clone(), resolver));

        // Single coordination point for "one active run system-wide"
        let run_lease = Arc::new(Mutex::new(()));
        let scheduler = Arc::new(ValidationScheduler::new(
            db.clone(),
            probe,
            config.clone(),
            run_lease,
        ));

        Self {
            db,
            config,
            ingestor,
            scheduler,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::candidate_routes())
        .merge(api::validation_routes())
        .merge(api::alert_routes())
        .merge(api::health_routes())
        .with_state(state)
}
