//! Validation run endpoints
//!
//! A run can be triggered on demand here; the scheduled cadence uses the
//! same code path. Concurrent triggers are rejected with 409 by the run
//! lease.

use crate::error::ApiResult;
use crate::services::ValidationRunSummary;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tubewatch_common::db::ValidationRun;

/// POST /validation/run
pub async fn trigger_validation_run(
    State(state): State<AppState>,
) -> ApiResult<Json<ValidationRunSummary>> {
    let summary = state.scheduler.run().await?;
    Ok(Json(summary))
}

/// GET /validation/runs - most recent runs, newest first
pub async fn list_validation_runs(State(state): State<AppState>) -> ApiResult<Json<Vec<ValidationRun>>> {
    let runs = sqlx::query_as::<_, ValidationRun>(
        "SELECT * FROM validation_runs ORDER BY started_at DESC LIMIT 50",
    )
    .fetch_all(&state.db)
    .await
    .map_err(tubewatch_common::Error::from)?;
    Ok(Json(runs))
}

/// Build validation routes
pub fn validation_routes() -> Router<AppState> {
    Router::new()
        .route("/validation/run", post(trigger_validation_run))
        .route("/validation/runs", get(list_validation_runs))
}
