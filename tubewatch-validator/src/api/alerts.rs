//! Admin alert endpoints
//!
//! Alerts are persisted by the failover cascade; delivery to an external
//! notification surface is out of scope. Operators list open alerts here
//! and mark them resolved once the underlying group is fixed.

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tubewatch_common::db::AdminAlert;

#[derive(Debug, Deserialize)]
pub struct AlertFilter {
    /// Include alerts an operator already resolved
    #[serde(default)]
    pub include_resolved: bool,
}

/// GET /alerts - open alerts, newest first
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(filter): Query<AlertFilter>,
) -> ApiResult<Json<Vec<AdminAlert>>> {
    let query = if filter.include_resolved {
        "SELECT * FROM admin_alerts ORDER BY created_at DESC LIMIT 100"
    } else {
        "SELECT * FROM admin_alerts WHERE resolved = 0 ORDER BY created_at DESC LIMIT 100"
    };

    let alerts = sqlx::query_as::<_, AdminAlert>(query)
        .fetch_all(&state.db)
        .await
        .map_err(tubewatch_common::Error::from)?;
    Ok(Json(alerts))
}

/// POST /alerts/:guid/resolve
pub async fn resolve_alert(
    State(state): State<AppState>,
    Path(guid): Path<String>,
) -> ApiResult<Json<AdminAlert>> {
    let updated = sqlx::query("UPDATE admin_alerts SET resolved = 1 WHERE guid = ?")
        .bind(&guid)
        .execute(&state.db)
        .await
        .map_err(tubewatch_common::Error::from)?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("alert {} not found", guid)));
    }

    tracing::info!(alert_guid = %guid, at = %Utc::now(), "Alert resolved by operator");

    let alert = sqlx::query_as::<_, AdminAlert>("SELECT * FROM admin_alerts WHERE guid = ?")
        .bind(&guid)
        .fetch_one(&state.db)
        .await
        .map_err(tubewatch_common::Error::from)?;
    Ok(Json(alert))
}

/// Build alert routes
pub fn alert_routes() -> Router<AppState> {
    Router::new()
        .route("/alerts", get(list_alerts))
        .route("/alerts/:guid/resolve", post(resolve_alert))
}
