//! Candidate ingestion endpoint
//!
//! Called by the ingestion pipeline with a discovered video and its
//! observable signals; drives group resolution, scoring and primary
//! arbitration.

use crate::error::{ApiError, ApiResult};
use crate::services::{IngestDisposition, NewCandidate};
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub video_id: String,
    pub title: String,
    pub catalog_id: Option<String>,
    pub release_year: Option<i64>,
    pub view_count: Option<i64>,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub embeddable: bool,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub candidate_guid: String,
    pub group_guid: String,
    pub match_type: String,
    pub confidence: f64,
    pub quality_score: i64,
    pub is_primary: bool,
}

/// POST /candidates
pub async fn ingest_candidate(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> ApiResult<Json<IngestResponse>> {
    if request.video_id.trim().is_empty() {
        return Err(ApiError::BadRequest("video_id must not be empty".to_string()));
    }
    if request.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }

    let result = state
        .ingestor
        .ingest(NewCandidate {
            video_id: request.video_id,
            title: request.title,
            catalog_id: request.catalog_id,
            release_year: request.release_year,
            view_count: request.view_count,
            published_at: request.published_at,
            embeddable: request.embeddable,
        })
        .await?;

    let match_type = match result.disposition {
        IngestDisposition::Created(match_type) => match_type.as_str(),
        IngestDisposition::Refreshed => "refresh",
    };

    Ok(Json(IngestResponse {
        candidate_guid: result.candidate_guid,
        group_guid: result.group_guid,
        match_type: match_type.to_string(),
        confidence: result.confidence,
        quality_score: result.quality_score,
        is_primary: result.is_primary,
    }))
}

/// Build candidate routes
pub fn candidate_routes() -> Router<AppState> {
    Router::new().route("/candidates", post(ingest_candidate))
}
