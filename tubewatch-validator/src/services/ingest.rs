//! Candidate ingestion
//!
//! Entry point for the ingestion pipeline: resolves the candidate's group,
//! scores its observable signals and arbitrates the primary flag, all
//! applied in one transaction per group.
//!
//! Re-ingesting a known video id refreshes the observable signals and
//! rescores the candidate; identity fields (video id, title, catalog id,
//! release year) stay immutable after creation.

use crate::services::group_resolver::{CandidateIdentity, GroupResolver, MatchType};
use crate::services::primary_arbiter::{self, PrimaryArbiter};
use crate::services::quality_scorer::{self, ObservableSignals};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;
use tubewatch_common::Result;

/// One candidate as handed over by the ingestion pipeline
#[derive(Debug, Clone)]
pub struct NewCandidate {
    pub video_id: String,
    pub title: String,
    pub catalog_id: Option<String>,
    pub release_year: Option<i64>,
    pub view_count: Option<i64>,
    pub published_at: Option<DateTime<Utc>>,
    pub embeddable: bool,
}

/// How the ingested candidate was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestDisposition {
    /// A new candidate record was created
    Created(MatchType),
    /// The video id was already known; signals refreshed and rescored
    Refreshed,
}

/// Outcome of one ingestion
#[derive(Debug, Clone)]
pub struct IngestResult {
    pub candidate_guid: String,
    pub group_guid: String,
    pub disposition: IngestDisposition,
    pub confidence: f64,
    pub quality_score: i64,
    pub is_primary: bool,
}

pub struct CandidateIngestor {
    db: SqlitePool,
    resolver: GroupResolver,
}

impl CandidateIngestor {
    pub fn new(db: SqlitePool, resolver: GroupResolver) -> Self {
        Self { db, resolver }
    }

    pub async fn ingest(&self, candidate: NewCandidate) -> Result<IngestResult> {
        let existing: Option<(String, String, bool, bool)> = sqlx::query_as(
            "SELECT guid, group_guid, is_primary, available FROM candidates WHERE video_id = ?",
        )
        .bind(&candidate.video_id)
        .fetch_optional(&self.db)
        .await?;

        match existing {
            Some((guid, group_guid, is_primary, available)) => {
                self.refresh(candidate, guid, group_guid, is_primary, available)
                    .await
            }
            None => self.create(candidate).await,
        }
    }

    /// First-time ingestion: resolve group, score, insert, arbitrate.
    async fn create(&self, candidate: NewCandidate) -> Result<IngestResult> {
        let identity = CandidateIdentity {
            title: candidate.title.clone(),
            catalog_id: candidate.catalog_id.clone(),
            release_year: candidate.release_year,
        };
        let group_match = self.resolver.resolve(&identity).await?;

        let now = Utc::now();
        let signals = signals_of(&candidate);
        let quality_score = quality_scorer::score(&signals, now);
        let guid = Uuid::new_v4().to_string();

        let mut tx = self.db.begin().await?;

        sqlx::query(
            "INSERT INTO candidates \
             (guid, video_id, title, catalog_id, release_year, view_count, published_at, \
              embeddable, quality_score, available, last_checked_at, group_guid, is_primary, \
              created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, NULL, ?, 0, ?, ?)",
        )
        .bind(&guid)
        .bind(&candidate.video_id)
        .bind(&candidate.title)
        .bind(&candidate.catalog_id)
        .bind(candidate.release_year)
        .bind(candidate.view_count)
        .bind(candidate.published_at)
        .bind(candidate.embeddable)
        .bind(quality_score)
        .bind(&group_match.group_guid)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let current_primary =
            PrimaryArbiter::current_primary_tx(&mut tx, &group_match.group_guid).await?;
        let decision = primary_arbiter::decide(current_primary.as_ref(), quality_score);
        PrimaryArbiter::apply_tx(&mut tx, &guid, &decision, now).await?;

        tx.commit().await?;

        tracing::info!(
            video_id = %candidate.video_id,
            candidate_guid = %guid,
            group_guid = %group_match.group_guid,
            match_type = group_match.match_type.as_str(),
            quality_score = quality_score,
            is_primary = decision.is_primary,
            "Ingested new candidate"
        );

        Ok(IngestResult {
            candidate_guid: guid,
            group_guid: group_match.group_guid,
            disposition: IngestDisposition::Created(group_match.match_type),
            confidence: group_match.confidence,
            quality_score,
            is_primary: decision.is_primary,
        })
    }

    /// Known video id: refresh signals, rescore, re-arbitrate.
    ///
    /// An unavailable candidate keeps its refreshed score but is never
    /// promoted; only the validation path can flip availability back.
    async fn refresh(
        &self,
        candidate: NewCandidate,
        guid: String,
        group_guid: String,
        was_primary: bool,
        available: bool,
    ) -> Result<IngestResult> {
        let now = Utc::now();
        let signals = signals_of(&candidate);
        let quality_score = quality_scorer::score(&signals, now);

        let mut tx = self.db.begin().await?;

        sqlx::query(
            "UPDATE candidates SET view_count = ?, published_at = ?, embeddable = ?, \
             quality_score = ?, updated_at = ? WHERE guid = ?",
        )
        .bind(candidate.view_count)
        .bind(candidate.published_at)
        .bind(candidate.embeddable)
        .bind(quality_score)
        .bind(now)
        .bind(&guid)
        .execute(&mut *tx)
        .await?;

        let mut is_primary = was_primary;
        if !was_primary && available {
            let current_primary = PrimaryArbiter::current_primary_tx(&mut tx, &group_guid).await?;
            let decision = primary_arbiter::decide(current_primary.as_ref(), quality_score);
            PrimaryArbiter::apply_tx(&mut tx, &guid, &decision, now).await?;
            is_primary = decision.is_primary;
        }

        tx.commit().await?;

        tracing::info!(
            video_id = %candidate.video_id,
            candidate_guid = %guid,
            quality_score = quality_score,
            is_primary = is_primary,
            "Refreshed existing candidate"
        );

        Ok(IngestResult {
            candidate_guid: guid,
            group_guid,
            disposition: IngestDisposition::Refreshed,
            confidence: 1.0,
            quality_score,
            is_primary,
        })
    }
}

fn signals_of(candidate: &NewCandidate) -> ObservableSignals {
    ObservableSignals {
        view_count: candidate.view_count,
        published_at: candidate.published_at,
        embeddable: candidate.embeddable,
        has_catalog_id: candidate.catalog_id.is_some(),
        has_release_year: candidate.release_year.is_some(),
    }
}
