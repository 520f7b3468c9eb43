//! Validation scheduling
//!
//! One run re-checks the stalest available candidates against the platform
//! status endpoint, bounded by the daily quota budget: selecting →
//! batching → applying → finalizing. Batches execute sequentially with a
//! pause between them; a transient batch failure is logged and the run
//! continues with the next batch. Exhausting the quota stops the run early
//! and keeps the progress already applied.
//!
//! This is the only path that demotes a primary. At most one run is active
//! system-wide; the run lease guards the shared quota budget and the
//! candidates being processed.

use crate::services::failover::FailoverCascade;
use crate::services::platform_client::{StatusProbe, UnavailableReason, VideoStatus};
use crate::services::quota::QuotaLedger;
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;
use tubewatch_common::{Error, Result, ValidationConfig};

/// Aggregate result of one validation run
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRunSummary {
    /// Candidates confirmed still available
    pub validated: i64,
    /// Candidates confirmed unavailable this run
    pub failed: i64,
    /// Failover cascades invoked for failed primaries
    pub failovers_triggered: i64,
    /// Quota units consumed, including cascade re-checks
    pub quota_used: i64,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SelectedCandidate {
    guid: String,
    video_id: String,
    group_guid: String,
}

pub struct ValidationScheduler {
    db: SqlitePool,
    probe: Arc<dyn StatusProbe>,
    config: ValidationConfig,
    quota: QuotaLedger,
    cascade: FailoverCascade,
    run_lease: Arc<Mutex<()>>,
}

impl ValidationScheduler {
    pub fn new(
        db: SqlitePool,
        probe: Arc<dyn StatusProbe>,
        config: ValidationConfig,
        run_lease: Arc<Mutex<()>>,
    ) -> Self {
        let quota = QuotaLedger::new(db.clone());
        let cascade = FailoverCascade::new(db.clone(), probe.clone(), config.failover_breadth);
        Self {
            db,
            probe,
            config,
            quota,
            cascade,
            run_lease,
        }
    }

    /// Execute one full validation pass.
    ///
    /// Returns `Error::Conflict` without doing any work when another run
    /// holds the lease.
    pub async fn run(&self) -> Result<ValidationRunSummary> {
        let _lease = self
            .run_lease
            .try_lock()
            .map_err(|_| Error::Conflict("a validation run is already active".to_string()))?;

        let started_at = Utc::now();
        let timer = Instant::now();
        let today = started_at.date_naive();

        // selecting
        let selection = self.select_due_candidates().await?;
        tracing::info!(selected = selection.len(), "Validation run starting");

        let mut validated = 0i64;
        let mut failed = 0i64;
        let mut failovers_triggered = 0i64;
        let mut quota_used = 0i64;

        // batching
        let cost_per_call = self.config.quota_cost_per_call;
        let mut first_batch = true;
        for batch in selection.chunks(self.config.batch_size) {
            let remaining = self
                .quota
                .remaining(self.config.daily_quota_budget, today)
                .await?;
            if remaining < cost_per_call {
                tracing::info!(
                    deferred = selection.len() as i64 - (validated + failed),
                    "Quota budget exhausted, stopping run early"
                );
                break;
            }

            if !first_batch && self.config.inter_batch_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.inter_batch_delay_ms)).await;
            }
            first_batch = false;

            let ids: Vec<String> = batch.iter().map(|c| c.video_id.clone()).collect();
            let results = self.probe.check_batch(&ids).await;

            // An executed call costs the full batch price even when partly
            // filled, transport outcome notwithstanding
            self.quota.record(cost_per_call, today).await?;
            quota_used += cost_per_call;

            let results = match results {
                Ok(results) => results,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        transient = e.is_transient(),
                        batch_size = batch.len(),
                        "Batch status check failed, continuing with next batch"
                    );
                    continue;
                }
            };

            // applying
            for candidate in batch {
                let status = results
                    .get(&candidate.video_id)
                    .copied()
                    .unwrap_or(VideoStatus::Unavailable(UnavailableReason::NotFound));

                match status {
                    VideoStatus::Available => {
                        self.mark_validated(candidate).await?;
                        validated += 1;
                    }
                    VideoStatus::Unavailable(reason) => {
                        let was_primary = self.mark_failed(candidate, reason).await?;
                        failed += 1;

                        if was_primary {
                            let outcome = self
                                .cascade
                                .failover(&candidate.group_guid, &candidate.guid)
                                .await?;
                            failovers_triggered += 1;
                            let cascade_units = outcome.recheck_calls * cost_per_call;
                            self.quota.record(cascade_units, today).await?;
                            quota_used += cascade_units;
                        }
                    }
                }
            }
        }

        // finalizing
        let summary = ValidationRunSummary {
            validated,
            failed,
            failovers_triggered,
            quota_used,
            duration_seconds: timer.elapsed().as_secs_f64(),
        };
        self.record_run(started_at, &summary).await?;

        tracing::info!(
            validated = summary.validated,
            failed = summary.failed,
            failovers = summary.failovers_triggered,
            quota_used = summary.quota_used,
            "Validation run complete"
        );

        Ok(summary)
    }

    /// Available candidates due for a re-check, stalest first (never-checked
    /// candidates before everything else), bounded by the configured maximum
    /// and by what the remaining quota can cover.
    async fn select_due_candidates(&self) -> Result<Vec<SelectedCandidate>> {
        let today = Utc::now().date_naive();
        let remaining = self
            .quota
            .remaining(self.config.daily_quota_budget, today)
            .await?;
        let calls_affordable = remaining / self.config.quota_cost_per_call;
        let quota_capacity = calls_affordable.saturating_mul(self.config.batch_size as i64);
        let limit = self.config.max_daily_checks.min(quota_capacity);
        if limit <= 0 {
            return Ok(Vec::new());
        }

        let selection = sqlx::query_as::<_, SelectedCandidate>(
            "SELECT guid, video_id, group_guid FROM candidates \
             WHERE available = 1 \
             ORDER BY last_checked_at ASC NULLS FIRST, created_at ASC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(selection)
    }

    /// Availability confirmed: only the check timestamp advances. Quality
    /// is not touched here; availability and quality are orthogonal.
    async fn mark_validated(&self, candidate: &SelectedCandidate) -> Result<()> {
        let now = Utc::now();
        sqlx::query("UPDATE candidates SET last_checked_at = ?, updated_at = ? WHERE guid = ?")
            .bind(now)
            .bind(now)
            .bind(&candidate.guid)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Confirmed unavailable: terminal for this candidate. Returns the
    /// row's current primary flag rather than the selection-time snapshot,
    /// since a cascade earlier in the run may have promoted this candidate.
    /// The flag itself is left for the failover cascade to clear atomically.
    async fn mark_failed(&self, candidate: &SelectedCandidate, reason: UnavailableReason) -> Result<bool> {
        let now = Utc::now();
        let was_primary: bool = sqlx::query_scalar(
            "UPDATE candidates SET available = 0, last_checked_at = ?, updated_at = ? \
             WHERE guid = ? RETURNING is_primary",
        )
        .bind(now)
        .bind(now)
        .bind(&candidate.guid)
        .fetch_one(&self.db)
        .await?;

        tracing::warn!(
            candidate_guid = %candidate.guid,
            video_id = %candidate.video_id,
            reason = reason.as_str(),
            was_primary = was_primary,
            "Candidate confirmed unavailable"
        );
        Ok(was_primary)
    }

    async fn record_run(&self, started_at: chrono::DateTime<Utc>, summary: &ValidationRunSummary) -> Result<()> {
        sqlx::query(
            "INSERT INTO validation_runs \
             (guid, started_at, duration_seconds, candidates_checked, candidates_failed, \
              failovers_triggered, quota_units_used) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(started_at)
        .bind(summary.duration_seconds)
        .bind(summary.validated + summary.failed)
        .bind(summary.failed)
        .bind(summary.failovers_triggered)
        .bind(summary.quota_used)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
