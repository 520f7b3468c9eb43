//! Failover cascade
//!
//! When a group's primary fails validation, walk the ranked backups
//! (quality score descending, then earliest ingestion, then guid) and
//! re-verify each with a single-item status check before trusting it, since
//! a backup's last-known flag may be stale. The first backup that verifies is
//! promoted atomically together with the failed primary's demotion and a
//! failover event. If every backup fails, the group is left with zero
//! primaries and one critical admin alert.

use crate::services::platform_client::StatusProbe;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;
use tubewatch_common::db::AlertSeverity;
use tubewatch_common::Result;

/// Result of one cascade
#[derive(Debug, Clone)]
pub struct FailoverOutcome {
    /// Guid of the promoted backup, or None when the cascade exhausted
    pub promoted: Option<String>,
    /// Single-item status calls issued; the caller charges these against
    /// the quota budget
    pub recheck_calls: i64,
}

pub struct FailoverCascade {
    db: SqlitePool,
    probe: Arc<dyn StatusProbe>,
    /// Maximum backups re-verified per cascade
    breadth: usize,
}

impl FailoverCascade {
    pub fn new(db: SqlitePool, probe: Arc<dyn StatusProbe>, breadth: usize) -> Self {
        Self { db, probe, breadth }
    }

    /// Run the cascade for a group whose primary just failed validation.
    ///
    /// The caller has already marked the failed primary unavailable; this
    /// clears its primary flag as part of whichever terminal transaction
    /// the cascade reaches.
    pub async fn failover(&self, group_guid: &str, failed_primary_guid: &str) -> Result<FailoverOutcome> {
        let backups: Vec<(String, String)> = sqlx::query_as(
            "SELECT guid, video_id FROM candidates \
             WHERE group_guid = ? AND guid != ? AND available = 1 AND is_primary = 0 \
             ORDER BY quality_score DESC, created_at ASC, guid ASC LIMIT ?",
        )
        .bind(group_guid)
        .bind(failed_primary_guid)
        .bind(self.breadth as i64)
        .fetch_all(&self.db)
        .await?;

        tracing::info!(
            group_guid = %group_guid,
            failed_primary = %failed_primary_guid,
            backups = backups.len(),
            "Starting failover cascade"
        );

        let mut recheck_calls = 0i64;

        for (backup_guid, video_id) in &backups {
            let ids = vec![video_id.clone()];
            match self.probe.check_batch(&ids).await {
                Ok(results) => {
                    recheck_calls += 1;
                    let verified = results
                        .get(video_id)
                        .map(|s| s.is_available())
                        .unwrap_or(false);

                    if verified {
                        self.promote(group_guid, failed_primary_guid, backup_guid).await?;
                        return Ok(FailoverOutcome {
                            promoted: Some(backup_guid.clone()),
                            recheck_calls,
                        });
                    }

                    // Confirmed rotten backup: record it so the next
                    // cascade does not try it again
                    sqlx::query(
                        "UPDATE candidates SET available = 0, last_checked_at = ?, updated_at = ? \
                         WHERE guid = ?",
                    )
                    .bind(Utc::now())
                    .bind(Utc::now())
                    .bind(backup_guid)
                    .execute(&self.db)
                    .await?;

                    tracing::warn!(
                        backup_guid = %backup_guid,
                        video_id = %video_id,
                        "Backup failed re-verification, trying next"
                    );
                }
                Err(e) => {
                    recheck_calls += 1;
                    // Couldn't tell; do not mark unavailable, do not promote
                    tracing::warn!(
                        backup_guid = %backup_guid,
                        error = %e,
                        "Backup re-verification errored, trying next"
                    );
                }
            }
        }

        let alert_guid = self.raise_exhausted_alert(group_guid, failed_primary_guid).await?;
        tracing::error!(
            group_guid = %group_guid,
            alert_guid = %alert_guid,
            "Failover cascade exhausted, group left without a primary"
        );

        Ok(FailoverOutcome {
            promoted: None,
            recheck_calls,
        })
    }

    /// Promote a verified backup: flag swap plus failover event in one
    /// transaction.
    async fn promote(
        &self,
        group_guid: &str,
        failed_primary_guid: &str,
        backup_guid: &str,
    ) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        sqlx::query("UPDATE candidates SET is_primary = 0, updated_at = ? WHERE guid = ?")
            .bind(now)
            .bind(failed_primary_guid)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE candidates SET is_primary = 1, last_checked_at = ?, updated_at = ? WHERE guid = ?",
        )
        .bind(now)
        .bind(now)
        .bind(backup_guid)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO failover_events \
             (guid, group_guid, old_primary_guid, new_primary_guid, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(group_guid)
        .bind(failed_primary_guid)
        .bind(backup_guid)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            group_guid = %group_guid,
            old_primary = %failed_primary_guid,
            new_primary = %backup_guid,
            "Failover promoted backup to primary"
        );

        Ok(())
    }

    /// Terminal outcome: clear the failed primary's flag and persist one
    /// critical alert for the operator.
    async fn raise_exhausted_alert(
        &self,
        group_guid: &str,
        failed_primary_guid: &str,
    ) -> Result<String> {
        let now = Utc::now();
        let alert_guid = Uuid::new_v4().to_string();
        let mut tx = self.db.begin().await?;

        sqlx::query("UPDATE candidates SET is_primary = 0, updated_at = ? WHERE guid = ?")
            .bind(now)
            .bind(failed_primary_guid)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO admin_alerts (guid, group_guid, severity, message, resolved, created_at) \
             VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(&alert_guid)
        .bind(group_guid)
        .bind(AlertSeverity::Critical.as_str())
        .bind(format!(
            "All backup versions failed re-verification for group {}; no playable primary remains",
            group_guid
        ))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(alert_guid)
    }
}
