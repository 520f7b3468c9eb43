//! Primary arbitration for duplicate groups
//!
//! Decides whether a freshly scored candidate becomes its group's primary
//! version. The decision is pure; applying it flips both flags inside one
//! transaction so the at-most-one-primary invariant holds at every
//! observation point.
//!
//! Promotion requires a strictly greater score. Equal scores never promote,
//! so equally-ranked duplicates cannot flap.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use tubewatch_common::Result;

/// Outcome of arbitration for one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryDecision {
    /// Candidate becomes the group's primary
    pub is_primary: bool,
    /// Guid of the current primary to demote, if any
    pub demote: Option<String>,
}

/// Decide whether a candidate with `candidate_score` displaces the current
/// primary (given as `(guid, score)`).
pub fn decide(current_primary: Option<&(String, i64)>, candidate_score: i64) -> PrimaryDecision {
    match current_primary {
        None => PrimaryDecision {
            is_primary: true,
            demote: None,
        },
        Some((guid, current_score)) => {
            if candidate_score > *current_score {
                PrimaryDecision {
                    is_primary: true,
                    demote: Some(guid.clone()),
                }
            } else {
                PrimaryDecision {
                    is_primary: false,
                    demote: None,
                }
            }
        }
    }
}

/// Storage-side arbiter: looks up the current primary and applies decisions
/// inside the caller's transaction
pub struct PrimaryArbiter;

impl PrimaryArbiter {
    /// Current primary of a group as `(guid, quality_score)`, if any
    pub async fn current_primary_tx(
        tx: &mut Transaction<'_, Sqlite>,
        group_guid: &str,
    ) -> Result<Option<(String, i64)>> {
        let row: Option<(String, i64)> = sqlx::query_as(
            "SELECT guid, quality_score FROM candidates WHERE group_guid = ? AND is_primary = 1",
        )
        .bind(group_guid)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row)
    }

    /// Apply a promotion decision inside an open transaction: demote the
    /// displaced primary (if any) and set the new primary's flag.
    ///
    /// No-op when the decision does not promote.
    pub async fn apply_tx(
        tx: &mut Transaction<'_, Sqlite>,
        candidate_guid: &str,
        decision: &PrimaryDecision,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !decision.is_primary {
            return Ok(());
        }

        if let Some(demoted_guid) = &decision.demote {
            sqlx::query("UPDATE candidates SET is_primary = 0, updated_at = ? WHERE guid = ?")
                .bind(now)
                .bind(demoted_guid)
                .execute(&mut **tx)
                .await?;
        }

        sqlx::query("UPDATE candidates SET is_primary = 1, updated_at = ? WHERE guid = ?")
            .bind(now)
            .bind(candidate_guid)
            .execute(&mut **tx)
            .await?;

        tracing::debug!(
            candidate_guid = %candidate_guid,
            demoted = ?decision.demote,
            "Applied primary promotion"
        );

        Ok(())
    }
}
