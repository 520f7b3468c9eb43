//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ingested playable item tied to one immutable external video id.
///
/// Never deleted; `available = false` is the terminal mark for versions
/// the platform no longer serves.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Candidate {
    pub guid: String,
    /// External video id, immutable and unique
    pub video_id: String,
    pub title: String,
    /// External catalog identifier; strongest identity signal when present
    pub catalog_id: Option<String>,
    pub release_year: Option<i64>,
    pub view_count: Option<i64>,
    pub published_at: Option<DateTime<Utc>>,
    pub embeddable: bool,
    /// Recomputed from observable signals, never authoritative input
    pub quality_score: i64,
    pub available: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub group_guid: String,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Canonical identity bucket: one real-world work, possibly many duplicates.
///
/// At most one member candidate is primary at any time; zero only when
/// every member is unavailable. Groups are created lazily and never merged.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VideoGroup {
    pub guid: String,
    pub canonical_title: String,
    /// Lowercase, punctuation-stripped form used for similarity matching
    pub normalized_title: String,
    pub catalog_id: Option<String>,
    pub release_year: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// One execution record of the validation scheduler, immutable once written
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ValidationRun {
    pub guid: String,
    pub started_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub candidates_checked: i64,
    pub candidates_failed: i64,
    pub failovers_triggered: i64,
    pub quota_units_used: i64,
}

/// Append-only audit record of one primary promotion after a failure
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FailoverEvent {
    pub guid: String,
    pub group_guid: String,
    pub old_primary_guid: String,
    pub new_primary_guid: String,
    pub created_at: DateTime<Utc>,
}

/// Raised when a group's failover cascade exhausts all backups.
/// Only an operator flips `resolved`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdminAlert {
    pub guid: String,
    pub group_guid: String,
    pub severity: String,
    pub message: String,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }
}
