//! Quality scoring for duplicate ranking
//!
//! Maps a candidate's observable signals to a score in [0, 100]. Pure and
//! deterministic given the same signals and reference time; availability is
//! deliberately not an input (availability and quality are orthogonal).
//!
//! Weighting policy:
//! - View count: up to 45 points, log-scaled (diminishing returns)
//! - Embeddable: 25 points, strictly rewarded over non-embeddable
//! - Metadata completeness: up to 20 points (catalog id 10, year 5, publish time 5)
//! - Recency: up to 10 points, one lost per year of age

use chrono::{DateTime, Utc};

/// Maximum quality score
pub const MAX_SCORE: i64 = 100;

const VIEW_WEIGHT: f64 = 45.0;
// log10 view count saturating at 10^8 views
const VIEW_LOG_CEILING: f64 = 8.0;
const EMBEDDABLE_POINTS: i64 = 25;
const CATALOG_ID_POINTS: i64 = 10;
const RELEASE_YEAR_POINTS: i64 = 5;
const PUBLISHED_AT_POINTS: i64 = 5;
const RECENCY_MAX_POINTS: i64 = 10;

/// Observable signals a candidate exposes for ranking
#[derive(Debug, Clone, Default)]
pub struct ObservableSignals {
    pub view_count: Option<i64>,
    pub published_at: Option<DateTime<Utc>>,
    pub embeddable: bool,
    pub has_catalog_id: bool,
    pub has_release_year: bool,
}

/// Score a candidate's observable signals at the given reference time.
///
/// Monotonic in view count, strictly greater for `embeddable = true` than
/// for an otherwise-identical non-embeddable candidate, clamped to [0, 100].
pub fn score(signals: &ObservableSignals, now: DateTime<Utc>) -> i64 {
    let mut total = 0i64;

    if let Some(views) = signals.view_count {
        let views = views.max(0) as f64;
        let scaled = ((views + 1.0).log10() / VIEW_LOG_CEILING).min(1.0);
        total += (scaled * VIEW_WEIGHT).round() as i64;
    }

    if signals.embeddable {
        total += EMBEDDABLE_POINTS;
    }

    if signals.has_catalog_id {
        total += CATALOG_ID_POINTS;
    }
    if signals.has_release_year {
        total += RELEASE_YEAR_POINTS;
    }
    if signals.published_at.is_some() {
        total += PUBLISHED_AT_POINTS;
    }

    if let Some(published_at) = signals.published_at {
        let age_years = (now - published_at).num_days() / 365;
        total += (RECENCY_MAX_POINTS - age_years).clamp(0, RECENCY_MAX_POINTS);
    }

    total.clamp(0, MAX_SCORE)
}
