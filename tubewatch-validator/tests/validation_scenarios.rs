//! End-to-end scenarios for grouping, ranking, validation and failover
//!
//! Exercises the full ingest → validate → failover pipeline against an
//! in-memory database and a scripted status probe.

mod helpers;

use helpers::*;
use tubewatch_common::ValidationConfig;
use tubewatch_validator::services::{UnavailableReason, VideoStatus};

/// Three duplicates of one catalog work, ingested best-first: the best
/// becomes primary, the other two stay backups.
#[tokio::test]
async fn scenario_best_of_three_duplicates_is_primary() {
    let (state, _probe, pool) = setup_state().await;

    let best = state
        .ingestor
        .ingest(catalog_candidate("vid-a", 100_000_000, true))
        .await
        .unwrap();
    let middle = state
        .ingestor
        .ingest(catalog_candidate("vid-b", 30_000, true))
        .await
        .unwrap();
    let worst = state
        .ingestor
        .ingest(catalog_candidate("vid-c", 215_000, false))
        .await
        .unwrap();

    // All three landed in the same group via the catalog id
    assert_eq!(middle.group_guid, best.group_guid);
    assert_eq!(worst.group_guid, best.group_guid);

    // Scores strictly descending, best is primary
    assert!(best.quality_score > middle.quality_score);
    assert!(middle.quality_score > worst.quality_score);
    assert!(best.is_primary);
    assert!(!middle.is_primary);
    assert!(!worst.is_primary);

    assert_eq!(primaries_in(&pool, &best.group_guid).await, 1);
}

/// Primary fails validation; the better backup re-verifies available and
/// takes over; a failover event links old to new; the third stays put.
#[tokio::test]
async fn scenario_failover_promotes_best_surviving_backup() {
    let (state, probe, pool) = setup_state().await;

    let old_primary = state
        .ingestor
        .ingest(catalog_candidate("vid-a", 100_000_000, true))
        .await
        .unwrap();
    let backup = state
        .ingestor
        .ingest(catalog_candidate("vid-b", 30_000, true))
        .await
        .unwrap();
    let untouched = state
        .ingestor
        .ingest(catalog_candidate("vid-c", 215_000, false))
        .await
        .unwrap();

    probe.set("vid-a", VideoStatus::Unavailable(UnavailableReason::NotFound));

    let summary = state.scheduler.run().await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failovers_triggered, 1);

    // Best backup is the new primary
    assert_eq!(
        primary_of(&pool, &old_primary.group_guid).await.as_deref(),
        Some(backup.candidate_guid.as_str())
    );
    assert_eq!(primaries_in(&pool, &old_primary.group_guid).await, 1);

    // Audit trail links old to new
    let (old, new): (String, String) = sqlx::query_as(
        "SELECT old_primary_guid, new_primary_guid FROM failover_events WHERE group_guid = ?",
    )
    .bind(&old_primary.group_guid)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(old, old_primary.candidate_guid);
    assert_eq!(new, backup.candidate_guid);

    // The weaker backup was not touched by the cascade
    let (is_primary, available): (bool, bool) =
        sqlx::query_as("SELECT is_primary, available FROM candidates WHERE guid = ?")
            .bind(&untouched.candidate_guid)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(!is_primary);
    assert!(available);
}

/// Primary and every backup fail: the group ends with zero primaries and
/// exactly one critical alert referencing it.
#[tokio::test]
async fn scenario_exhausted_cascade_raises_critical_alert() {
    let (state, probe, pool) = setup_state().await;

    let primary = state
        .ingestor
        .ingest(catalog_candidate("vid-a", 100_000_000, true))
        .await
        .unwrap();
    state
        .ingestor
        .ingest(catalog_candidate("vid-b", 30_000, true))
        .await
        .unwrap();
    state
        .ingestor
        .ingest(catalog_candidate("vid-c", 215_000, false))
        .await
        .unwrap();

    for vid in ["vid-a", "vid-b", "vid-c"] {
        probe.set(vid, VideoStatus::Unavailable(UnavailableReason::Private));
    }

    let summary = state.scheduler.run().await.unwrap();
    assert_eq!(summary.failovers_triggered, 1);

    assert_eq!(primaries_in(&pool, &primary.group_guid).await, 0);

    let alerts: Vec<(String, String, bool)> = sqlx::query_as(
        "SELECT group_guid, severity, resolved FROM admin_alerts",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].0, primary.group_guid);
    assert_eq!(alerts[0].1, "critical");
    assert!(!alerts[0].2);
}

/// Quota budget of 100 units at 50 per call serves exactly two batches;
/// the rest of the backlog is deferred to the next run.
#[tokio::test]
async fn scenario_quota_budget_defers_overflow() {
    let config = ValidationConfig {
        daily_quota_budget: 100,
        quota_cost_per_call: 50,
        batch_size: 50,
        inter_batch_delay_ms: 0,
        ..Default::default()
    };
    let (state, probe, pool) = setup_state_with_config(config).await;

    for i in 0..120 {
        state
            .ingestor
            .ingest(catalog_candidate(&format!("vid-{}", i), 1000 + i, true))
            .await
            .unwrap();
    }

    let summary = state.scheduler.run().await.unwrap();
    assert_eq!(probe.call_count(), 2);
    assert_eq!(summary.quota_used, 100);
    assert_eq!(summary.validated, 100);

    let deferred: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM candidates WHERE last_checked_at IS NULL")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(deferred, 20);

    // A second run on the same day has no budget left and checks nothing
    let second = state.scheduler.run().await.unwrap();
    assert_eq!(second.validated, 0);
    assert_eq!(second.quota_used, 0);
    assert_eq!(probe.call_count(), 2);
}

/// Unrelated titles never false-merge below the similarity threshold.
#[tokio::test]
async fn scenario_dissimilar_candidates_create_separate_groups() {
    let (state, _probe, pool) = setup_state().await;

    let first = state
        .ingestor
        .ingest(titled_candidate("vid-1", "Blinding Lights Official Video"))
        .await
        .unwrap();
    let second = state
        .ingestor
        .ingest(titled_candidate("vid-2", "Watermelon Sugar Official Audio"))
        .await
        .unwrap();

    assert_ne!(first.group_guid, second.group_guid);

    let groups: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM video_groups")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(groups, 2);

    // Each is primary of its own group
    assert_eq!(primaries_in(&pool, &first.group_guid).await, 1);
    assert_eq!(primaries_in(&pool, &second.group_guid).await, 1);
}

/// The one-primary invariant holds at every observation point: after
/// ingestion, after a clean validation pass, and after a failover.
#[tokio::test]
async fn scenario_invariant_holds_across_lifecycle() {
    let (state, probe, pool) = setup_state().await;

    for (vid, views, embeddable) in [
        ("vid-a", 100_000_000, true),
        ("vid-b", 30_000, true),
        ("vid-c", 215_000, false),
    ] {
        state
            .ingestor
            .ingest(catalog_candidate(vid, views, embeddable))
            .await
            .unwrap();
        let group: String = sqlx::query_scalar("SELECT guid FROM video_groups LIMIT 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(primaries_in(&pool, &group).await, 1);
    }

    let group: String = sqlx::query_scalar("SELECT guid FROM video_groups LIMIT 1")
        .fetch_one(&pool)
        .await
        .unwrap();

    // Clean pass: nothing changes
    state.scheduler.run().await.unwrap();
    assert_eq!(primaries_in(&pool, &group).await, 1);

    // Primary dies, failover runs: still exactly one primary
    let primary = primary_of(&pool, &group).await.unwrap();
    let primary_vid: String = sqlx::query_scalar("SELECT video_id FROM candidates WHERE guid = ?")
        .bind(&primary)
        .fetch_one(&pool)
        .await
        .unwrap();
    probe.set(&primary_vid, VideoStatus::Unavailable(UnavailableReason::NotFound));

    state.scheduler.run().await.unwrap();
    assert_eq!(primaries_in(&pool, &group).await, 1);
    assert_ne!(primary_of(&pool, &group).await.unwrap(), primary);
}
