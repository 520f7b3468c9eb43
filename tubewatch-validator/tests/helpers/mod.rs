//! Shared helpers for integration tests
#![allow(dead_code)]

use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tubewatch_common::db::create_tables;
use tubewatch_common::ValidationConfig;
use tubewatch_validator::services::{NewCandidate, PlatformError, StatusProbe, VideoStatus};
use tubewatch_validator::AppState;

/// Scripted status probe: answers from a fixed table, counts calls.
/// Unknown ids answer Available.
pub struct FakeProbe {
    statuses: std::sync::Mutex<HashMap<String, VideoStatus>>,
    calls: AtomicUsize,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self {
            statuses: std::sync::Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, video_id: &str, status: VideoStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(video_id.to_string(), status);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StatusProbe for FakeProbe {
    async fn check_batch(
        &self,
        video_ids: &[String],
    ) -> Result<HashMap<String, VideoStatus>, PlatformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let statuses = self.statuses.lock().unwrap();
        Ok(video_ids
            .iter()
            .map(|id| {
                let status = statuses.get(id).copied().unwrap_or(VideoStatus::Available);
                (id.clone(), status)
            })
            .collect())
    }
}

pub fn test_config() -> ValidationConfig {
    ValidationConfig {
        inter_batch_delay_ms: 0,
        quota_cost_per_call: 1,
        ..Default::default()
    }
}

/// In-memory application state wired to a scripted probe
pub async fn setup_state_with_config(config: ValidationConfig) -> (AppState, Arc<FakeProbe>, SqlitePool) {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    create_tables(&pool).await.unwrap();
    let probe = Arc::new(FakeProbe::new());
    let state = AppState::new(pool.clone(), config, probe.clone());
    (state, probe, pool)
}

pub async fn setup_state() -> (AppState, Arc<FakeProbe>, SqlitePool) {
    setup_state_with_config(test_config()).await
}

/// A candidate for one shared catalog work, with signals shaped to give
/// higher quality to higher `views` / embeddable versions
pub fn catalog_candidate(video_id: &str, views: i64, embeddable: bool) -> NewCandidate {
    NewCandidate {
        video_id: video_id.to_string(),
        title: "Bohemian Rhapsody Official Video".to_string(),
        catalog_id: Some("cat-123".to_string()),
        release_year: Some(1975),
        view_count: Some(views),
        published_at: None,
        embeddable,
    }
}

pub fn titled_candidate(video_id: &str, title: &str) -> NewCandidate {
    NewCandidate {
        video_id: video_id.to_string(),
        title: title.to_string(),
        catalog_id: None,
        release_year: None,
        view_count: Some(1000),
        published_at: None,
        embeddable: true,
    }
}

pub async fn primary_of(pool: &SqlitePool, group_guid: &str) -> Option<String> {
    sqlx::query_scalar("SELECT guid FROM candidates WHERE group_guid = ? AND is_primary = 1")
        .bind(group_guid)
        .fetch_optional(pool)
        .await
        .unwrap()
}

pub async fn primaries_in(pool: &SqlitePool, group_guid: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM candidates WHERE group_guid = ? AND is_primary = 1")
        .bind(group_guid)
        .fetch_one(pool)
        .await
        .unwrap()
}
