//! Video platform status API client
//!
//! Batch availability checks against the platform's status endpoint with
//! rate limiting between calls. One call costs the same quota price
//! regardless of how many ids it carries (up to [`MAX_BATCH_SIZE`]). This
//! client only executes the calls it is told to make; quota bookkeeping
//! belongs to the caller.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const DEFAULT_BASE_URL: &str = "https://api.video-platform.example/v3";
const USER_AGENT: &str = "TubeWatch/0.1.0 (https://github.com/tubewatch/tubewatch)";
const RATE_LIMIT_MS: u64 = 1000; // 1 request per second

/// Platform-imposed maximum ids per status call
pub const MAX_BATCH_SIZE: usize = 50;

/// Platform client errors
///
/// Transient transport failures are distinguishable via
/// [`PlatformError::is_transient`] so callers never confuse "couldn't tell"
/// with "confirmed gone".
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Batch of {0} ids exceeds platform maximum of {1}")]
    BatchTooLarge(usize, usize),
}

impl PlatformError {
    /// True for outcomes that may succeed on retry (timeouts, 5xx, rate
    /// limiting); false for confirmed API/protocol failures.
    pub fn is_transient(&self) -> bool {
        match self {
            PlatformError::Network(_) | PlatformError::RateLimited => true,
            PlatformError::Api(status, _) => *status >= 500,
            PlatformError::Parse(_) | PlatformError::BatchTooLarge(_, _) => false,
        }
    }
}

/// Why a video is confirmed unavailable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    /// The platform no longer knows the id
    NotFound,
    /// The video exists but is private
    Private,
    /// Upload exists but was never fully processed
    NotProcessed,
}

impl UnavailableReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnavailableReason::NotFound => "not_found",
            UnavailableReason::Private => "private",
            UnavailableReason::NotProcessed => "not_processed",
        }
    }
}

/// Per-video status returned by a batch check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoStatus {
    Available,
    Unavailable(UnavailableReason),
}

impl VideoStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, VideoStatus::Available)
    }
}

/// Seam between the validation core and the platform API.
///
/// The returned map contains an entry for every requested id; ids the
/// platform does not echo back are reported as not found.
#[async_trait::async_trait]
pub trait StatusProbe: Send + Sync {
    async fn check_batch(
        &self,
        video_ids: &[String],
    ) -> Result<HashMap<String, VideoStatus>, PlatformError>;
}

/// Status endpoint wire format
#[derive(Debug, Deserialize)]
struct StatusListResponse {
    #[serde(default)]
    items: Vec<StatusItem>,
}

#[derive(Debug, Deserialize)]
struct StatusItem {
    id: String,
    status: ItemStatus,
}

#[derive(Debug, Deserialize)]
struct ItemStatus {
    #[serde(rename = "uploadStatus")]
    upload_status: String,
    #[serde(rename = "privacyStatus")]
    privacy_status: String,
}

/// Rate limiter enforcing a minimum interval between outbound calls
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Video platform status API client
pub struct PlatformClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
    api_key: String,
}

impl PlatformClient {
    pub fn new(api_key: String) -> Result<Self, PlatformError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, PlatformError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
            base_url,
            api_key,
        })
    }

    fn interpret(status: &ItemStatus) -> VideoStatus {
        if status.privacy_status == "private" {
            VideoStatus::Unavailable(UnavailableReason::Private)
        } else if status.upload_status != "processed" {
            VideoStatus::Unavailable(UnavailableReason::NotProcessed)
        } else {
            VideoStatus::Available
        }
    }
}

#[async_trait::async_trait]
impl StatusProbe for PlatformClient {
    /// Check up to [`MAX_BATCH_SIZE`] video ids in one status call.
    async fn check_batch(
        &self,
        video_ids: &[String],
    ) -> Result<HashMap<String, VideoStatus>, PlatformError> {
        if video_ids.len() > MAX_BATCH_SIZE {
            return Err(PlatformError::BatchTooLarge(video_ids.len(), MAX_BATCH_SIZE));
        }
        if video_ids.is_empty() {
            return Ok(HashMap::new());
        }

        self.rate_limiter.wait().await;

        let url = format!(
            "{}/videos?part=status&id={}&key={}",
            self.base_url,
            video_ids.join(","),
            self.api_key
        );

        tracing::debug!(ids = video_ids.len(), "Querying platform status endpoint");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        let status = response.status();

        if status == 403 || status == 429 {
            return Err(PlatformError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PlatformError::Api(status.as_u16(), error_text));
        }

        let list: StatusListResponse = response
            .json()
            .await
            .map_err(|e| PlatformError::Parse(e.to_string()))?;

        let mut results: HashMap<String, VideoStatus> = video_ids
            .iter()
            .map(|id| (id.clone(), VideoStatus::Unavailable(UnavailableReason::NotFound)))
            .collect();

        for item in list.items {
            results.insert(item.id.clone(), Self::interpret(&item.status));
        }

        tracing::debug!(
            checked = video_ids.len(),
            unavailable = results.values().filter(|s| !s.is_available()).count(),
            "Platform status batch complete"
        );

        Ok(results)
    }
}
