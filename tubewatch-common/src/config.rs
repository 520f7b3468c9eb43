//! Configuration loading for the validator service
//!
//! Priority order for the config file location:
//! 1. Explicit path (command line / caller supplied)
//! 2. `TUBEWATCH_CONFIG` environment variable
//! 3. `./tubewatch.toml` in the working directory
//! 4. Compiled defaults (no file required)
//!
//! Individual tunables may additionally be overridden from the `settings`
//! table, so operators can adjust them without a restart losing the change.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "tubewatch.toml";

/// Validator service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Daily quota budget for status endpoint calls, in quota units
    pub daily_quota_budget: i64,
    /// Quota units one status call costs, regardless of batch fill
    pub quota_cost_per_call: i64,
    /// Upper bound on candidates selected for one validation run
    pub max_daily_checks: i64,
    /// Maximum ids per status endpoint call (platform limit is 50)
    pub batch_size: usize,
    /// Pause between consecutive batches, milliseconds
    pub inter_batch_delay_ms: u64,
    /// Minimum normalized-title similarity for a fuzzy group match
    pub similarity_threshold: f64,
    /// Maximum release-year difference tolerated for a fuzzy group match
    pub year_tolerance: i64,
    /// How many ranked backups the failover cascade re-verifies
    pub failover_breadth: usize,
    /// Seconds between scheduled validation runs
    pub run_interval_secs: u64,
    /// HTTP listen port
    pub port: u16,
    /// SQLite database path
    pub database_path: String,
    /// Video platform API key
    pub platform_api_key: Option<String>,
    /// Override for the platform API base URL (testing / proxies)
    pub platform_base_url: Option<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            daily_quota_budget: 10_000,
            quota_cost_per_call: 50,
            max_daily_checks: 5000,
            batch_size: 50,
            inter_batch_delay_ms: 2000,
            similarity_threshold: 0.7,
            year_tolerance: 1,
            failover_breadth: 3,
            run_interval_secs: 86400,
            port: 5731,
            database_path: "tubewatch.db".to_string(),
            platform_api_key: None,
            platform_base_url: None,
        }
    }
}

impl ValidationConfig {
    /// Load configuration following the documented priority order.
    ///
    /// A missing config file is not an error; compiled defaults apply.
    /// A present but unparseable file is an error.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = match explicit_path {
            Some(p) => Some(PathBuf::from(p)),
            None => match std::env::var("TUBEWATCH_CONFIG") {
                Ok(p) => Some(PathBuf::from(p)),
                Err(_) => {
                    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                    if default.exists() {
                        Some(default)
                    } else {
                        None
                    }
                }
            },
        };

        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(&path)?;
                let config: ValidationConfig = toml::from_str(&content)
                    .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
                tracing::info!(path = %path.display(), "Loaded configuration file");
                config
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                ValidationConfig::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate tunables are in usable ranges
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".to_string()));
        }
        if self.daily_quota_budget < 0 {
            return Err(Error::Config("daily_quota_budget must not be negative".to_string()));
        }
        if self.quota_cost_per_call <= 0 {
            return Err(Error::Config("quota_cost_per_call must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::Config(format!(
                "similarity_threshold must be in [0.0, 1.0], got {}",
                self.similarity_threshold
            )));
        }
        if self.failover_breadth == 0 {
            return Err(Error::Config("failover_breadth must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Apply per-key overrides from the `settings` table.
    ///
    /// Unknown keys are ignored; unparseable values are logged and skipped
    /// rather than failing startup.
    pub async fn apply_settings(&mut self, db: &SqlitePool) -> Result<()> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM settings")
            .fetch_all(db)
            .await?;

        for (key, value) in rows {
            let applied = match key.as_str() {
                "daily_quota_budget" => parse_into(&value, &mut self.daily_quota_budget),
                "quota_cost_per_call" => parse_into(&value, &mut self.quota_cost_per_call),
                "max_daily_checks" => parse_into(&value, &mut self.max_daily_checks),
                "batch_size" => parse_into(&value, &mut self.batch_size),
                "inter_batch_delay_ms" => parse_into(&value, &mut self.inter_batch_delay_ms),
                "similarity_threshold" => parse_into(&value, &mut self.similarity_threshold),
                "year_tolerance" => parse_into(&value, &mut self.year_tolerance),
                "failover_breadth" => parse_into(&value, &mut self.failover_breadth),
                "run_interval_secs" => parse_into(&value, &mut self.run_interval_secs),
                _ => continue,
            };
            if applied {
                tracing::debug!(key = %key, value = %value, "Applied setting override");
            } else {
                tracing::warn!(key = %key, value = %value, "Ignoring unparseable setting value");
            }
        }

        self.validate()?;
        Ok(())
    }
}

fn parse_into<T: std::str::FromStr>(value: &str, target: &mut T) -> bool {
    match value.parse::<T>() {
        Ok(parsed) => {
            *target = parsed;
            true
        }
        Err(_) => false,
    }
}
