//! Database initialization
//!
//! Opens (or creates) the shared SQLite database and applies the schema.
//! Table creation is idempotent so every service can call it at startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode: concurrent readers during a validation run's writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent - safe to call multiple times)
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_video_groups_table(pool).await?;
    create_candidates_table(pool).await?;
    create_validation_runs_table(pool).await?;
    create_failover_events_table(pool).await?;
    create_admin_alerts_table(pool).await?;
    create_quota_usage_table(pool).await?;
    Ok(())
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_video_groups_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS video_groups (
            guid TEXT PRIMARY KEY,
            canonical_title TEXT NOT NULL,
            normalized_title TEXT NOT NULL,
            catalog_id TEXT,
            release_year INTEGER,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Strongest dedup key: unique where present, multiple NULLs allowed
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_video_groups_catalog_id
        ON video_groups (catalog_id) WHERE catalog_id IS NOT NULL
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_candidates_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS candidates (
            guid TEXT PRIMARY KEY,
            video_id TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            catalog_id TEXT,
            release_year INTEGER,
            view_count INTEGER,
            published_at TEXT,
            embeddable INTEGER NOT NULL DEFAULT 0,
            quality_score INTEGER NOT NULL DEFAULT 0,
            available INTEGER NOT NULL DEFAULT 1,
            last_checked_at TEXT,
            group_guid TEXT NOT NULL REFERENCES video_groups(guid),
            is_primary INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Supports "oldest last-checked among available candidates" selection
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_candidates_staleness
        ON candidates (available, last_checked_at)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_candidates_group
        ON candidates (group_guid)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_validation_runs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS validation_runs (
            guid TEXT PRIMARY KEY,
            started_at TEXT NOT NULL,
            duration_seconds REAL NOT NULL,
            candidates_checked INTEGER NOT NULL,
            candidates_failed INTEGER NOT NULL,
            failovers_triggered INTEGER NOT NULL,
            quota_units_used INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_failover_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS failover_events (
            guid TEXT PRIMARY KEY,
            group_guid TEXT NOT NULL REFERENCES video_groups(guid),
            old_primary_guid TEXT NOT NULL,
            new_primary_guid TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_admin_alerts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admin_alerts (
            guid TEXT PRIMARY KEY,
            group_guid TEXT NOT NULL REFERENCES video_groups(guid),
            severity TEXT NOT NULL,
            message TEXT NOT NULL,
            resolved INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_quota_usage_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quota_usage (
            day TEXT PRIMARY KEY,
            units_used INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_tables_idempotent() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        create_tables(&pool).await.unwrap();
        // Second pass must not error
        create_tables(&pool).await.unwrap();

        // Sanity: all tables exist
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
             ('settings', 'video_groups', 'candidates', 'validation_runs', \
              'failover_events', 'admin_alerts', 'quota_usage')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 7);
    }

    #[tokio::test]
    async fn test_catalog_id_unique_when_present() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        create_tables(&pool).await.unwrap();

        sqlx::query(
            "INSERT INTO video_groups (guid, canonical_title, normalized_title, catalog_id, created_at) \
             VALUES ('g1', 'A', 'a', 'cat-1', '2026-01-01T00:00:00+00:00')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let dup = sqlx::query(
            "INSERT INTO video_groups (guid, canonical_title, normalized_title, catalog_id, created_at) \
             VALUES ('g2', 'B', 'b', 'cat-1', '2026-01-01T00:00:00+00:00')",
        )
        .execute(&pool)
        .await;
        assert!(dup.is_err());

        // Multiple NULL catalog ids are fine
        for guid in ["g3", "g4"] {
            sqlx::query(
                "INSERT INTO video_groups (guid, canonical_title, normalized_title, created_at) \
                 VALUES (?, 'C', 'c', '2026-01-01T00:00:00+00:00')",
            )
            .bind(guid)
            .execute(&pool)
            .await
            .unwrap();
        }
    }
}
