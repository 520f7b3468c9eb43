//! Daily quota bookkeeping
//!
//! Persists quota units spent per UTC day so restarts cannot double-spend
//! the budget. Callers pass the day explicitly, which keeps the arithmetic
//! deterministic under test; the scheduler supplies the current UTC date.
//!
//! Only the holder of the run lease mutates the ledger, so reads and the
//! read-modify-write in `record` do not race.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tubewatch_common::Result;

pub struct QuotaLedger {
    db: SqlitePool,
}

impl QuotaLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Units already spent on the given day
    pub async fn units_used(&self, day: NaiveDate) -> Result<i64> {
        let used: Option<i64> = sqlx::query_scalar("SELECT units_used FROM quota_usage WHERE day = ?")
            .bind(day_key(day))
            .fetch_optional(&self.db)
            .await?;
        Ok(used.unwrap_or(0))
    }

    /// Units still available out of `budget` on the given day, floored at 0
    pub async fn remaining(&self, budget: i64, day: NaiveDate) -> Result<i64> {
        let used = self.units_used(day).await?;
        Ok((budget - used).max(0))
    }

    /// Record spent units against the given day
    pub async fn record(&self, units: i64, day: NaiveDate) -> Result<()> {
        if units <= 0 {
            return Ok(());
        }
        sqlx::query(
            "INSERT INTO quota_usage (day, units_used) VALUES (?, ?) \
             ON CONFLICT(day) DO UPDATE SET units_used = units_used + excluded.units_used",
        )
        .bind(day_key(day))
        .bind(units)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}
