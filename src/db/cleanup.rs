//! Bulk removal of all quiz data
//!
//! Used to reset a database between test runs. Rows are deleted child-first
//! so no foreign key is ever violated, and the whole sweep runs inside one
//! transaction: either every table is emptied or nothing changes.

use anyhow::{bail, Context, Result};
use sqlx::{MySqlPool, SqlitePool};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// Tables in the order they are emptied
pub const CLEANUP_ORDER: [&str; 5] = ["answers", "sessions", "questions", "categories", "users"];

/// Rows deleted per table, in deletion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: Vec<(&'static str, u64)>,
}

impl CleanupReport {
    /// Total rows deleted across all tables
    pub fn total(&self) -> u64 {
        self.deleted.iter().map(|(_, n)| n).sum()
    }

    /// Table names in the order they were processed
    pub fn tables(&self) -> Vec<&'static str> {
        self.deleted.iter().map(|(table, _)| *table).collect()
    }
}

/// Delete every answer, session, question, category and user.
///
/// Running it on an already empty database succeeds and deletes nothing.
///
/// # Errors
///
/// Returns an error if any delete fails (the transaction is rolled back) or
/// if a table still holds rows afterwards.
pub async fn clear_all(pool: &DynDatabasePool) -> Result<CleanupReport> {
    let report = {
        let _timer = pool.monitor().start("cleanup.clear_all");
        match pool.driver() {
            DatabaseDriver::Sqlite => clear_all_sqlite(pool.sqlite()?).await?,
            DatabaseDriver::Mysql => clear_all_mysql(pool.mysql()?).await?,
        }
    };

    for (table, remaining) in table_counts(pool).await? {
        if remaining != 0 {
            bail!("cleanup left {} row(s) in {}", remaining, table);
        }
    }

    tracing::info!(deleted = report.total(), "database cleared");
    Ok(report)
}

async fn clear_all_sqlite(pool: &SqlitePool) -> Result<CleanupReport> {
    let mut tx = pool.begin().await.context("Failed to begin cleanup transaction")?;
    let mut report = CleanupReport::default();

    for table in CLEANUP_ORDER {
        let result = sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to clear table {}", table))?;
        report.deleted.push((table, result.rows_affected()));
    }

    tx.commit().await.context("Failed to commit cleanup")?;
    Ok(report)
}

async fn clear_all_mysql(pool: &MySqlPool) -> Result<CleanupReport> {
    let mut tx = pool.begin().await.context("Failed to begin cleanup transaction")?;
    let mut report = CleanupReport::default();

    for table in CLEANUP_ORDER {
        let result = sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to clear table {}", table))?;
        report.deleted.push((table, result.rows_affected()));
    }

    tx.commit().await.context("Failed to commit cleanup")?;
    Ok(report)
}

/// Row count of each cleanup table, in [`CLEANUP_ORDER`]
pub async fn table_counts(pool: &DynDatabasePool) -> Result<Vec<(&'static str, i64)>> {
    let _timer = pool.monitor().start("cleanup.table_counts");
    let mut counts = Vec::with_capacity(CLEANUP_ORDER.len());

    for table in CLEANUP_ORDER {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let count: i64 = match pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query_scalar::<_, i64>(&sql).fetch_one(pool.sqlite()?).await,
            DatabaseDriver::Mysql => sqlx::query_scalar::<_, i64>(&sql).fetch_one(pool.mysql()?).await,
        }
        .with_context(|| format!("Failed to count rows in {}", table))?;
        counts.push((table, count));
    }

    Ok(counts)
}
