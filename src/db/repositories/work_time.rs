//! Work-time repository
//!
//! Keyed record store mapping username to start/end stamps.
//!
//! Read-modify-write sequences are serialized by the caller
//! (`WorkTimeService`), not by the store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::WorkTimeRecord;

/// Work-time ledger trait
#[async_trait]
pub trait WorkTimeRepository: Send + Sync {
    /// Get the record for a username
    async fn get(&self, username: &str) -> Result<Option<WorkTimeRecord>>;

    /// Insert or fully replace the record for a username
    async fn put(&self, username: &str, record: &WorkTimeRecord) -> Result<()>;

    /// Whether a record exists for a username
    async fn has(&self, username: &str) -> Result<bool>;

    /// All records, ordered by username
    async fn list(&self) -> Result<BTreeMap<String, WorkTimeRecord>>;
}

/// SQLite-backed work-time ledger
pub struct SqlxWorkTimeRepository {
    pool: SqlitePool,
}

impl SqlxWorkTimeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn WorkTimeRepository> {
        Arc::new(Self::new(pool))
    }
}

fn row_to_record(row: &SqliteRow) -> WorkTimeRecord {
    WorkTimeRecord {
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
    }
}

#[async_trait]
impl WorkTimeRepository for SqlxWorkTimeRepository {
    async fn get(&self, username: &str) -> Result<Option<WorkTimeRecord>> {
        let row = sqlx::query("SELECT start_time, end_time FROM work_times WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get work time")?;

        Ok(row.as_ref().map(row_to_record))
    }

    async fn put(&self, username: &str, record: &WorkTimeRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO work_times (username, start_time, end_time, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(username) DO UPDATE SET
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(username)
        .bind(&record.start_time)
        .bind(&record.end_time)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to store work time")?;

        Ok(())
    }

    async fn has(&self, username: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM work_times WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to check work time")?;

        Ok(row.is_some())
    }

    async fn list(&self) -> Result<BTreeMap<String, WorkTimeRecord>> {
        let rows = sqlx::query("SELECT username, start_time, end_time FROM work_times ORDER BY username")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list work times")?;

        Ok(rows
            .iter()
            .map(|row| (row.get::<String, _>("username"), row_to_record(row)))
            .collect())
    }
}

/// In-process work-time ledger, lost on restart
#[derive(Default)]
pub struct MemoryWorkTimeRepository {
    records: RwLock<BTreeMap<String, WorkTimeRecord>>,
}

impl MemoryWorkTimeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boxed() -> Arc<dyn WorkTimeRepository> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl WorkTimeRepository for MemoryWorkTimeRepository {
    async fn get(&self, username: &str) -> Result<Option<WorkTimeRecord>> {
        Ok(self.records.read().await.get(username).cloned())
    }

    async fn put(&self, username: &str, record: &WorkTimeRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(username.to_string(), record.clone());
        Ok(())
    }

    async fn has(&self, username: &str) -> Result<bool> {
        Ok(self.records.read().await.contains_key(username))
    }

    async fn list(&self) -> Result<BTreeMap<String, WorkTimeRecord>> {
        Ok(self.records.read().await.clone())
    }
}
