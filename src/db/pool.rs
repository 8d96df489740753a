//! SQLite connection pool

use anyhow::{Context, Result};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::config::StorageConfig;

fn is_memory_url(url: &str) -> bool {
    url == ":memory:" || url.starts_with("sqlite::memory:")
}

/// Create a SQLite connection pool from the storage configuration.
///
/// File paths get their parent directory created and are opened in
/// read-write-create mode. An in-memory database is limited to a single
/// connection so all queries share one database.
pub async fn create_pool(config: &StorageConfig) -> Result<SqlitePool> {
    let url = config.url.as_str();

    if !is_memory_url(url) {
        let path = url.trim_start_matches("sqlite:");
        let path = path.split('?').next().unwrap_or(path);
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
            }
        }
    }

    let connection_url = if url == ":memory:" {
        "sqlite::memory:".to_string()
    } else if url.starts_with("sqlite:") {
        if url.contains('?') {
            url.to_string()
        } else {
            format!("{}?mode=rwc", url)
        }
    } else {
        format!("sqlite:{}?mode=rwc", url)
    };

    let max_connections = if is_memory_url(url) { 1 } else { 10 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(&connection_url)
        .await
        .with_context(|| format!("Failed to connect to SQLite database: {}", url))?;

    Ok(pool)
}

/// Create a SQLite in-memory database pool for testing
pub async fn create_test_pool() -> Result<SqlitePool> {
    let config = StorageConfig {
        url: ":memory:".to_string(),
        ..StorageConfig::default()
    };
    create_pool(&config).await
}

/// Check that the database answers queries
pub async fn ping(pool: &SqlitePool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .context("Database ping failed")?;
    Ok(())
}
