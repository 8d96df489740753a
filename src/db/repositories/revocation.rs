//! Revocation repository
//!
//! The ledger of tokens invalidated by logout. Entries are never removed.
//!
//! This module provides:
//! - `RevocationRepository` trait defining the ledger interface
//! - `SqlxRevocationRepository` persisting to SQLite
//! - `MemoryRevocationRepository` keeping a lock-guarded set in process

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Revocation ledger trait
#[async_trait]
pub trait RevocationRepository: Send + Sync {
    /// Whether the token has been revoked
    async fn is_revoked(&self, token: &str) -> Result<bool>;

    /// Add a token to the ledger. Revoking twice is not an error.
    ///
    /// Returns only after the entry is stored.
    async fn revoke(&self, token: &str) -> Result<()>;
}

/// SQLite-backed revocation ledger
pub struct SqlxRevocationRepository {
    pool: SqlitePool,
}

impl SqlxRevocationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn RevocationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl RevocationRepository for SqlxRevocationRepository {
    async fn is_revoked(&self, token: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM revoked_tokens WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up revoked token")?;

        Ok(row.is_some())
    }

    async fn revoke(&self, token: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO revoked_tokens (token, revoked_at) VALUES (?, ?)")
            .bind(token)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("Failed to revoke token")?;

        Ok(())
    }
}

/// In-process revocation ledger, lost on restart
#[derive(Default)]
pub struct MemoryRevocationRepository {
    tokens: RwLock<HashSet<String>>,
}

impl MemoryRevocationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boxed() -> Arc<dyn RevocationRepository> {
        Arc::new(Self::new())
    }

    /// Number of revoked tokens
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }
}

#[async_trait]
impl RevocationRepository for MemoryRevocationRepository {
    async fn is_revoked(&self, token: &str) -> Result<bool> {
        Ok(self.tokens.read().await.contains(token))
    }

    async fn revoke(&self, token: &str) -> Result<()> {
        self.tokens.write().await.insert(token.to_string());
        Ok(())
    }
}
