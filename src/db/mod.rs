//! Database layer
//!
//! Ledger persistence for the Timekeeper service. SQLite is the durable
//! backend; the repositories also ship lock-guarded in-memory variants for
//! single-instance deployments and tests.
//!
//! # Usage
//!
//! ```ignore
//! use timekeeper::config::StorageConfig;
//! use timekeeper::db::{create_pool, migrations};
//!
//! let pool = create_pool(&StorageConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, ping};
