//! Database repositories
//!
//! Storage interfaces for the two ledgers, each with a SQLite and an
//! in-memory implementation.

pub mod revocation;
pub mod work_time;

pub use revocation::{MemoryRevocationRepository, RevocationRepository, SqlxRevocationRepository};
pub use work_time::{MemoryWorkTimeRepository, SqlxWorkTimeRepository, WorkTimeRepository};
