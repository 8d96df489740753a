//! Data models
//!
//! This module contains the data structures shared across the Timekeeper service:
//! - Identity carried inside signed tokens
//! - Work-time records kept per username

mod identity;
mod work_time;

pub use identity::Identity;
pub use work_time::{is_valid_work_time, WorkTimeField, WorkTimeRecord, WORK_TIME_FORMAT};
