//! Services layer - Business logic
//!
//! This module contains the business logic of the Timekeeper service:
//! - Credential checks and token issuance/verification
//! - Authentication against the revocation ledger
//! - Fetching authoritative time with bounded retry
//! - Recording and administering work times

pub mod auth;
pub mod credentials;
pub mod password;
pub mod time_client;
pub mod token;
pub mod work_time;

#[cfg(test)]
pub(crate) mod test_utils;

pub use auth::{AuthError, AuthService, LoginOutcome};
pub use credentials::{Credential, CredentialStore, StaticCredentialStore};
pub use password::{hash_password, verify_password};
pub use time_client::{
    normalize_work_time, AuthoritativeTime, RetryPolicy, Sleeper, TimeClient, TimeError, TimeSource,
    TokioSleeper, WorldTimeApiSource,
};
pub use token::{TokenError, TokenIssuer};
pub use work_time::{EditWorkTimeInput, WorkTimeService, WorkTimeServiceError};
