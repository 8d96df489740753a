//! External time client
//!
//! Work-time stamps come from a remote time authority, never from the local
//! clock. The upstream is flaky, so every fetch runs through a bounded retry
//! loop:
//! - any failure (network error, non-2xx status, malformed body, unparseable
//!   datetime) counts as a failed attempt and is logged with its number
//! - attempts are sequential with a constant delay between them
//! - after `max_attempts` failures the fetch gives up with `UpstreamUnavailable`
//!
//! The delay goes through a `Sleeper` so tests can run the loop without
//! real time passing.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::TimeApiConfig;
use crate::models::WORK_TIME_FORMAT;

/// Error returned once the retry budget is spent
#[derive(Debug, thiserror::Error)]
pub enum TimeError {
    #[error("Failed to fetch time after {attempts} attempts")]
    UpstreamUnavailable { attempts: u32 },
}

/// A single attempt at asking the authority for the current time
#[async_trait]
pub trait TimeSource: Send + Sync {
    /// Fetch the raw ISO-8601 datetime string
    async fn fetch_datetime(&self) -> Result<String>;
}

/// Waits between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Body returned by worldtimeapi.org style endpoints
#[derive(Debug, Deserialize)]
struct WorldTimeResponse {
    datetime: String,
}

/// `TimeSource` over HTTP, expecting a JSON body with a `datetime` field
pub struct WorldTimeApiSource {
    client: reqwest::Client,
    url: String,
}

impl WorldTimeApiSource {
    pub fn new(config: &TimeApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("timekeeper/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl TimeSource for WorldTimeApiSource {
    async fn fetch_datetime(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("Time request failed")?
            .error_for_status()
            .context("Time authority returned an error status")?;

        let body: WorldTimeResponse = response
            .json()
            .await
            .context("Malformed time authority response")?;

        Ok(body.datetime)
    }
}

/// How many attempts to make and how long to wait between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl From<&TimeApiConfig> for RetryPolicy {
    fn from(config: &TimeApiConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.retry_delay_ms))
    }
}

/// A timestamp as delivered by the authority
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthoritativeTime {
    /// The string exactly as received
    pub datetime: String,
    pub instant: DateTime<FixedOffset>,
}

impl AuthoritativeTime {
    /// Parse an ISO-8601 datetime. A value without an offset is taken as UTC.
    pub fn parse(datetime: &str) -> Result<Self> {
        let trimmed = datetime.trim();
        let instant = match DateTime::parse_from_rfc3339(trimmed) {
            Ok(instant) => instant,
            Err(_) => NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| naive.and_utc().fixed_offset())
                .with_context(|| format!("Unparseable datetime '{}'", datetime))?,
        };
        Ok(Self {
            datetime: datetime.to_string(),
            instant,
        })
    }

    /// The `YYYY-MM-DD HH:mm` form stored in work-time records
    pub fn to_work_time(&self) -> String {
        normalize_work_time(&self.instant)
    }
}

/// Convert to UTC and truncate to the minute, formatted `YYYY-MM-DD HH:mm`
pub fn normalize_work_time(instant: &DateTime<FixedOffset>) -> String {
    instant.with_timezone(&Utc).format(WORK_TIME_FORMAT).to_string()
}

/// Fetches authoritative time with bounded retry
pub struct TimeClient {
    source: Arc<dyn TimeSource>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl TimeClient {
    pub fn new(source: Arc<dyn TimeSource>, sleeper: Arc<dyn Sleeper>, policy: RetryPolicy) -> Self {
        Self {
            source,
            sleeper,
            policy,
        }
    }

    /// Client for the configured HTTP authority, sleeping on the tokio timer
    pub fn from_config(config: &TimeApiConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(WorldTimeApiSource::new(config)?),
            Arc::new(TokioSleeper),
            RetryPolicy::from(config),
        ))
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    async fn attempt(&self) -> Result<AuthoritativeTime> {
        let raw = self.source.fetch_datetime().await?;
        AuthoritativeTime::parse(&raw)
    }

    /// Fetch the current time, retrying until success or the attempt limit
    pub async fn fetch_current_time(&self) -> Result<AuthoritativeTime, TimeError> {
        let max_attempts = self.policy.max_attempts;

        for attempt in 1..=max_attempts {
            match self.attempt().await {
                Ok(time) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "Time authority answered after retrying");
                    }
                    return Ok(time);
                }
                Err(e) => {
                    tracing::warn!(attempt, max_attempts, error = %e, "Retrying time fetch");
                    if attempt < max_attempts {
                        self.sleeper.sleep(self.policy.delay).await;
                    }
                }
            }
        }

        tracing::error!(attempts = max_attempts, "Time authority unavailable, giving up");
        Err(TimeError::UpstreamUnavailable {
            attempts: max_attempts,
        })
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The stored form is always fixed-width, minute-precision UTC.
        #[test]
        fn normalized_form_is_fixed_width_utc(
            secs in 0i64..4_102_444_800,
            nanos in 0u32..1_000_000_000,
            offset_minutes in -720i32..=840,
        ) {
            let offset = FixedOffset::east_opt(offset_minutes * 60).unwrap();
            let utc = Utc.timestamp_opt(secs, nanos).unwrap();
            let local = utc.with_timezone(&offset);

            let formatted = normalize_work_time(&local);

            prop_assert_eq!(formatted.len(), 16);
            prop_assert!(crate::models::is_valid_work_time(&formatted));
            let expected = utc.with_second(0).unwrap().with_nanosecond(0).unwrap();
            prop_assert_eq!(formatted, expected.format(WORK_TIME_FORMAT).to_string());
        }
    }
}
