//! Fakes for the time client's injected dependencies

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::services::time_client::{Sleeper, TimeSource};

/// Time source that fails a fixed number of times, then answers with a
/// settable datetime. With no datetime it fails forever.
pub struct ScriptedTimeSource {
    failures_before_success: u32,
    datetime: Mutex<Option<String>>,
    calls: AtomicU32,
}

impl ScriptedTimeSource {
    pub fn fail_then_succeed(failures: u32, datetime: &str) -> Self {
        Self {
            failures_before_success: failures,
            datetime: Mutex::new(Some(datetime.to_string())),
            calls: AtomicU32::new(0),
        }
    }

    pub fn always(datetime: &str) -> Self {
        Self::fail_then_succeed(0, datetime)
    }

    pub fn always_failing() -> Self {
        Self {
            failures_before_success: 0,
            datetime: Mutex::new(None),
            calls: AtomicU32::new(0),
        }
    }

    /// Change the answer (`None` makes every later call fail)
    pub fn set_datetime(&self, datetime: Option<&str>) {
        *self.datetime.lock().unwrap() = datetime.map(str::to_string);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TimeSource for ScriptedTimeSource {
    async fn fetch_datetime(&self) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures_before_success {
            return Err(anyhow!("scripted failure {}", call));
        }
        self.datetime
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("upstream down"))
    }
}

/// Sleeper that returns immediately and remembers what it was asked
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
