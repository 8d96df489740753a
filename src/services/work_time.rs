//! Work-time service
//!
//! Records start/end stamps from the time authority and serves the
//! admin listing and editing operations.
//!
//! Every load-modify-persist sequence on the ledger runs under one
//! `tokio::sync::Mutex`. The time fetch happens before the lock is taken,
//! so a slow retry sequence never blocks other users' writes.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::db::repositories::WorkTimeRepository;
use crate::models::{is_valid_work_time, WorkTimeField, WorkTimeRecord};
use crate::services::time_client::{TimeClient, TimeError};

/// Error types for work-time operations
#[derive(Debug, thiserror::Error)]
pub enum WorkTimeServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("No work times found for user '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Upstream(#[from] TimeError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for the admin edit operation; both fields are required
#[derive(Debug, Clone, Default)]
pub struct EditWorkTimeInput {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

pub struct WorkTimeService {
    repo: Arc<dyn WorkTimeRepository>,
    time_client: Arc<TimeClient>,
    write_lock: Mutex<()>,
}

impl WorkTimeService {
    pub fn new(repo: Arc<dyn WorkTimeRepository>, time_client: Arc<TimeClient>) -> Self {
        Self {
            repo,
            time_client,
            write_lock: Mutex::new(()),
        }
    }

    /// Stamp the user's start time with the authority's current time
    pub async fn record_start(&self, username: &str) -> Result<String, WorkTimeServiceError> {
        self.record(username, WorkTimeField::Start).await
    }

    /// Stamp the user's end time with the authority's current time
    pub async fn record_end(&self, username: &str) -> Result<String, WorkTimeServiceError> {
        self.record(username, WorkTimeField::End).await
    }

    async fn record(&self, username: &str, field: WorkTimeField) -> Result<String, WorkTimeServiceError> {
        let stamp = self.time_client.fetch_current_time().await?.to_work_time();

        let _guard = self.write_lock.lock().await;
        let mut record = self.repo.get(username).await?.unwrap_or_default();
        field.apply(&mut record, stamp.clone());
        self.repo.put(username, &record).await?;

        tracing::info!(username, ?field, stamp = %stamp, "Work time recorded");
        Ok(stamp)
    }

    /// All records keyed by username
    pub async fn list_all(&self) -> Result<BTreeMap<String, WorkTimeRecord>, WorkTimeServiceError> {
        Ok(self.repo.list().await?)
    }

    /// Record for one username
    pub async fn get(&self, username: &str) -> Result<WorkTimeRecord, WorkTimeServiceError> {
        self.repo
            .get(username)
            .await?
            .ok_or_else(|| WorkTimeServiceError::NotFound(username.to_string()))
    }

    /// Replace both fields of an existing record.
    ///
    /// Input is validated before the ledger is touched; unknown usernames
    /// are not created.
    pub async fn edit(
        &self,
        username: &str,
        input: EditWorkTimeInput,
    ) -> Result<WorkTimeRecord, WorkTimeServiceError> {
        let (start_time, end_time) = match (input.start_time, input.end_time) {
            (Some(start), Some(end)) if !start.is_empty() && !end.is_empty() => (start, end),
            _ => {
                return Err(WorkTimeServiceError::ValidationError(
                    "Missing required fields: startTime, endTime".to_string(),
                ))
            }
        };
        for value in [&start_time, &end_time] {
            if !is_valid_work_time(value) {
                return Err(WorkTimeServiceError::ValidationError(format!(
                    "Invalid time '{}', expected YYYY-MM-DD HH:mm",
                    value
                )));
            }
        }

        let _guard = self.write_lock.lock().await;
        if !self.repo.has(username).await? {
            return Err(WorkTimeServiceError::NotFound(username.to_string()));
        }

        let record = WorkTimeRecord::new(start_time, end_time);
        self.repo.put(username, &record).await?;

        tracing::info!(username, "Work time edited");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::MemoryWorkTimeRepository;
    use crate::services::test_utils::{RecordingSleeper, ScriptedTimeSource};
    use crate::services::time_client::RetryPolicy;
    use std::time::Duration;

    struct Fixture {
        service: WorkTimeService,
        source: Arc<ScriptedTimeSource>,
        repo: Arc<MemoryWorkTimeRepository>,
    }

    fn fixture(source: ScriptedTimeSource, max_attempts: u32) -> Fixture {
        let source = Arc::new(source);
        let repo = Arc::new(MemoryWorkTimeRepository::new());
        let client = TimeClient::new(
            source.clone(),
            Arc::new(RecordingSleeper::default()),
            RetryPolicy::new(max_attempts, Duration::from_millis(1)),
        );
        Fixture {
            service: WorkTimeService::new(repo.clone(), Arc::new(client)),
            source,
            repo,
        }
    }

    fn edit_input(start: Option<&str>, end: Option<&str>) -> EditWorkTimeInput {
        EditWorkTimeInput {
            start_time: start.map(str::to_string),
            end_time: end.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_start_then_end_sets_both_fields() {
        let f = fixture(ScriptedTimeSource::always("2024-01-01T08:00:00Z"), 5);

        let start = f.service.record_start("alice").await.unwrap();
        f.source.set_datetime(Some("2024-01-01T16:30:10Z"));
        let end = f.service.record_end("alice").await.unwrap();

        assert_eq!(start, "2024-01-01 08:00");
        assert_eq!(end, "2024-01-01 16:30");
        assert_eq!(
            f.service.get("alice").await.unwrap(),
            WorkTimeRecord::new("2024-01-01 08:00", "2024-01-01 16:30")
        );
    }

    #[tokio::test]
    async fn test_end_first_creates_record_lazily() {
        let f = fixture(ScriptedTimeSource::always("2024-01-01T16:00:00Z"), 5);

        f.service.record_end("bob").await.unwrap();

        let record = f.service.get("bob").await.unwrap();
        assert_eq!(record.start_time, None);
        assert_eq!(record.end_time.as_deref(), Some("2024-01-01 16:00"));
    }

    #[tokio::test]
    async fn test_restart_overwrites_only_start() {
        let f = fixture(ScriptedTimeSource::always("2024-01-01T08:00:00Z"), 5);
        f.service.record_start("alice").await.unwrap();
        f.service.record_end("alice").await.unwrap();

        f.source.set_datetime(Some("2024-01-02T09:00:00Z"));
        f.service.record_start("alice").await.unwrap();

        // No ordering check between start and end
        let record = f.service.get("alice").await.unwrap();
        assert_eq!(record.start_time.as_deref(), Some("2024-01-02 09:00"));
        assert_eq!(record.end_time.as_deref(), Some("2024-01-01 08:00"));
    }

    #[tokio::test]
    async fn test_upstream_failure_records_nothing() {
        let f = fixture(ScriptedTimeSource::always_failing(), 3);

        let result = f.service.record_start("alice").await;

        assert!(matches!(
            result,
            Err(WorkTimeServiceError::Upstream(TimeError::UpstreamUnavailable { attempts: 3 }))
        ));
        assert!(!f.repo.has("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_users_do_not_lose_updates() {
        let f = fixture(ScriptedTimeSource::always("2024-01-01T08:00:00Z"), 5);
        let service = Arc::new(f.service);

        let tasks = (0..20).flat_map(|i| {
            let user = format!("user{}", i);
            let start = {
                let service = service.clone();
                let user = user.clone();
                tokio::spawn(async move { service.record_start(&user).await })
            };
            let end = {
                let service = service.clone();
                tokio::spawn(async move { service.record_end(&user).await })
            };
            [start, end]
        });
        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }

        let all = service.list_all().await.unwrap();
        assert_eq!(all.len(), 20);
        for record in all.values() {
            assert!(record.start_time.is_some() && record.end_time.is_some());
        }
    }

    #[tokio::test]
    async fn test_edit_existing_record() {
        let f = fixture(ScriptedTimeSource::always("2024-01-01T08:00:00Z"), 5);
        f.service.record_start("testuser").await.unwrap();

        let record = f
            .service
            .edit("testuser", edit_input(Some("2024-01-01 09:00"), Some("2024-01-01 17:00")))
            .await
            .unwrap();

        assert_eq!(record, WorkTimeRecord::new("2024-01-01 09:00", "2024-01-01 17:00"));
        assert_eq!(f.service.get("testuser").await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_edit_unknown_user_is_not_found() {
        let f = fixture(ScriptedTimeSource::always("2024-01-01T08:00:00Z"), 5);

        let result = f
            .service
            .edit("ghost", edit_input(Some("2024-01-01 09:00"), Some("2024-01-01 17:00")))
            .await;

        assert!(matches!(result, Err(WorkTimeServiceError::NotFound(_))));
        assert!(!f.repo.has("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_edit_validation_happens_before_any_write() {
        let f = fixture(ScriptedTimeSource::always("2024-01-01T08:00:00Z"), 5);
        f.service.record_start("testuser").await.unwrap();
        let before = f.service.get("testuser").await.unwrap();

        for input in [
            edit_input(Some("2024-01-01 09:00"), None),
            edit_input(None, Some("2024-01-01 17:00")),
            edit_input(Some(""), Some("2024-01-01 17:00")),
            edit_input(Some("09:00"), Some("2024-01-01 17:00")),
        ] {
            let result = f.service.edit("testuser", input).await;
            assert!(matches!(result, Err(WorkTimeServiceError::ValidationError(_))));
        }
        // Missing fields on an unknown user are still a validation error
        let result = f.service.edit("ghost", edit_input(None, None)).await;
        assert!(matches!(result, Err(WorkTimeServiceError::ValidationError(_))));

        assert_eq!(f.service.get("testuser").await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_get_unknown_user_is_not_found() {
        let f = fixture(ScriptedTimeSource::always("2024-01-01T08:00:00Z"), 5);
        assert!(matches!(f.service.get("nobody").await, Err(WorkTimeServiceError::NotFound(_))));
    }
}
