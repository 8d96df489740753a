//! Work-time record model

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Fixed-width format of every stored start/end time
pub const WORK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Start/end stamps of one user's work session.
///
/// Both fields are written independently, so either may be missing
/// until the corresponding endpoint has been called once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkTimeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl WorkTimeRecord {
    pub fn new(start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self {
            start_time: Some(start_time.into()),
            end_time: Some(end_time.into()),
        }
    }
}

/// Which side of a work session is being stamped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkTimeField {
    Start,
    End,
}

impl WorkTimeField {
    /// Overwrite this field of `record` with `value`
    pub fn apply(self, record: &mut WorkTimeRecord, value: String) {
        match self {
            WorkTimeField::Start => record.start_time = Some(value),
            WorkTimeField::End => record.end_time = Some(value),
        }
    }
}

/// Check that `value` is a `YYYY-MM-DD HH:mm` stamp
pub fn is_valid_work_time(value: &str) -> bool {
    value.len() == 16 && NaiveDateTime::parse_from_str(value, WORK_TIME_FORMAT).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_are_omitted_from_json() {
        let record = WorkTimeRecord {
            start_time: Some("2024-01-01 09:00".to_string()),
            end_time: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"startTime": "2024-01-01 09:00"}));

        let empty = serde_json::to_value(WorkTimeRecord::default()).unwrap();
        assert_eq!(empty, serde_json::json!({}));
    }

    #[test]
    fn test_field_apply_leaves_other_side_untouched() {
        let mut record = WorkTimeRecord::new("2024-01-01 09:00", "2024-01-01 17:00");
        WorkTimeField::End.apply(&mut record, "2024-01-01 18:30".to_string());
        assert_eq!(record.start_time.as_deref(), Some("2024-01-01 09:00"));
        assert_eq!(record.end_time.as_deref(), Some("2024-01-01 18:30"));
    }

    #[test]
    fn test_work_time_format_validation() {
        assert!(is_valid_work_time("2024-01-01 09:00"));
        assert!(is_valid_work_time("2024-12-31 23:59"));
        assert!(!is_valid_work_time("2024-01-01T09:00"));
        assert!(!is_valid_work_time("2024-01-01 9:00"));
        assert!(!is_valid_work_time("2024-01-01 09:00:00"));
        assert!(!is_valid_work_time("2024-13-01 09:00"));
        assert!(!is_valid_work_time(""));
    }
}
