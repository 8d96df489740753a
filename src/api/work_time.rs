//! Work-time API endpoints
//!
//! Protected:
//! - POST /work-time/start - Stamp the caller's start time
//! - POST /work-time/end - Stamp the caller's end time
//! - GET /work-time/{username} - One user's record
//!
//! Admin only:
//! - GET /work-time/all - Every record
//! - PUT /work-time/edit/{username} - Replace an existing record

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::WorkTimeRecord;
use crate::services::{EditWorkTimeInput, WorkTimeServiceError};

/// Envelope for successful work-time responses
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T> DataResponse<T> {
    fn new(message: &str, data: T) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
            data,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTimeData {
    pub username: String,
    pub start_time: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndTimeData {
    pub username: String,
    pub end_time: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditedWorkTimeData {
    pub username: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// Request body for the admin edit
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditWorkTimeRequest {
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

impl From<EditWorkTimeRequest> for EditWorkTimeInput {
    fn from(req: EditWorkTimeRequest) -> Self {
        Self {
            start_time: req.start_time,
            end_time: req.end_time,
        }
    }
}

/// Routes for any authenticated user
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/work-time/start", post(record_start))
        .route("/work-time/end", post(record_end))
        .route("/work-time/{username}", get(get_work_time))
}

/// Routes for the admin only
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/work-time/all", get(list_work_times))
        .route("/work-time/edit/{username}", put(edit_work_time))
}

/// POST /work-time/start
async fn record_start(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<DataResponse<StartTimeData>>, ApiError> {
    let username = user.0.username;
    let start_time = state.work_time_service.record_start(&username).await?;

    Ok(DataResponse::new(
        "Start time set successfully",
        StartTimeData { username, start_time },
    ))
}

/// POST /work-time/end
async fn record_end(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<DataResponse<EndTimeData>>, ApiError> {
    let username = user.0.username;
    let end_time = state.work_time_service.record_end(&username).await?;

    Ok(DataResponse::new(
        "End time set successfully",
        EndTimeData { username, end_time },
    ))
}

/// GET /work-time/all
async fn list_work_times(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<BTreeMap<String, WorkTimeRecord>>>, ApiError> {
    let all = state.work_time_service.list_all().await?;
    Ok(DataResponse::new("Work times fetched successfully", all))
}

/// PUT /work-time/edit/{username}
async fn edit_work_time(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(body): Json<EditWorkTimeRequest>,
) -> Result<Json<DataResponse<EditedWorkTimeData>>, ApiError> {
    let record = state
        .work_time_service
        .edit(&username, body.into())
        .await
        .map_err(|e| match e {
            WorkTimeServiceError::NotFound(_) => ApiError::not_found("User not found"),
            other => other.into(),
        })?;

    Ok(DataResponse::new(
        "Work time updated successfully",
        EditedWorkTimeData {
            username,
            start_time: record.start_time,
            end_time: record.end_time,
        },
    ))
}

/// GET /work-time/{username}
async fn get_work_time(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<DataResponse<WorkTimeRecord>>, ApiError> {
    let record = state.work_time_service.get(&username).await?;
    Ok(DataResponse::new("Work times fetched successfully", record))
}
