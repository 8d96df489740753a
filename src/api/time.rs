//! GET /time/germany - current time as reported by the time authority

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct CurrentTimeResponse {
    pub datetime: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/time/germany", get(current_time))
}

async fn current_time(State(state): State<AppState>) -> Result<Json<CurrentTimeResponse>, ApiError> {
    let time = state.time_client.fetch_current_time().await?;

    Ok(Json(CurrentTimeResponse {
        datetime: time.datetime,
    }))
}
