//! Authentication API endpoints
//!
//! - POST /login - Exchange credentials for a bearer token
//! - POST /logout - Revoke the bearer token the request was made with

use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, BearerToken};

/// Request body for login. Absent fields fail as bad credentials.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/logout", post(logout))
}

/// POST /login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = state.auth_service.login(&body.username, &body.password).await?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token: outcome.token,
        is_admin: outcome.identity.is_admin,
    }))
}

/// POST /logout
async fn logout(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth_service.logout(&token).await?;

    Ok(Json(MessageResponse {
        message: "Logout successful".to_string(),
    }))
}
