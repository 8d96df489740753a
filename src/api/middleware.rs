//! API middleware
//!
//! Contains middleware for:
//! - Authentication (bearer token validation against the revocation ledger)
//! - Authorization (admin-only routes)
//!
//! and the JSON error type every handler returns.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::Identity;
use crate::services::{AuthError, AuthService, TimeClient, TimeError, WorkTimeService, WorkTimeServiceError};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub work_time_service: Arc<WorkTimeService>,
    pub time_client: Arc<TimeClient>,
}

/// Authenticated identity extracted from the request's token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

/// The raw bearer token the request was admitted with
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn missing_token() -> Self {
        Self::new("MISSING_TOKEN", "Access token missing")
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn upstream_unavailable() -> Self {
        Self::new(
            "UPSTREAM_UNAVAILABLE",
            "Failed to fetch current time in Germany after retries",
        )
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "MISSING_TOKEN" | "INVALID_CREDENTIALS" => StatusCode::UNAUTHORIZED,
            "TOKEN_REVOKED" | "INVALID_TOKEN" | "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => ApiError::missing_token(),
            AuthError::Revoked => ApiError::new("TOKEN_REVOKED", "Token has been revoked"),
            AuthError::InvalidOrExpired => ApiError::new("INVALID_TOKEN", "Invalid or expired token"),
            AuthError::Forbidden => ApiError::forbidden("Forbidden: Admin access only"),
            AuthError::InvalidCredentials => ApiError::new("INVALID_CREDENTIALS", "Invalid credentials"),
            AuthError::Internal(e) => {
                tracing::error!("Authentication backend failure: {:#}", e);
                ApiError::internal_error()
            }
        }
    }
}

impl From<TimeError> for ApiError {
    fn from(_: TimeError) -> Self {
        ApiError::upstream_unavailable()
    }
}

impl From<WorkTimeServiceError> for ApiError {
    fn from(err: WorkTimeServiceError) -> Self {
        match err {
            WorkTimeServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            WorkTimeServiceError::NotFound(_) => ApiError::not_found("No work times found for this user"),
            WorkTimeServiceError::Upstream(e) => e.into(),
            WorkTimeServiceError::InternalError(e) => {
                tracing::error!("Work-time storage failure: {:#}", e);
                ApiError::internal_error()
            }
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
fn extract_bearer_token(request: &Request) -> Option<String> {
    let auth_str = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Authentication middleware
///
/// Rejects with 401 when no bearer token is present and with 403 when the
/// token is revoked, badly signed or expired. On success the identity and
/// the raw token are attached to the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&request).ok_or_else(ApiError::missing_token)?;

    let identity = state.auth_service.authenticate(&token).await.map_err(|e| {
        tracing::debug!(path = %request.uri().path(), "Rejected request: {}", e);
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(AuthenticatedUser(identity));
    request.extensions_mut().insert(BearerToken(token));
    Ok(next.run(request).await)
}

/// Admin authorization middleware, layered inside `require_auth`
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(ApiError::missing_token)?;

    AuthService::require_admin(&user.0)?;

    Ok(next.run(request).await)
}
