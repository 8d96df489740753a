//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP endpoints of the Timekeeper service:
//! - Time authority passthrough
//! - Login / logout
//! - Work-time recording, listing and editing
//! - Health check

pub mod auth;
pub mod middleware;
pub mod time;
pub mod work_time;


use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use middleware::{ApiError, AppState, AuthenticatedUser, BearerToken};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .merge(work_time::admin_router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need any valid token)
    let protected_routes = Router::new()
        .merge(auth::protected_router())
        .merge(work_time::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    let public_routes = Router::new()
        .route("/health", get(health))
        .merge(auth::public_router())
        .merge(time::router());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
}

/// Build the complete application router with CORS and request tracing
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    let cors = if cors_origin == "*" {
        cors.allow_origin(Any)
    } else {
        let origin = cors_origin
            .parse::<HeaderValue>()
            .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;
        cors.allow_origin(origin)
    };

    Ok(build_api_router(state.clone())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
