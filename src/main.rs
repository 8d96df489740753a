//! Timekeeper - work-time tracking service

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use timekeeper::{
    api::{self, AppState},
    config::{Config, StorageDriver},
    db::{
        self,
        repositories::{
            MemoryRevocationRepository, MemoryWorkTimeRepository, RevocationRepository,
            SqlxRevocationRepository, SqlxWorkTimeRepository, WorkTimeRepository,
        },
    },
    services::{AuthService, StaticCredentialStore, TimeClient, TokenIssuer, WorkTimeService},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "timekeeper=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Timekeeper...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    config.validate()?;
    tracing::info!("Configuration loaded");

    // Ledgers
    let (revocations, work_times): (Arc<dyn RevocationRepository>, Arc<dyn WorkTimeRepository>) =
        match config.storage.driver {
            StorageDriver::Memory => {
                tracing::warn!("Using in-memory storage; revocations and work times are lost on restart");
                (MemoryRevocationRepository::boxed(), MemoryWorkTimeRepository::boxed())
            }
            StorageDriver::Sqlite => {
                let pool = db::create_pool(&config.storage).await?;
                db::ping(&pool).await?;
                tracing::info!("Database connected: {}", config.storage.url);

                let applied = db::migrations::run_migrations(&pool).await?;
                tracing::info!("Database migrations completed ({} applied)", applied);

                (
                    SqlxRevocationRepository::boxed(pool.clone()),
                    SqlxWorkTimeRepository::boxed(pool),
                )
            }
        };

    // Credentials and token signing
    let credentials = StaticCredentialStore::load(&config.auth.credentials_path)?;
    tracing::info!(
        "Loaded {} credential(s) from {}",
        credentials.len(),
        config.auth.credentials_path.display()
    );
    let secret = config
        .auth
        .jwt_secret
        .as_deref()
        .context("auth.jwt_secret is not set")?;
    let issuer = TokenIssuer::new(secret, config.auth.token_ttl_seconds);

    // Time authority
    let time_client = Arc::new(TimeClient::from_config(&config.time_api)?);
    tracing::info!(
        "Time authority: {} (max {} attempts, {} ms apart)",
        config.time_api.url,
        config.time_api.max_attempts,
        config.time_api.retry_delay_ms
    );

    // Build application state
    let state = AppState {
        auth_service: Arc::new(AuthService::new(
            credentials.boxed(),
            issuer,
            revocations,
            config.auth.admin_username.clone(),
        )),
        work_time_service: Arc::new(WorkTimeService::new(work_times, time_client.clone())),
        time_client,
    };

    // Build router
    let app = api::build_router(state, &config.server.cors_origin)?;

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
