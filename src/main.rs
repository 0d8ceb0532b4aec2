//! Quiz backend - server entrypoint

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quiz_backend::{
    api::{self, AppState},
    config::Config,
    db,
    services::{OAuthIdentityProvider, TokenSigner},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quiz_backend=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting quiz backend...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    if config.uses_dev_secret() {
        tracing::warn!("Using the built-in development token secret; set QUIZ_AUTH_TOKEN_SECRET");
    }
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Identity provider and token signing
    let identity = OAuthIdentityProvider::new(config.identity.clone())
        .context("Failed to build identity provider client")?;
    let signer = TokenSigner::from_config(&config.auth);

    // Build application state and router
    let state = AppState::new(pool, Arc::new(identity), signer);
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
