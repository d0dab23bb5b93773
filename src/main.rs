use std::sync::Arc;

use anyhow::Context;
use fittrack::core::auth::{AuthService, PasswordHasher, TokenService, api_router};
use fittrack::core::config::Config;
use fittrack::core::db::{MemoryUserStore, UserRepository, UserStore, create_pool_with_migrations};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load application config from environment variables
    let config = Config::from_env().context("invalid configuration")?;

    // Log config status (without revealing secrets)
    tracing::info!(
        "Config loaded: database={}, jwt_secret={}, bind_addr={}, request_timeout={:?}",
        config.has_database(),
        config.has_jwt_secret(),
        config.bind_addr,
        config.request_timeout
    );

    let jwt_config = config
        .jwt
        .clone()
        .context("token signing is not configured: JWT_SECRET not set")?;

    let store: Arc<dyn UserStore> = match &config.database {
        Some(db_config) => {
            let pool = create_pool_with_migrations(db_config)
                .await
                .context("failed to initialize database")?;
            Arc::new(UserRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, users are kept in memory and lost on restart");
            Arc::new(MemoryUserStore::new())
        }
    };

    let hasher = PasswordHasher::new(config.bcrypt_cost);
    if hasher.cost() != config.bcrypt_cost {
        tracing::warn!(
            "BCRYPT_COST {} is out of range, using {}",
            config.bcrypt_cost,
            hasher.cost()
        );
    }

    let service = AuthService::new(store, TokenService::new(jwt_config), hasher);
    let app = api_router(service, config.request_timeout);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
