use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod middleware;
mod models;
mod rate_limiter;
mod repositories;
mod routes;
mod session;
mod validation;

use common::{
    cache::{RedisConfig, RedisPool},
    config::{CorsConfig, ServerConfig},
    database::{self, DatabaseConfig},
    jwt::{JwtConfig, JwtService},
};
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::{
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::UserRepository,
    session::SessionManager,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_service: JwtService,
    pub user_repository: UserRepository,
    pub session_manager: SessionManager,
    pub rate_limiter: RateLimiter,
    pub cors: CorsConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting authentication service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    // Check database connectivity
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    database::run_migrations(&pool).await?;

    // Initialize JWT service
    let jwt_service = JwtService::new(JwtConfig::from_env()?)?;

    // Initialize Redis connection pool
    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;

    let app_state = AppState {
        user_repository: UserRepository::new(pool.clone()),
        db_pool: pool,
        jwt_service,
        session_manager: SessionManager::new(redis_pool),
        rate_limiter: RateLimiter::new(RateLimiterConfig::from_env()),
        cors: CorsConfig::from_env(),
    };

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let server_config = ServerConfig::from_env("AUTH", 3000)?;
    let listener = TcpListener::bind(server_config.bind_address()).await?;
    info!(
        "Authentication service listening on {}",
        server_config.bind_address()
    );

    axum::serve(listener, app).await?;

    Ok(())
}
