use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod clock;
mod error;
mod generator;
mod middleware;
mod models;
mod repositories;
mod routes;
mod state;

use common::{
    config::{CorsConfig, ServerConfig},
    database::{self, DatabaseConfig},
    jwt::{JwtConfig, JwtService},
};
use tokio::net::TcpListener;

use crate::{
    clock::SystemClock,
    generator::{GeminiClient, GeminiConfig, TextGenerator},
    repositories::{StudyItemRepository, UserRepository},
    state::{AppState, pdf_max_bytes_from_env},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting API service");

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

    // Tokens are issued by the auth service; only verification happens here
    let jwt_service = JwtService::new(JwtConfig::from_env()?)?;

    let generator: Option<Arc<dyn TextGenerator>> = match GeminiConfig::from_env() {
        Some(config) => Some(Arc::new(GeminiClient::new(config)?)),
        None => {
            warn!("GEMINI_API_KEY not set, assistant endpoints are disabled");
            None
        }
    };

    let app_state = AppState {
        study_item_repository: StudyItemRepository::new(pool.clone()),
        user_repository: UserRepository::new(pool.clone()),
        db_pool: pool,
        jwt_service,
        generator,
        clock: Arc::new(SystemClock),
        pdf_max_bytes: pdf_max_bytes_from_env(),
        cors: CorsConfig::from_env(),
    };

    info!("API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let server_config = ServerConfig::from_env("API", 3001)?;
    let listener = TcpListener::bind(server_config.bind_address()).await?;
    info!("API service listening on {}", server_config.bind_address());

    axum::serve(listener, app).await?;

    Ok(())
}
