//! Application state shared across handlers

use std::{env, sync::Arc};

use common::{config::CorsConfig, jwt::JwtService};
use sqlx::PgPool;

use crate::{
    clock::Clock,
    generator::TextGenerator,
    repositories::{StudyItemRepository, UserRepository},
};

/// Upload limit for `POST /pdf/summarize`
pub const DEFAULT_PDF_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_service: JwtService,
    pub study_item_repository: StudyItemRepository,
    pub user_repository: UserRepository,
    /// `None` when no generator is configured; the assistant routes answer 503
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub clock: Arc<dyn Clock>,
    pub pdf_max_bytes: usize,
    pub cors: CorsConfig,
}

/// Read `PDF_MAX_BYTES`, falling back to 10 MiB
pub fn pdf_max_bytes_from_env() -> usize {
    env::var("PDF_MAX_BYTES")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|bytes| *bytes > 0)
        .unwrap_or(DEFAULT_PDF_MAX_BYTES)
}
