use crate::{
    config::Config,
    database::DbPool,
    error::Result,
    middleware::rate_limit::RateLimiter,
    services::{
        ai_tips::{self, TipsGenerator},
        email::{self, EmailSender},
        storage::{self, ImageStorage},
    },
};
use std::sync::Arc;

/// Application state shared across all HTTP handlers
///
/// Holds the database pool, the loaded configuration and the outbound
/// integrations (mail, image storage, tips generator) behind trait objects,
/// so tests can swap them without touching handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub pool: DbPool,
    pub config: Arc<Config>,
    /// Transactional mail transport (HTTP API or log-only)
    pub mailer: Arc<dyn EmailSender>,
    /// Image and document storage (Cloudinary or disabled)
    pub storage: Arc<dyn ImageStorage>,
    pub tips: Arc<dyn TipsGenerator>,
    /// Per-IP request budget for `/api`
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Builds the state and every integration from configuration
    pub fn new(pool: DbPool, config: Config) -> Result<Self> {
        let mailer = email::build_sender(&config.email)?;
        let storage = storage::build_storage(&config.cloudinary)?;
        let tips = ai_tips::build_generator(&config.ai);
        let rate_limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));

        Ok(Self {
            pool,
            config: Arc::new(config),
            mailer,
            storage,
            tips,
            rate_limiter,
        })
    }
}
