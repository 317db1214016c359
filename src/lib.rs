use std::sync::Arc;

use auth::AdminAuth;
use clock::{Clock, SystemClock};
use config::Config;
use error::AppResult;
use limiter::{AttemptLimiter, OperationRateLimiter, SlidingWindowLimiter};
use session::{FileStore, MemoryStore, SessionManager, SessionStore};

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod limiter;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod session;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub auth: Arc<AdminAuth>,
    pub limiter: OperationRateLimiter,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        let sessions = SessionManager::new(&config, store, clock.clone());
        let attempts = AttemptLimiter::new(
            clock.clone(),
            config.login_max_attempts,
            config.login_lockout(),
        );
        let limiter = OperationRateLimiter::new(Arc::new(SlidingWindowLimiter::new(clock)));

        Self {
            config,
            auth: Arc::new(AdminAuth::new(Arc::new(sessions), Arc::new(attempts))),
            limiter,
        }
    }

    /// 按配置选择会话存储，使用系统时钟
    pub fn from_config(config: Config) -> AppResult<Self> {
        let store: Arc<dyn SessionStore> = match &config.session_file {
            Some(path) => {
                tracing::info!("Persisting admin session to {}", path.display());
                Arc::new(FileStore::open(path)?)
            }
            None => Arc::new(MemoryStore::new()),
        };
        Ok(Self::new(config, store, Arc::new(SystemClock)))
    }
}
