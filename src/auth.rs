use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::limiter::AttemptLimiter;
use crate::session::{Session, SessionManager};

/// 管理员登录流程：先查锁定状态，再校验凭据，最后记录结果
pub struct AdminAuth {
    sessions: Arc<SessionManager>,
    attempts: Arc<AttemptLimiter>,
}

impl AdminAuth {
    pub fn new(sessions: Arc<SessionManager>, attempts: Arc<AttemptLimiter>) -> Self {
        Self { sessions, attempts }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn attempts(&self) -> &AttemptLimiter {
        &self.attempts
    }

    pub fn login(&self, identifier: &str, password: &str) -> AppResult<Session> {
        if self.attempts.is_blocked(identifier) {
            let retry_after = self.attempts.remaining_time(identifier);
            tracing::warn!("Login for {} refused, locked out", identifier);
            return Err(AppError::LockedOut { retry_after });
        }

        match self.sessions.login(identifier, password) {
            Ok(session) => {
                self.attempts.record_attempt(identifier, true);
                Ok(session)
            }
            Err(e @ (AppError::InvalidCredentials | AppError::NotConfigured)) => {
                tracing::warn!("Admin login failed for {}: {}", identifier, e);
                self.attempts.record_attempt(identifier, false);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub fn logout(&self) {
        self.sessions.logout();
        tracing::info!("Admin logged out");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::config::Config;
    use crate::limiter::LOCKOUT_WINDOW;
    use crate::session::MemoryStore;

    fn auth() -> (AdminAuth, ManualClock) {
        let clock = ManualClock::new(1_700_000_000_000);
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        let config = Config::new("yd1ng", "s3cret!", "test-secret");
        let sessions = SessionManager::new(&config, Arc::new(MemoryStore::new()), shared.clone());
        let attempts = AttemptLimiter::with_defaults(shared);
        (AdminAuth::new(Arc::new(sessions), Arc::new(attempts)), clock)
    }

    #[test]
    fn lockout_refuses_even_correct_credentials() {
        let (auth, clock) = auth();
        for _ in 0..5 {
            assert!(matches!(
                auth.login("yd1ng", "nope"),
                Err(AppError::InvalidCredentials)
            ));
            clock.advance(Duration::from_secs(5));
        }

        match auth.login("yd1ng", "s3cret!") {
            Err(AppError::LockedOut { retry_after }) => {
                assert!(retry_after > Duration::ZERO && retry_after <= LOCKOUT_WINDOW);
            }
            other => panic!("expected lockout, got {:?}", other),
        }
        assert!(!auth.sessions().is_authenticated());

        clock.advance(LOCKOUT_WINDOW);
        assert!(auth.login("yd1ng", "s3cret!").is_ok());
        assert!(auth.sessions().is_authenticated());
    }

    #[test]
    fn success_clears_failure_count() {
        let (auth, _) = auth();
        for _ in 0..4 {
            let _ = auth.login("yd1ng", "nope");
        }
        auth.login("yd1ng", "s3cret!").unwrap();
        auth.logout();
        assert!(!auth.sessions().is_authenticated());

        let _ = auth.login("yd1ng", "nope");
        assert!(!auth.attempts().is_blocked("yd1ng"));
    }
}
