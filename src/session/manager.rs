use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::store::SessionStore;
use super::token::{ADMIN_ROLE, AdminClaims, decode_token, generate_token};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{AppError, AppResult};

pub const ADMIN_TOKEN_KEY: &str = "admin_token";
pub const ADMIN_EMAIL_KEY: &str = "admin_email";
pub const TOKEN_EXPIRY_KEY: &str = "token_expiry";

/// 当前有效的管理员会话
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub email: String,
    pub token: String,
    /// 毫秒时间戳
    pub expires_at: i64,
}

/// 管理员会话管理：签发、校验、刷新和注销
///
/// 会话以三个字符串条目保存在 [`SessionStore`] 中。任何一次校验失败
/// （字段缺失、过期、令牌无法解码、声明不匹配）都会清空这三个条目。
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    admin_username: String,
    admin_password: String,
    secret: String,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(config: &Config, store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            admin_username: config.admin_username.clone(),
            admin_password: config.admin_password.clone(),
            secret: config.jwt_secret.clone(),
            ttl: config.session_ttl(),
        }
    }

    pub fn login(&self, identifier: &str, credential: &str) -> AppResult<Session> {
        if self.admin_username.is_empty() || self.admin_password.is_empty() {
            tracing::error!("Admin login attempted but admin credentials are not configured");
            return Err(AppError::NotConfigured);
        }

        // 两项都比较完，不提前返回
        let username_ok = digest_eq(identifier, &self.admin_username);
        let password_ok = digest_eq(credential, &self.admin_password);
        if !(username_ok && password_ok) {
            return Err(AppError::InvalidCredentials);
        }

        let session = self.mint(identifier)?;
        tracing::info!("Admin session issued for {}", session.email);
        Ok(session)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    /// 返回当前有效会话；无效状态会被顺带清除
    pub fn current(&self) -> Option<Session> {
        match self.validate() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Session check failed: {}", e);
                self.logout();
                None
            }
        }
    }

    /// 已登录且提交的令牌与保存的令牌一致
    pub fn verify(&self, token: &str) -> bool {
        self.current()
            .is_some_and(|session| digest_eq(&session.token, token))
    }

    pub fn logout(&self) {
        for key in [ADMIN_TOKEN_KEY, ADMIN_EMAIL_KEY, TOKEN_EXPIRY_KEY] {
            if let Err(e) = self.store.remove(key) {
                tracing::error!("Failed to clear session entry {}: {}", key, e);
            }
        }
    }

    /// 延长当前会话；未登录时不做任何修改
    pub fn refresh(&self) -> bool {
        self.refresh_session().is_some()
    }

    pub fn refresh_session(&self) -> Option<Session> {
        let current = self.current()?;
        match self.mint(&current.email) {
            Ok(session) => {
                tracing::debug!("Admin session refreshed for {}", session.email);
                Some(session)
            }
            Err(e) => {
                tracing::error!("Failed to refresh admin session: {}", e);
                None
            }
        }
    }

    fn mint(&self, email: &str) -> AppResult<Session> {
        let now = self.clock.now_millis();
        // 超长有效期截断到 i64 上限
        let ttl = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now.saturating_add(ttl);
        let token = generate_token(&AdminClaims::admin(email, now, expires_at), &self.secret)?;

        self.store.set(ADMIN_TOKEN_KEY, &token)?;
        self.store.set(ADMIN_EMAIL_KEY, email)?;
        self.store.set(TOKEN_EXPIRY_KEY, &expires_at.to_string())?;

        Ok(Session {
            email: email.to_string(),
            token,
            expires_at,
        })
    }

    fn validate(&self) -> AppResult<Option<Session>> {
        let token = self.store.get(ADMIN_TOKEN_KEY)?;
        let email = self.store.get(ADMIN_EMAIL_KEY)?;
        let expiry = self.store.get(TOKEN_EXPIRY_KEY)?;

        let (token, email, expiry) = match (token, email, expiry) {
            (Some(t), Some(e), Some(x)) if !t.is_empty() && !e.is_empty() && !x.is_empty() => {
                (t, e, x)
            }
            (None, None, None) => return Ok(None),
            _ => {
                tracing::debug!("Partial session entries found, clearing");
                self.logout();
                return Ok(None);
            }
        };

        let Ok(expires_at) = expiry.trim().parse::<i64>() else {
            tracing::warn!("Unreadable session expiry, clearing session");
            self.logout();
            return Ok(None);
        };

        if self.clock.now_millis() > expires_at {
            tracing::info!("Admin session for {} expired", email);
            self.logout();
            return Ok(None);
        }

        let claims = match decode_token(&token, &self.secret) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!("Rejecting stored session token: {}", e);
                self.logout();
                return Ok(None);
            }
        };

        if claims.email != email || claims.role != ADMIN_ROLE {
            tracing::warn!("Session token claims do not match stored session, clearing");
            self.logout();
            return Ok(None);
        }

        Ok(Some(Session {
            email,
            token,
            expires_at,
        }))
    }
}

/// 比较两个字符串的 SHA-256 摘要，耗时与内容无关
fn digest_eq(a: &str, b: &str) -> bool {
    let a = Sha256::digest(a.as_bytes());
    let b = Sha256::digest(b.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
