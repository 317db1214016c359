use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::window::SlidingWindowLimiter;
use crate::error::{AppError, AppResult};

/// 受限流保护的操作及其默认配额
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Login,
    PostCreate,
    PostUpdate,
    Search,
    General,
    CommentCreate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub max_requests: usize,
    pub window: Duration,
}

const MINUTE: Duration = Duration::from_secs(60);

impl Operation {
    pub fn limit(self) -> Limit {
        let (max_requests, window) = match self {
            Operation::Login => (5, MINUTE * 15),
            Operation::PostCreate => (10, MINUTE * 60),
            Operation::PostUpdate => (20, MINUTE * 60),
            Operation::Search => (100, MINUTE),
            Operation::General => (1000, MINUTE),
            Operation::CommentCreate => (5, MINUTE * 5),
        };
        Limit {
            max_requests,
            window,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Login => "login",
            Operation::PostCreate => "post_create",
            Operation::PostUpdate => "post_update",
            Operation::Search => "search",
            Operation::General => "general",
            Operation::CommentCreate => "comment_create",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 按操作名加标识限流，键为 `{operation}:{identifier}`
#[derive(Clone)]
pub struct OperationRateLimiter {
    window: Arc<SlidingWindowLimiter>,
}

impl OperationRateLimiter {
    pub fn new(window: Arc<SlidingWindowLimiter>) -> Self {
        Self { window }
    }

    fn key(operation: Operation, identifier: &str) -> String {
        format!("{}:{}", operation, identifier)
    }

    pub fn check(&self, operation: Operation, identifier: &str) -> bool {
        let limit = operation.limit();
        self.window.is_allowed(
            &Self::key(operation, identifier),
            limit.max_requests,
            limit.window,
        )
    }

    pub fn remaining_time(&self, operation: Operation, identifier: &str) -> Duration {
        self.window
            .remaining_time(&Self::key(operation, identifier), operation.limit().window)
    }

    pub fn clear(&self, operation: Operation, identifier: &str) {
        self.window.clear(&Self::key(operation, identifier));
    }

    /// 超限时返回 `RateLimited`，否则执行 `f`
    pub fn guarded<T>(
        &self,
        operation: Operation,
        identifier: &str,
        f: impl FnOnce() -> AppResult<T>,
    ) -> AppResult<T> {
        if !self.check(operation, identifier) {
            let retry_after = self.remaining_time(operation, identifier);
            tracing::warn!(
                "Rate limit hit for {} by {}, retry in {:?}",
                operation,
                identifier,
                retry_after
            );
            return Err(AppError::RateLimited { retry_after });
        }
        f()
    }
}
