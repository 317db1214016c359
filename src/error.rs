use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::utils::{error_codes, error_to_api_response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Admin credentials not configured")]
    NotConfigured,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Too many failed attempts. Please try again in {} minutes.", retry_minutes(.retry_after))]
    LockedOut { retry_after: Duration },
    #[error("Rate limit exceeded. Please try again in {} minutes.", retry_minutes(.retry_after))]
    RateLimited { retry_after: Duration },
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Validation errors: {}", join_errors(.0))]
    Validation(BTreeMap<String, String>),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("session storage error: {0}")]
    Storage(String),
}

pub type AppResult<T> = Result<T, AppError>;

/// 向上取整到分钟，用于提示剩余等待时间
pub fn minutes_ceil(d: Duration) -> u64 {
    d.as_millis().div_ceil(60_000) as u64
}

fn retry_minutes(d: &Duration) -> u64 {
    minutes_ceil(*d)
}

fn join_errors(errors: &BTreeMap<String, String>) -> String {
    errors.values().cloned().collect::<Vec<_>>().join(", ")
}

impl AppError {
    pub fn code(&self) -> i32 {
        match self {
            AppError::NotConfigured => error_codes::CONFIG_ERROR,
            AppError::InvalidCredentials => error_codes::AUTH_FAILED,
            AppError::LockedOut { .. } | AppError::RateLimited { .. } => error_codes::RATE_LIMIT,
            AppError::Unauthorized => error_codes::PERMISSION_DENIED,
            AppError::Validation(_) => error_codes::VALIDATION_ERROR,
            AppError::Token(_) | AppError::Storage(_) => {
                error_codes::INTERNAL_ERROR
            }
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Token(_) | AppError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            // 业务错误沿用 200 + 错误码的约定
            _ => StatusCode::OK,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(errors) => {
                let mut body = error_to_api_response(self.code(), self.to_string());
                body.0.resp_data = Some(serde_json::json!({ "errors": errors }));
                body
            }
            _ => error_to_api_response::<serde_json::Value>(self.code(), self.to_string()),
        };

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lockout_message_rounds_minutes_up() {
        let err = AppError::LockedOut {
            retry_after: Duration::from_secs(14 * 60 + 1),
        };
        assert_eq!(
            err.to_string(),
            "Too many failed attempts. Please try again in 15 minutes."
        );
        assert_eq!(err.code(), error_codes::RATE_LIMIT);
    }

    #[test]
    fn minutes_ceil_handles_exact_and_zero() {
        assert_eq!(minutes_ceil(Duration::ZERO), 0);
        assert_eq!(minutes_ceil(Duration::from_secs(60)), 1);
        assert_eq!(minutes_ceil(Duration::from_millis(60_001)), 2);
    }

    #[test]
    fn validation_message_lists_field_errors() {
        let mut errors = BTreeMap::new();
        errors.insert("content".to_string(), "Comment cannot be empty".to_string());
        errors.insert("author_name".to_string(), "Name must be at least 2 characters long".to_string());
        let err = AppError::Validation(errors);
        assert_eq!(
            err.to_string(),
            "Validation errors: Name must be at least 2 characters long, Comment cannot be empty"
        );
    }
}
