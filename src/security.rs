use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const MAX_INPUT_LENGTH: usize = 10_000;

pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
script-src 'self' 'unsafe-inline'; \
style-src 'self' 'unsafe-inline'; \
img-src 'self' data: https:; \
font-src 'self'; \
connect-src 'self' https://*.supabase.co; \
frame-ancestors 'none'; \
base-uri 'self'; \
form-action 'self'";

const ALLOWED_URL_SCHEMES: [&str; 3] = ["http", "https", "mailto"];
const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";
const SEARCH_METACHARS: &str = ".*+?^${}()|[]\\";

/// 转义 HTML 特殊字符
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// 只保留 http、https、mailto 链接，其余返回空串
pub fn sanitize_url(raw: &str) -> String {
    match url::Url::parse(raw.trim()) {
        Ok(parsed) if ALLOWED_URL_SCHEMES.contains(&parsed.scheme()) => parsed.to_string(),
        _ => String::new(),
    }
}

pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// 返回所有未满足的密码强度规则，空表示通过
pub fn validate_password(password: &str) -> Vec<&'static str> {
    let mut errors = Vec::new();
    if password.chars().count() < 8 {
        errors.push("Password must be at least 8 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain at least one number");
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        errors.push("Password must contain at least one special character");
    }
    errors
}

/// 转义正则元字符，搜索词按字面匹配
pub fn escape_search_query(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for c in query.chars() {
        if SEARCH_METACHARS.contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Url,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Invalid input")]
    Empty,
    #[error("Input too long")]
    TooLong,
    #[error("Invalid URL")]
    InvalidUrl,
}

pub fn validate_user_input(input: &str, kind: InputKind) -> Result<String, InputError> {
    if input.is_empty() {
        return Err(InputError::Empty);
    }
    if input.chars().count() > MAX_INPUT_LENGTH {
        return Err(InputError::TooLong);
    }

    match kind {
        InputKind::Text => Ok(escape_html(input)),
        InputKind::Url => {
            let sanitized = sanitize_url(input);
            if sanitized.is_empty() {
                Err(InputError::InvalidUrl)
            } else {
                Ok(sanitized)
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostInput {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentInput {
    pub post_id: String,
    pub author_name: String,
    pub author_email: String,
    pub content: String,
}

fn len(s: &str) -> usize {
    s.chars().count()
}

fn finish(errors: BTreeMap<String, String>) -> AppResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

pub fn validate_post(post: &PostInput) -> AppResult<()> {
    let mut errors = BTreeMap::new();

    if len(post.title.trim()) < 3 {
        errors.insert("title".into(), "Title must be at least 3 characters long".into());
    } else if len(&post.title) > 200 {
        errors.insert("title".into(), "Title cannot exceed 200 characters".into());
    }
    if post.content.as_deref().is_some_and(|c| len(c) > 50_000) {
        errors.insert("content".into(), "Content cannot exceed 50,000 characters".into());
    }
    if post.excerpt.as_deref().is_some_and(|e| len(e) > 500) {
        errors.insert("excerpt".into(), "Excerpt cannot exceed 500 characters".into());
    }

    finish(errors)
}

pub fn validate_comment(comment: &CommentInput) -> AppResult<()> {
    let mut errors = BTreeMap::new();

    if comment.content.trim().is_empty() {
        errors.insert("content".into(), "Comment cannot be empty".into());
    } else if len(&comment.content) > 1000 {
        errors.insert("content".into(), "Comment cannot exceed 1,000 characters".into());
    }
    if len(comment.author_name.trim()) < 2 {
        errors.insert("author_name".into(), "Name must be at least 2 characters long".into());
    } else if len(&comment.author_name) > 50 {
        errors.insert("author_name".into(), "Name cannot exceed 50 characters".into());
    }
    if !is_valid_email(&comment.author_email) {
        errors.insert("author_email".into(), "Invalid email address".into());
    }

    finish(errors)
}
