use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub admin_username: String,
    pub admin_password: String,
    pub jwt_secret: String,
    pub session_ttl_secs: u64,
    pub session_file: Option<PathBuf>,
    pub login_max_attempts: u32,
    pub login_lockout_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        // 管理员凭据允许缺失，登录时再报告未配置
        let admin_username = env::var("ADMIN_USERNAME").unwrap_or_default();
        let admin_password = env::var("ADMIN_PASSWORD").unwrap_or_default();

        let session_ttl_secs = parse_var("SESSION_TTL", 24 * 3600, parse_hours)?;
        let login_lockout_secs = parse_var("LOGIN_LOCKOUT", 15 * 60, parse_minutes)?;

        Ok(Config {
            admin_username,
            admin_password,
            jwt_secret,
            session_ttl_secs,
            session_file: env::var("SESSION_FILE")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            login_max_attempts: parse_var("LOGIN_MAX_ATTEMPTS", 5, |v| v.parse().ok())?,
            login_lockout_secs,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "::".into()),
            server_port: parse_var("SERVER_PORT", 3000, |v| v.parse().ok())?,
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api".into()),
        })
    }

    /// 测试和嵌入场景使用的配置
    pub fn new(admin_username: &str, admin_password: &str, jwt_secret: &str) -> Self {
        Config {
            admin_username: admin_username.to_string(),
            admin_password: admin_password.to_string(),
            jwt_secret: jwt_secret.to_string(),
            session_ttl_secs: 24 * 3600,
            session_file: None,
            login_max_attempts: 5,
            login_lockout_secs: 15 * 60,
            server_host: "::".into(),
            server_port: 3000,
            api_base_uri: "/api".into(),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn login_lockout(&self) -> Duration {
        Duration::from_secs(self.login_lockout_secs)
    }
}

/// "24" 或 "24h"，换算成秒；溢出视为无效
fn parse_hours(value: &str) -> Option<u64> {
    value
        .trim_end_matches('h')
        .parse::<u64>()
        .ok()?
        .checked_mul(3600)
}

/// "15" 或 "15m"，换算成秒
fn parse_minutes(value: &str) -> Option<u64> {
    value
        .trim_end_matches('m')
        .parse::<u64>()
        .ok()?
        .checked_mul(60)
}

fn parse_var<T>(
    name: &'static str,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            parse(value.trim()).ok_or(ConfigError::Invalid { name, value })
        }
        _ => Ok(default),
    }
}
