use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminClaims {
    pub email: String,
    pub role: String,
    pub iat: i64, // 签发时间（秒）
    pub exp: i64, // 过期时间（秒）
}

impl AdminClaims {
    pub fn admin(email: &str, issued_at_millis: i64, expires_at_millis: i64) -> Self {
        Self {
            email: email.to_string(),
            role: ADMIN_ROLE.to_string(),
            iat: issued_at_millis / 1000,
            exp: expires_at_millis / 1000,
        }
    }
}

pub fn generate_token(
    claims: &AdminClaims,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    tracing::debug!("Generating session token for: {}", claims.email);
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// 只校验签名；过期由会话中保存的到期时间判断
pub fn decode_token(
    token: &str,
    secret: &str,
) -> Result<AdminClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}
