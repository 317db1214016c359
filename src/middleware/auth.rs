use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{AppState, error::AppError};

/// 管理员专用路由的守卫，通过后把当前会话放入请求扩展
pub async fn require_admin(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        tracing::debug!("Admin route {} called without bearer token", req.uri());
        return Err(AppError::Unauthorized);
    };

    let sessions = state.auth.sessions();
    if !sessions.verify(bearer.token()) {
        tracing::warn!("Rejected admin token on {}", req.uri());
        return Err(AppError::Unauthorized);
    }

    let session = sessions.current().ok_or(AppError::Unauthorized)?;
    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}
