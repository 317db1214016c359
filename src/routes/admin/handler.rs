use axum::extract::{Extension, Json, State};

use crate::{
    AppState,
    error::{AppError, AppResult},
    limiter::Operation,
    middleware::ClientIp,
    session::Session,
    utils::{ApiResponse, success_to_api_response},
};

use super::model::{
    LoginRequest, LoginResponse, RefreshTokenResponse, SessionResponse, StatusResponse,
};

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let session = state.limiter.guarded(Operation::Login, &ip, || {
        state.auth.login(&req.identifier, &req.password)
    })?;

    Ok(success_to_api_response(LoginResponse {
        email: session.email,
        token: session.token,
        expires_at: session.expires_at,
    }))
}

#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>) -> Json<ApiResponse<StatusResponse>> {
    state.auth.logout();
    success_to_api_response(StatusResponse {
        authenticated: false,
    })
}

#[axum::debug_handler]
pub async fn status(State(state): State<AppState>) -> Json<ApiResponse<StatusResponse>> {
    success_to_api_response(StatusResponse {
        authenticated: state.auth.sessions().is_authenticated(),
    })
}

#[axum::debug_handler]
pub async fn refresh_token(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<RefreshTokenResponse>>> {
    let session = state
        .auth
        .sessions()
        .refresh_session()
        .ok_or(AppError::Unauthorized)?;

    Ok(success_to_api_response(RefreshTokenResponse {
        token: session.token,
        expires_at: session.expires_at,
    }))
}

#[axum::debug_handler]
pub async fn current_session(
    Extension(session): Extension<Session>,
) -> Json<ApiResponse<SessionResponse>> {
    success_to_api_response(SessionResponse {
        email: session.email,
        expires_at: session.expires_at,
    })
}
