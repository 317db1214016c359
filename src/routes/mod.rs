use axum::{
    Router,
    http::{HeaderValue, header},
    routing::{get, post},
};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::{
    AppState,
    middleware::{log_errors, rate_limit, require_admin},
    security::CONTENT_SECURITY_POLICY,
};

pub mod admin;
pub mod content;

/// 组装全部路由和中间件
pub fn router(state: AppState) -> Router {
    // 公开路由
    let public_routes = Router::new()
        .route("/admin/login", post(admin::login))
        .route("/admin/status", get(admin::status))
        .route("/comments/validate", post(content::validate_comment_input))
        .route("/search", get(content::search));

    // 需要管理员会话的路由
    let protected_routes = Router::new()
        .route("/admin/logout", post(admin::logout))
        .route("/admin/refresh", post(admin::refresh_token))
        .route("/admin/session", get(admin::current_session))
        .route("/posts/validate", post(content::validate_post_input))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ));

    let routes = Router::new().merge(public_routes).merge(protected_routes);
    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        routes
    } else {
        Router::new().nest(base, routes)
    };

    let router = router
        .layer(axum::middleware::from_fn(log_errors))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit,
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    // 开发模式下允许所有来源
    #[cfg(debug_assertions)]
    let router = router.layer(tower_http::cors::CorsLayer::permissive());

    router.with_state(state)
}
