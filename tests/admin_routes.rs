use std::sync::Arc;
use std::time::Duration;

use admin_gate::{
    AppState,
    clock::{Clock, ManualClock},
    config::Config,
    routes,
    session::MemoryStore,
    utils::error_codes,
};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

const PASSWORD: &str = "correct horse";

fn app() -> (Router, ManualClock) {
    let clock = ManualClock::new(1_700_000_000_000);
    let config = Config::new("yd1ng", PASSWORD, "integration-secret");
    let state = AppState::new(config, Arc::new(MemoryStore::new()), Arc::new(clock.clone()));
    (routes::router(state), clock)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn login_from(ip: &str, identifier: &str, password: &str) -> Request<Body> {
    Request::post("/api/admin/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-real-ip", ip)
        .body(Body::from(
            json!({ "identifier": identifier, "password": password }).to_string(),
        ))
        .unwrap()
}

fn comment_from(ip: &str, body: Value) -> Request<Body> {
    Request::post("/api/comments/validate")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-real-ip", ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn login(app: &Router) -> String {
    let (status, body) = send(app, login_from("127.0.0.1", "yd1ng", PASSWORD)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], error_codes::SUCCESS);
    body["resp_data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn login_grants_admin_session() {
    let (app, clock) = app();
    let (_, body) = send(&app, login_from("127.0.0.1", "yd1ng", PASSWORD)).await;
    assert_eq!(body["code"], error_codes::SUCCESS);
    assert_eq!(body["resp_data"]["email"], "yd1ng");
    let expires_at = body["resp_data"]["expires_at"].as_i64().unwrap();
    assert_eq!(expires_at, clock.now_millis() + 24 * 3600 * 1000);
    let token = body["resp_data"]["token"].as_str().unwrap();

    let (_, summary) = send(&app, Request::get("/api/admin/status").body(Body::empty()).unwrap()).await;
    assert_eq!(summary["resp_data"]["authenticated"], true);

    let (status, session) = send(&app, get_with_token("/api/admin/session", token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["resp_data"]["email"], "yd1ng");
    assert_eq!(session["resp_data"]["expires_at"], expires_at);
}

#[tokio::test]
async fn invalid_credentials_are_reported() {
    let (app, _) = app();
    let (status, body) = send(&app, login_from("127.0.0.1", "yd1ng", "wrong")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], error_codes::AUTH_FAILED);
    assert_eq!(body["msg"], "Invalid credentials");

    let (_, summary) = send(&app, Request::get("/api/admin/status").body(Body::empty()).unwrap()).await;
    assert_eq!(summary["resp_data"]["authenticated"], false);
}

#[tokio::test]
async fn repeated_failures_lock_the_identifier() {
    let (app, _) = app();
    for _ in 0..5 {
        let (_, body) = send(&app, login_from("10.0.0.1", "x@example.com", "guess")).await;
        assert_eq!(body["code"], error_codes::AUTH_FAILED);
    }

    // 换一个来源 IP，锁定仍按标识生效
    let (_, body) = send(&app, login_from("10.0.0.2", "x@example.com", "guess")).await;
    assert_eq!(body["code"], error_codes::RATE_LIMIT);
    assert_eq!(
        body["msg"],
        "Too many failed attempts. Please try again in 15 minutes."
    );

    // 同一 IP 的第六次登录被登录配额拦下
    let (_, body) = send(&app, login_from("10.0.0.1", "yd1ng", PASSWORD)).await;
    assert_eq!(body["code"], error_codes::RATE_LIMIT);
    assert!(body["msg"].as_str().unwrap().starts_with("Rate limit exceeded"));
}

#[tokio::test]
async fn admin_routes_require_the_current_token() {
    let (app, clock) = app();

    let (status, body) = send(&app, Request::get("/api/admin/session").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], error_codes::PERMISSION_DENIED);

    let token = login(&app).await;
    let (status, _) = send(&app, get_with_token("/api/admin/session", "bogus")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    clock.advance(Duration::from_secs(3600));
    let (status, body) = send(&app, post_with_token("/api/admin/refresh", &token)).await;
    assert_eq!(status, StatusCode::OK);
    let new_token = body["resp_data"]["token"].as_str().unwrap().to_string();
    assert_ne!(new_token, token);

    let (status, _) = send(&app, get_with_token("/api/admin/session", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, get_with_token("/api/admin/session", &new_token)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, post_with_token("/api/admin/logout", &new_token)).await;
    assert_eq!(body["resp_data"]["authenticated"], false);
    let (status, _) = send(&app, get_with_token("/api/admin/session", &new_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_session_loses_admin_access() {
    let (app, clock) = app();
    let token = login(&app).await;

    clock.advance(Duration::from_secs(24 * 3600 + 1));
    let (status, _) = send(&app, get_with_token("/api/admin/session", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = send(&app, Request::get("/api/admin/status").body(Body::empty()).unwrap()).await;
    assert_eq!(body["resp_data"]["authenticated"], false);
}

#[tokio::test]
async fn post_validation_is_admin_only_and_sanitizes() {
    let (app, _) = app();
    let post = json!({ "title": "  <b>Hello</b>  ", "excerpt": "a & b", "content": "# body" });

    let (status, _) = send(&app, post_json("/api/posts/validate", post.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app).await;
    let req = Request::post("/api/posts/validate")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(post.to_string()))
        .unwrap();
    let (_, body) = send(&app, req).await;
    assert_eq!(body["code"], error_codes::SUCCESS);
    assert_eq!(body["resp_data"]["title"], "&lt;b&gt;Hello&lt;/b&gt;");
    assert_eq!(body["resp_data"]["excerpt"], "a &amp; b");
    assert_eq!(body["resp_data"]["content"], "# body");

    let req = Request::post("/api/posts/validate")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(json!({ "title": "x" }).to_string()))
        .unwrap();
    let (_, body) = send(&app, req).await;
    assert_eq!(body["code"], error_codes::VALIDATION_ERROR);
    assert!(body["resp_data"]["errors"]["title"].is_string());
}

#[tokio::test]
async fn logout_requires_the_admin_token() {
    let (app, _) = app();
    let token = login(&app).await;

    let (status, body) = send(&app, Request::post("/api/admin/logout").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], error_codes::PERMISSION_DENIED);
    let (status, _) = send(&app, post_with_token("/api/admin/logout", "bogus")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // 匿名请求不能销毁会话
    let (status, _) = send(&app, get_with_token("/api/admin/session", &token)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, summary) = send(&app, Request::get("/api/admin/status").body(Body::empty()).unwrap()).await;
    assert_eq!(summary["resp_data"]["authenticated"], true);
}

fn comment(email: &str) -> Value {
    json!({
        "post_id": "42",
        "author_name": "Kim",
        "author_email": email,
        "content": "<script>alert(1)</script>",
    })
}

#[tokio::test]
async fn comments_are_validated_and_throttled_per_client() {
    let (app, _) = app();

    for _ in 0..5 {
        let (_, body) = send(&app, comment_from("10.0.0.7", comment("kim@example.com"))).await;
        assert_eq!(body["code"], error_codes::SUCCESS);
        assert_eq!(
            body["resp_data"]["content"],
            "&lt;script&gt;alert(1)&lt;/script&gt;"
        );
    }
    let (_, body) = send(&app, comment_from("10.0.0.7", comment("kim@example.com"))).await;
    assert_eq!(body["code"], error_codes::RATE_LIMIT);

    // 其他客户端不受影响，同一作者邮箱也一样
    let (_, body) = send(&app, comment_from("10.0.0.8", comment("kim@example.com"))).await;
    assert_eq!(body["code"], error_codes::SUCCESS);

    let invalid = json!({
        "post_id": "42",
        "author_name": "K",
        "author_email": "lee@example.com",
        "content": "",
    });
    let (_, body) = send(&app, comment_from("10.0.0.9", invalid)).await;
    assert_eq!(body["code"], error_codes::VALIDATION_ERROR);
    assert!(body["resp_data"]["errors"]["author_name"].is_string());
    assert!(body["resp_data"]["errors"]["content"].is_string());
}

#[tokio::test]
async fn rotating_author_email_does_not_escape_the_comment_limit() {
    let (app, _) = app();
    for i in 0..5 {
        let email = format!("visitor{}@example.com", i);
        let (_, body) = send(&app, comment_from("10.0.0.7", comment(&email))).await;
        assert_eq!(body["code"], error_codes::SUCCESS);
    }

    let (_, body) = send(&app, comment_from("10.0.0.7", comment("fresh@example.com"))).await;
    assert_eq!(body["code"], error_codes::RATE_LIMIT);
}

#[tokio::test]
async fn search_escapes_the_query() {
    let (app, _) = app();
    let req = Request::get("/api/search?q=a.b%3C").body(Body::empty()).unwrap();
    let (_, body) = send(&app, req).await;
    assert_eq!(body["code"], error_codes::SUCCESS);
    assert_eq!(body["resp_data"]["query"], "a.b&lt;");
    assert_eq!(body["resp_data"]["pattern"], "a\\.b<");

    let req = Request::get("/api/search?q=").body(Body::empty()).unwrap();
    let (_, body) = send(&app, req).await;
    assert_eq!(body["code"], error_codes::VALIDATION_ERROR);
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let (app, _) = app();
    let response = app
        .oneshot(Request::get("/api/admin/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let headers = response.headers();
    assert!(
        headers[header::CONTENT_SECURITY_POLICY]
            .to_str()
            .unwrap()
            .contains("frame-ancestors 'none'")
    );
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
}
