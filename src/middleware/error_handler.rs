use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};

/// 日志里最多记录的响应体字节数
const MAX_LOGGED_BODY: usize = 1024;

pub async fn log_errors(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let response = next.run(req).await;
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        warn!("{} {} -> {}", method, uri, status);
        return response;
    }
    if !status.is_server_error() {
        return response;
    }

    // 完整读出响应体再回填，日志只截取前一段
    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => {
            error!("{} {} -> {}, body unreadable: {}", method, uri, status, e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let logged = &bytes[..bytes.len().min(MAX_LOGGED_BODY)];
    error!(
        "{} {} -> {}, body ({} bytes): {}",
        method,
        uri,
        status,
        bytes.len(),
        String::from_utf8_lossy(logged)
    );

    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(bytes))
}
