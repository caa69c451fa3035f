//! HTTP Middleware
//!
//! 按状态码记录失败请求；业务错误（errno != 0）在 ApiError 中记录

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// 4xx/5xx 响应日志
pub async fn error_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if response.status().is_server_error() {
        tracing::error!(%method, %path, status, elapsed_ms, "HTTP server error");
    } else if response.status().is_client_error() {
        tracing::warn!(%method, %path, status, elapsed_ms, "HTTP client error");
    }

    response
}
