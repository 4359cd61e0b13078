use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use super::error::ApiError;
use super::state::AppState;

/// 不需要认证的路径
const PUBLIC_PATHS: &[&str] = &["/health"];

fn extract_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.api_token.as_deref() else {
        return Ok(next.run(request).await);
    };
    let path = request.uri().path();
    if PUBLIC_PATHS.iter().any(|p| *p == path) {
        return Ok(next.run(request).await);
    }

    // 常量时间比较，避免按响应时间猜测 token
    let authorized = extract_token(&request)
        .map(|token| bool::from(token.as_bytes().ct_eq(expected.as_bytes())))
        .unwrap_or(false);
    if !authorized {
        tracing::warn!(path = %request.uri().path(), "rejected request with missing or invalid token");
        return Err(ApiError::unauthorized());
    }
    Ok(next.run(request).await)
}
