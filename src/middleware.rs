//! Request middleware: bearer-token authentication and access logging.

use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::error::ApiError;
use crate::router::AppState;
use crate::services::scope::Caller;
use crate::services::sessions;

/// The raw bearer token of the current request, kept so logout can revoke it.
#[derive(Clone, Debug)]
pub struct SessionToken(pub String);

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Requires a live session. On success the resolved [`Caller`] and the
/// [`SessionToken`] are injected into the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req).ok_or(ApiError::Unauthorized)?;
    let user = sessions::resolve(&state.pool, &token).await?;

    req.extensions_mut().insert(Caller::from(&user));
    req.extensions_mut().insert(SessionToken(token));

    Ok(next.run(req).await)
}

/// Logs method, path, status and latency of every request under a fresh
/// request id, which is echoed back in `x-request-id`.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let mut response = next.run(req).await;

    log::info!(
        "[{}] {} {} -> {} ({} ms)",
        request_id,
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}
