use crate::application::ErrorResponse;
use crate::domain::signing::constant_time_eq;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use std::sync::Arc;
use tracing::warn;

pub const ADMIN_API_KEY_HEADER: &str = "X-Admin-Api-Key";

/// Guards the operator endpoints. An empty configured key locks them.
pub async fn require_admin_api_key(
    State(expected): State<Arc<str>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(ADMIN_API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if expected.is_empty() || !constant_time_eq(provided, &expected) {
        warn!(path = %request.uri().path(), "Rejected operator request");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(
                "UNAUTHORIZED".to_string(),
                "Missing or invalid admin API key".to_string(),
            )),
        )
            .into_response();
    }

    next.run(request).await
}
