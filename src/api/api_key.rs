use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;

use crate::api::types::ErrorBody;

pub const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Clone)]
pub struct ApiKeyState {
    pub expected_key: String,
}

/// Reject requests whose `X-API-Key` header does not match the configured key
pub async fn api_key_middleware(
    State(state): State<ApiKeyState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    match provided {
        Some(key) if key == state.expected_key => next.run(request).await,
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody {
                detail: "Invalid or missing API key".to_string(),
            }),
        )
            .into_response(),
    }
}
