//! Bearer-token authentication for the admin surface

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::header::AUTHORIZATION;
use http::StatusCode;
use subtle::ConstantTimeEq;

use crate::ServiceState;

pub async fn admin_auth(
    State(state): State<ServiceState>,
    request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let Some(header) = header else {
        return unauthorized("missing Authorization header");
    };
    if !header.starts_with("Bearer ") {
        return unauthorized("Authorization header must use Bearer scheme");
    }

    let expected = format!("Bearer {}", state.admin_token());
    if header.as_bytes().ct_eq(expected.as_bytes()).unwrap_u8() != 1 {
        return unauthorized("invalid admin token");
    }

    next.run(request).await
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}
