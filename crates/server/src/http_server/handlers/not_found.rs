use axum::response::IntoResponse;
use axum::Json;
use http::StatusCode;

pub async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "not found" })),
    )
}
