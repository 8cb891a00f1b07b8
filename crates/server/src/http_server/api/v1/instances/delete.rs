use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::ServiceState;

/// DELETE /v1/instances/:fid — removes the instance together with its
/// grants and debug policies.
pub async fn handler(
    State(state): State<ServiceState>,
    Path(fid): Path<String>,
) -> Result<Json<serde_json::Value>, DeleteInstanceError> {
    let deleted = state
        .database()
        .delete_instance(&fid)
        .await
        .map_err(|e| DeleteInstanceError::Database(e.to_string()))?;
    if !deleted {
        return Err(DeleteInstanceError::NotFound);
    }

    tracing::info!(fid = %fid, "instance deleted");
    Ok(Json(serde_json::json!({ "fid": fid, "status": "deleted" })))
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteInstanceError {
    #[error("instance not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(String),
}

impl IntoResponse for DeleteInstanceError {
    fn into_response(self) -> Response {
        let status = match &self {
            DeleteInstanceError::NotFound => http::StatusCode::NOT_FOUND,
            DeleteInstanceError::Database(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
