use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateInstanceRequest {
    /// New attestation-expected app identifier.
    pub app_id: String,
    #[serde(default)]
    pub label: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(fid): Path<String>,
    Json(req): Json<UpdateInstanceRequest>,
) -> Result<Json<serde_json::Value>, UpdateInstanceError> {
    let updated = state
        .database()
        .update_instance(&fid, req.app_id.trim(), &req.label)
        .await
        .map_err(|e| UpdateInstanceError::Database(e.to_string()))?;
    if !updated {
        return Err(UpdateInstanceError::NotFound);
    }

    Ok(Json(serde_json::json!({ "fid": fid, "status": "updated" })))
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateInstanceError {
    #[error("instance not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(String),
}

impl IntoResponse for UpdateInstanceError {
    fn into_response(self) -> Response {
        let status = match &self {
            UpdateInstanceError::NotFound => http::StatusCode::NOT_FOUND,
            UpdateInstanceError::Database(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
