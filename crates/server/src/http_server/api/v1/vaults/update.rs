use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateVaultRequest {
    pub name: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateVaultRequest>,
) -> Result<impl IntoResponse, UpdateVaultError> {
    if req.name.trim().is_empty() {
        return Err(UpdateVaultError::InvalidName);
    }

    let updated = state
        .database()
        .update_vault(&id, &req.name)
        .await
        .map_err(|e| UpdateVaultError::Database(e.to_string()))?;
    if !updated {
        return Err(UpdateVaultError::NotFound);
    }

    Ok(Json(serde_json::json!({ "id": id, "status": "updated" })))
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateVaultError {
    #[error("vault name must be non-empty")]
    InvalidName,
    #[error("vault not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(String),
}

impl IntoResponse for UpdateVaultError {
    fn into_response(self) -> Response {
        let status = match &self {
            UpdateVaultError::InvalidName => http::StatusCode::BAD_REQUEST,
            UpdateVaultError::NotFound => http::StatusCode::NOT_FOUND,
            UpdateVaultError::Database(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
