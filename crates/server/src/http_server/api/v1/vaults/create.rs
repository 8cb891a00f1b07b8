use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVaultRequest {
    pub id: String,
    pub name: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<CreateVaultRequest>,
) -> Result<impl IntoResponse, CreateVaultError> {
    if req.id.trim().is_empty() || req.id.contains('/') {
        return Err(CreateVaultError::InvalidId);
    }
    if req.name.trim().is_empty() {
        return Err(CreateVaultError::InvalidName);
    }

    let created = state
        .database()
        .create_vault(&req.id, &req.name)
        .await
        .map_err(|e| CreateVaultError::Database(e.to_string()))?;
    if !created {
        return Err(CreateVaultError::Duplicate(req.id));
    }

    Ok((
        http::StatusCode::CREATED,
        Json(serde_json::json!({ "id": req.id, "status": "created" })),
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum CreateVaultError {
    #[error("vault id must be non-empty and must not contain '/'")]
    InvalidId,
    #[error("vault name must be non-empty")]
    InvalidName,
    #[error("vault already exists: {0}")]
    Duplicate(String),
    #[error("database error: {0}")]
    Database(String),
}

impl IntoResponse for CreateVaultError {
    fn into_response(self) -> Response {
        let status = match &self {
            CreateVaultError::InvalidId | CreateVaultError::InvalidName => {
                http::StatusCode::BAD_REQUEST
            }
            CreateVaultError::Duplicate(_) => http::StatusCode::CONFLICT,
            CreateVaultError::Database(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
