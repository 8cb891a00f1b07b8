use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::VaultInfo;
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> Result<Json<VaultInfo>, GetVaultError> {
    let vault = state
        .database()
        .get_vault(&id)
        .await
        .map_err(|e| GetVaultError::Database(e.to_string()))?
        .ok_or(GetVaultError::NotFound)?;

    Ok(Json(vault.into()))
}

#[derive(Debug, thiserror::Error)]
pub enum GetVaultError {
    #[error("vault not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(String),
}

impl IntoResponse for GetVaultError {
    fn into_response(self) -> Response {
        let status = match &self {
            GetVaultError::NotFound => http::StatusCode::NOT_FOUND,
            GetVaultError::Database(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
