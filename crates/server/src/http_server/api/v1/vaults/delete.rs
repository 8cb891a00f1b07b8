use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::database::DeleteVaultError as DbDeleteError;
use crate::ServiceState;

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteVaultQuery {
    #[serde(default)]
    pub cascade: bool,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteVaultQuery>,
) -> Result<impl IntoResponse, DeleteVaultError> {
    let deleted = if query.cascade {
        state
            .database()
            .delete_vault_cascade(&id)
            .await
            .map_err(|e| DeleteVaultError::Database(e.to_string()))?
    } else {
        match state.database().delete_vault(&id).await {
            Ok(deleted) => deleted,
            Err(DbDeleteError::HasDependents) => return Err(DeleteVaultError::HasDependents),
            Err(DbDeleteError::Database(e)) => {
                return Err(DeleteVaultError::Database(e.to_string()))
            }
        }
    };

    if !deleted {
        return Err(DeleteVaultError::NotFound);
    }
    Ok(Json(serde_json::json!({ "id": id, "status": "deleted" })))
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteVaultError {
    #[error("vault has dependent records; delete them first or use ?cascade=true")]
    HasDependents,
    #[error("vault not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(String),
}

impl IntoResponse for DeleteVaultError {
    fn into_response(self) -> Response {
        let status = match &self {
            DeleteVaultError::HasDependents => http::StatusCode::CONFLICT,
            DeleteVaultError::NotFound => http::StatusCode::NOT_FOUND,
            DeleteVaultError::Database(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
