//! Grant management: the vault ↔ instance junction rows.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::database::GrantError as DbGrantError;
use crate::http_server::api::v1::instances::InstanceInfo;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListGrantsResponse {
    pub instances: Vec<InstanceInfo>,
}

/// GET /v1/vaults/:id/instances
pub async fn list_handler(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> Result<Json<ListGrantsResponse>, GrantsError> {
    let vault = state
        .database()
        .get_vault(&id)
        .await
        .map_err(|e| GrantsError::Database(e.to_string()))?;
    if vault.is_none() {
        return Err(GrantsError::NotFound);
    }

    let instances = state
        .database()
        .list_vault_instances(&id)
        .await
        .map_err(|e| GrantsError::Database(e.to_string()))?;

    Ok(Json(ListGrantsResponse {
        instances: instances.into_iter().map(InstanceInfo::from).collect(),
    }))
}

/// POST /v1/vaults/:id/instances/:fid
pub async fn grant_handler(
    State(state): State<ServiceState>,
    Path((id, fid)): Path<(String, String)>,
) -> Result<impl IntoResponse, GrantsError> {
    match state.database().grant_access(&id, &fid).await {
        Ok(()) => Ok((
            http::StatusCode::CREATED,
            Json(serde_json::json!({ "vault_id": id, "fid": fid, "status": "granted" })),
        )),
        Err(DbGrantError::NotFound) => Err(GrantsError::NotFound),
        Err(DbGrantError::Database(e)) => Err(GrantsError::Database(e.to_string())),
    }
}

/// DELETE /v1/vaults/:id/instances/:fid
pub async fn revoke_handler(
    State(state): State<ServiceState>,
    Path((id, fid)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, GrantsError> {
    let revoked = state
        .database()
        .revoke_access(&id, &fid)
        .await
        .map_err(|e| GrantsError::Database(e.to_string()))?;
    if !revoked {
        return Err(GrantsError::GrantNotFound);
    }

    Ok(Json(serde_json::json!({
        "vault_id": id,
        "fid": fid,
        "status": "revoked",
    })))
}

#[derive(Debug, thiserror::Error)]
pub enum GrantsError {
    #[error("vault or instance not found")]
    NotFound,
    #[error("grant not found")]
    GrantNotFound,
    #[error("database error: {0}")]
    Database(String),
}

impl IntoResponse for GrantsError {
    fn into_response(self) -> Response {
        let status = match &self {
            GrantsError::NotFound | GrantsError::GrantNotFound => http::StatusCode::NOT_FOUND,
            GrantsError::Database(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
