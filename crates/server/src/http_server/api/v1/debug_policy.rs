//! Per-(vault, instance) debug-read policy.
//!
//! Absence means "allow": a policy row only matters when it explicitly
//! turns `read`-command fetches off. `run`-command fetches are never gated
//! by it.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::database::PolicyError as DbPolicyError;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugPolicyResponse {
    pub vault_id: String,
    pub fid: String,
    pub allow_read: bool,
    /// False when no explicit policy row exists and the default applies.
    pub explicit: bool,
}

/// GET /v1/debug-policy/:vault/:fid
pub async fn get_handler(
    State(state): State<ServiceState>,
    Path((vault, fid)): Path<(String, String)>,
) -> Result<Json<DebugPolicyResponse>, DebugPolicyError> {
    let policy = state
        .database()
        .get_debug_policy(&vault, &fid)
        .await
        .map_err(|e| DebugPolicyError::Database(e.to_string()))?;

    let response = match policy {
        Some(p) => DebugPolicyResponse {
            vault_id: p.vault_id,
            fid: p.fid,
            allow_read: p.allow_read,
            explicit: true,
        },
        None => DebugPolicyResponse {
            vault_id: vault,
            fid,
            allow_read: true,
            explicit: false,
        },
    };
    Ok(Json(response))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutDebugPolicyRequest {
    pub allow_read: bool,
}

/// PUT /v1/debug-policy/:vault/:fid
pub async fn put_handler(
    State(state): State<ServiceState>,
    Path((vault, fid)): Path<(String, String)>,
    Json(req): Json<PutDebugPolicyRequest>,
) -> Result<Json<serde_json::Value>, DebugPolicyError> {
    match state
        .database()
        .upsert_debug_policy(&vault, &fid, req.allow_read)
        .await
    {
        Ok(()) => Ok(Json(serde_json::json!({
            "vault_id": vault,
            "fid": fid,
            "allow_read": req.allow_read,
            "status": "updated",
        }))),
        Err(DbPolicyError::NotFound) => Err(DebugPolicyError::NotFound),
        Err(DbPolicyError::Database(e)) => Err(DebugPolicyError::Database(e.to_string())),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DebugPolicyError {
    #[error("vault or instance not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(String),
}

impl IntoResponse for DebugPolicyError {
    fn into_response(self) -> Response {
        let status = match &self {
            DebugPolicyError::NotFound => http::StatusCode::NOT_FOUND,
            DebugPolicyError::Database(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
