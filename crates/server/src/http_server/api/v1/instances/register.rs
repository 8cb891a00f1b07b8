//! POST /v1/instances — register a TEE instance.
//!
//! The FID is derived server-side from the submitted public key; it is the
//! only way an FID ever comes into existence.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use jingui_common::crypto;

use crate::database::RegisterInstanceError as DbRegisterError;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterInstanceRequest {
    /// X25519 public key, 64 hex characters.
    pub public_key: String,
    /// Attestation-expected app identifier for strict mode.
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub label: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<RegisterInstanceRequest>,
) -> Result<impl IntoResponse, RegisterInstanceError> {
    let mut public_key = [0u8; 32];
    hex::decode_to_slice(req.public_key.trim(), &mut public_key)
        .map_err(|_| RegisterInstanceError::InvalidPublicKey)?;

    let fid = crypto::fid(&public_key);

    match state
        .database()
        .register_instance(&fid, &public_key, req.app_id.trim(), &req.label)
        .await
    {
        Ok(()) => {}
        Err(DbRegisterError::DuplicateFid) => {
            return Err(RegisterInstanceError::DuplicateFid(fid))
        }
        Err(DbRegisterError::DuplicateKey) => return Err(RegisterInstanceError::DuplicateKey),
        Err(DbRegisterError::Database(e)) => {
            return Err(RegisterInstanceError::Database(e.to_string()))
        }
    }

    tracing::info!(fid = %fid, label = %req.label, "instance registered");

    Ok((
        http::StatusCode::CREATED,
        Json(serde_json::json!({ "fid": fid, "status": "registered" })),
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterInstanceError {
    #[error("public_key must be 64 hex characters (32 bytes)")]
    InvalidPublicKey,
    #[error("instance with FID {0} already exists")]
    DuplicateFid(String),
    #[error("another instance with this public key already exists")]
    DuplicateKey,
    #[error("database error: {0}")]
    Database(String),
}

impl IntoResponse for RegisterInstanceError {
    fn into_response(self) -> Response {
        let status = match &self {
            RegisterInstanceError::InvalidPublicKey => http::StatusCode::BAD_REQUEST,
            RegisterInstanceError::DuplicateFid(_) | RegisterInstanceError::DuplicateKey => {
                http::StatusCode::CONFLICT
            }
            RegisterInstanceError::Database(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
