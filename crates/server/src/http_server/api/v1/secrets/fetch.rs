//! POST /v1/secrets/fetch — second leg of the handshake.
//!
//! Consumes the ledger entry (single use, whatever the outcome), authorizes
//! every reference against the grant graph, and returns each field value
//! ECIES-encrypted to the instance's registered public key. References are
//! processed in request order; the first failure short-circuits with its
//! status.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use jingui_common::crypto;
use jingui_common::refs::SecretRef;

use crate::http_server::api::client::ApiRequest;
use crate::http_server::api::COMMAND_HEADER;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub fid: String,
    pub secret_references: Vec<String>,
    pub challenge_id: String,
    /// Base64 of the decrypted nonce.
    pub challenge_response: String,
    /// Client command, sent as the `X-Jingui-Command` header.
    #[serde(skip)]
    pub command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    /// Reference string to base64 ECIES blob.
    pub secrets: BTreeMap<String, String>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    Json(req): Json<FetchRequest>,
) -> Result<Json<FetchResponse>, FetchError> {
    let response = BASE64
        .decode(&req.challenge_response)
        .map_err(|_| FetchError::BadChallengeEncoding)?;

    state
        .ledger()
        .consume(&req.challenge_id, &req.fid, &response, state.strict())
        .map_err(|e| {
            tracing::warn!(
                fid = %req.fid,
                challenge_id = %req.challenge_id,
                error = %e,
                "fetch rejected: challenge verification failed"
            );
            FetchError::ChallengeFailed
        })?;

    let inst = state
        .database()
        .get_instance(&req.fid)
        .await
        .map_err(|e| FetchError::Database(e.to_string()))?
        .ok_or(FetchError::InstanceNotFound)?;

    if let Err(e) = state.database().update_last_used(&req.fid).await {
        tracing::debug!(fid = %req.fid, error = %e, "last-used update failed");
    }

    let public_key: [u8; 32] = inst
        .public_key
        .as_slice()
        .try_into()
        .map_err(|_| FetchError::CorruptPublicKey)?;

    let command = headers
        .get(COMMAND_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    let read_command = command == "read";

    let mut secrets = BTreeMap::new();

    for ref_str in &req.secret_references {
        let sref = SecretRef::parse(ref_str)
            .map_err(|_| FetchError::InvalidReference(ref_str.clone()))?;

        let granted = state
            .database()
            .has_access(&sref.vault, &req.fid)
            .await
            .map_err(|e| FetchError::Database(e.to_string()))?;
        if !granted {
            // Same answer whether the vault is missing or merely ungranted.
            return Err(FetchError::AccessDenied(ref_str.clone()));
        }

        if read_command {
            let policy = state
                .database()
                .get_debug_policy(&sref.vault, &req.fid)
                .await
                .map_err(|e| FetchError::Database(e.to_string()))?;
            if matches!(policy, Some(p) if !p.allow_read) {
                return Err(FetchError::DebugReadDisabled(ref_str.clone()));
            }
        }

        // The reference's item names the stored section; the field names
        // the stored field.
        let stored = state
            .database()
            .get_field(&sref.vault, &sref.item, &sref.field)
            .await
            .map_err(|e| FetchError::Database(e.to_string()))?
            .ok_or_else(|| FetchError::FieldNotFound(ref_str.clone()))?;

        let plaintext = state
            .master_key()
            .decrypt_at_rest(&stored)
            .map_err(|_| FetchError::Internal)?;

        let blob =
            crypto::encrypt(&public_key, &plaintext).map_err(|_| FetchError::Internal)?;
        secrets.insert(ref_str.clone(), BASE64.encode(blob));
    }

    Ok(Json(FetchResponse { secrets }))
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("challenge_response must be valid base64")]
    BadChallengeEncoding,
    #[error("challenge verification failed")]
    ChallengeFailed,
    #[error("instance not found")]
    InstanceNotFound,
    #[error("invalid instance public key length")]
    CorruptPublicKey,
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    #[error("access denied for reference: {0}")]
    AccessDenied(String),
    #[error("debug read is disabled for reference: {0}")]
    DebugReadDisabled(String),
    #[error("no value for reference: {0}")]
    FieldNotFound(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("internal error")]
    Internal,
}

impl IntoResponse for FetchError {
    fn into_response(self) -> Response {
        use FetchError::*;
        let status = match &self {
            BadChallengeEncoding | InvalidReference(_) => http::StatusCode::BAD_REQUEST,
            ChallengeFailed => http::StatusCode::UNAUTHORIZED,
            AccessDenied(_) | DebugReadDisabled(_) => http::StatusCode::FORBIDDEN,
            InstanceNotFound | FieldNotFound(_) => http::StatusCode::NOT_FOUND,
            CorruptPublicKey | Database(_) | Internal => {
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl ApiRequest for FetchRequest {
    type Response = FetchResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url
            .join("/v1/secrets/fetch")
            .expect("static route must join");
        let mut builder = client.post(full_url);
        if let Some(command) = &self.command {
            builder = builder.header(COMMAND_HEADER, command.clone());
        }
        builder.json(&self)
    }
}
