//! POST /v1/secrets/challenge — first leg of the proof-of-possession
//! handshake.
//!
//! Returns a fresh 32-byte nonce ECIES-encrypted to the instance's
//! registered public key, and records it in the challenge ledger. In strict
//! mode the request must carry a client attestation bundle whose verified
//! app identifier matches the instance's bound one, and the response
//! carries a server attestation bundle so the client can authenticate the
//! server before echoing the nonce.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use jingui_common::attestation::Bundle;
use jingui_common::crypto;

use crate::challenge::NONCE_SIZE;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeRequest {
    pub fid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_attestation: Option<Bundle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub challenge_id: String,
    /// Base64 of the ECIES-encrypted nonce.
    pub challenge: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_attestation: Option<Bundle>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<ChallengeRequest>,
) -> Result<Json<ChallengeResponse>, IssueChallengeError> {
    let inst = state
        .database()
        .get_instance(&req.fid)
        .await
        .map_err(|e| IssueChallengeError::Database(e.to_string()))?
        .ok_or(IssueChallengeError::InstanceNotFound)?;

    let public_key: [u8; 32] = inst
        .public_key
        .as_slice()
        .try_into()
        .map_err(|_| IssueChallengeError::CorruptPublicKey)?;

    let mut server_attestation = None;
    if state.strict() {
        let bundle = match req.client_attestation.as_ref() {
            Some(b) => b,
            None => {
                tracing::warn!(fid = %req.fid, "challenge rejected: missing client attestation");
                return Err(IssueChallengeError::MissingAttestation);
            }
        };
        let claimed = bundle.app_id.as_deref().map(str::trim).unwrap_or("");
        if claimed.is_empty() {
            tracing::warn!(fid = %req.fid, "challenge rejected: missing client app_id claim");
            return Err(IssueChallengeError::MissingClaimedAppId);
        }
        let expected = inst.app_id.trim();
        if expected.is_empty() {
            tracing::warn!(fid = %req.fid, "challenge rejected: instance has no bound app_id");
            return Err(IssueChallengeError::MissingBoundAppId);
        }
        // Cheap self-report check short-circuits before the expensive verify.
        if claimed != expected {
            tracing::warn!(
                fid = %req.fid,
                claimed_app_id = %claimed,
                bound_app_id = %expected,
                "challenge rejected: claimed app_id mismatch"
            );
            return Err(IssueChallengeError::AppIdMismatch);
        }

        let identity = state.verifier().verify(bundle).map_err(|e| {
            tracing::warn!(fid = %req.fid, error = %e, "challenge rejected: attestation verify failed");
            IssueChallengeError::VerificationFailed
        })?;
        if identity.app_id.is_empty() {
            tracing::warn!(fid = %req.fid, "challenge rejected: certificate carries no app_id");
            return Err(IssueChallengeError::MissingCertAppId);
        }
        if identity.app_id != expected {
            tracing::warn!(
                fid = %req.fid,
                verified_app_id = %identity.app_id,
                bound_app_id = %expected,
                "challenge rejected: verified app_id mismatch"
            );
            return Err(IssueChallengeError::AppIdMismatch);
        }
        tracing::debug!(
            fid = %req.fid,
            verified_app_id = %identity.app_id,
            instance_id = %identity.instance_id,
            device_id = %identity.device_id,
            "client attestation verified"
        );

        let collector = state
            .collector()
            .ok_or(IssueChallengeError::CollectorUnavailable)?;
        let bundle = collector
            .collect()
            .map_err(|e| IssueChallengeError::CollectFailed(e.to_string()))?;
        server_attestation = Some(bundle);
    }

    let mut nonce = [0u8; NONCE_SIZE];
    getrandom::getrandom(&mut nonce).map_err(|_| IssueChallengeError::NonceGeneration)?;

    let challenge_blob =
        crypto::encrypt(&public_key, &nonce).map_err(|_| IssueChallengeError::Encryption)?;

    let ra_verified = !state.strict() || req.client_attestation.is_some();
    let challenge_id = state
        .ledger()
        .issue(&req.fid, &nonce, ra_verified, state.strict())
        .map_err(|e| IssueChallengeError::Ledger(e.to_string()))?;

    Ok(Json(ChallengeResponse {
        challenge_id,
        challenge: BASE64.encode(challenge_blob),
        server_attestation,
    }))
}

#[derive(Debug, thiserror::Error)]
pub enum IssueChallengeError {
    #[error("database error: {0}")]
    Database(String),
    #[error("instance not found")]
    InstanceNotFound,
    #[error("invalid instance public key length")]
    CorruptPublicKey,
    #[error("client_attestation is required in strict mode")]
    MissingAttestation,
    #[error("client_attestation.app_id is required in strict mode")]
    MissingClaimedAppId,
    #[error("instance is missing a bound attestation app id")]
    MissingBoundAppId,
    #[error("client attestation app_id mismatch")]
    AppIdMismatch,
    #[error("client attestation verification failed")]
    VerificationFailed,
    #[error("client attestation certificate does not contain an app id")]
    MissingCertAppId,
    #[error("server attestation collector is not configured")]
    CollectorUnavailable,
    #[error("failed to collect server attestation: {0}")]
    CollectFailed(String),
    #[error("failed to generate challenge")]
    NonceGeneration,
    #[error("failed to encrypt challenge")]
    Encryption,
    #[error("failed to issue challenge: {0}")]
    Ledger(String),
}

impl IntoResponse for IssueChallengeError {
    fn into_response(self) -> Response {
        use IssueChallengeError::*;
        let status = match &self {
            InstanceNotFound => http::StatusCode::NOT_FOUND,
            MissingAttestation | MissingClaimedAppId | MissingBoundAppId | VerificationFailed
            | MissingCertAppId => http::StatusCode::UNAUTHORIZED,
            AppIdMismatch => http::StatusCode::FORBIDDEN,
            Database(_) | CorruptPublicKey | CollectorUnavailable | CollectFailed(_)
            | NonceGeneration | Encryption | Ledger(_) => {
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl ApiRequest for ChallengeRequest {
    type Response = ChallengeResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url
            .join("/v1/secrets/challenge")
            .expect("static route must join");
        client.post(full_url).json(&self)
    }
}
