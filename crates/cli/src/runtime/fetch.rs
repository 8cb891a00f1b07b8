//! Client side of the challenge/fetch protocol.
//!
//! In strict mode the client collects its local attestation bundle, sends
//! it with the challenge request, and refuses to echo the nonce until the
//! server's own attestation has been verified — without that check the
//! handshake could be relayed through an unverified server.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use jingui_common::attestation::{Bundle, Collector, FileCollector, RatlsVerifier, Verifier};
use jingui_common::crypto::{self, CryptoError};
use jingui_server::config::parse_bool_flag;
use jingui_server::http_server::api::client::{ApiClient, ApiError};
use jingui_server::http_server::api::v1::secrets::challenge::ChallengeRequest;
use jingui_server::http_server::api::v1::secrets::fetch::FetchRequest;

const STRICT_ENV: &str = "JINGUI_RATLS_STRICT";
const EXPECT_SERVER_APP_ID_ENV: &str = "JINGUI_RATLS_EXPECT_SERVER_APP_ID";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("collect local attestation: {0}")]
    Collect(String),
    #[error("attestation bundle source is not configured; set JINGUI_ATTESTATION_BUNDLE or disable strict mode")]
    CollectorUnconfigured,
    #[error("challenge response missing server_attestation in strict mode")]
    MissingServerAttestation,
    #[error("verify server attestation: {0}")]
    ServerAttestation(String),
    #[error("server attestation certificate does not contain a verifiable app id")]
    MissingServerAppId,
    #[error("server attestation app_id mismatch: expected {expected:?} got {got:?}")]
    ServerAppIdMismatch { expected: String, got: String },
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("decode server payload: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("cryptographic failure on server response")]
    Crypto(#[from] CryptoError),
}

/// Strict RA-TLS is the default; unknown flag values keep it on.
pub fn ratls_strict_enabled() -> bool {
    match std::env::var(STRICT_ENV) {
        Ok(v) if !v.trim().is_empty() => parse_bool_flag(&v).unwrap_or(true),
        _ => true,
    }
}

/// Run the two-leg protocol and return the decrypted plaintext per
/// reference string.
pub async fn fetch_secrets(
    client: &ApiClient,
    private_key: &[u8; 32],
    fid: &str,
    refs: Vec<String>,
    command: &str,
) -> Result<HashMap<String, Vec<u8>>, FetchError> {
    let strict = ratls_strict_enabled();

    let client_attestation = if strict {
        Some(collect_local_bundle()?)
    } else {
        None
    };

    let challenge = client
        .call(ChallengeRequest {
            fid: fid.to_string(),
            client_attestation,
        })
        .await?;

    if strict {
        let bundle = challenge
            .server_attestation
            .as_ref()
            .ok_or(FetchError::MissingServerAttestation)?;
        verify_server_attestation(bundle)?;
    }

    let blob = BASE64.decode(&challenge.challenge)?;
    let nonce = crypto::decrypt(private_key, &blob)?;

    let response = client
        .call(FetchRequest {
            fid: fid.to_string(),
            secret_references: refs,
            challenge_id: challenge.challenge_id,
            challenge_response: BASE64.encode(nonce),
            command: (!command.is_empty()).then(|| command.to_string()),
        })
        .await?;

    let mut secrets = HashMap::with_capacity(response.secrets.len());
    for (reference, encoded) in response.secrets {
        let blob = BASE64.decode(&encoded)?;
        let plaintext = crypto::decrypt(private_key, &blob)?;
        secrets.insert(reference, plaintext);
    }
    Ok(secrets)
}

/// Check server reachability and instance registration by issuing (but not
/// consuming) a challenge.
pub async fn check_instance(client: &ApiClient, fid: &str) -> Result<(), FetchError> {
    let strict = ratls_strict_enabled();
    let client_attestation = if strict {
        Some(collect_local_bundle()?)
    } else {
        None
    };

    let challenge = client
        .call(ChallengeRequest {
            fid: fid.to_string(),
            client_attestation,
        })
        .await?;

    // Verify the server before trusting anything it said.
    if strict {
        let bundle = challenge
            .server_attestation
            .as_ref()
            .ok_or(FetchError::MissingServerAttestation)?;
        verify_server_attestation(bundle)?;
    }
    Ok(())
}

fn collect_local_bundle() -> Result<Bundle, FetchError> {
    let collector = FileCollector::from_env().ok_or(FetchError::CollectorUnconfigured)?;
    let bundle = collector
        .collect()
        .map_err(|e| FetchError::Collect(e.to_string()))?;
    tracing::debug!(
        app_id = %bundle.app_id.as_deref().unwrap_or(""),
        "collected client attestation bundle"
    );
    Ok(bundle)
}

fn verify_server_attestation(bundle: &Bundle) -> Result<(), FetchError> {
    let identity = RatlsVerifier::new()
        .verify(bundle)
        .map_err(|e| FetchError::ServerAttestation(e.to_string()))?;

    // Only the cert-embedded app id counts; the self-report never does.
    if identity.app_id.is_empty() {
        return Err(FetchError::MissingServerAppId);
    }

    if let Ok(expected) = std::env::var(EXPECT_SERVER_APP_ID_ENV) {
        let expected = expected.trim();
        if !expected.is_empty() && identity.app_id != expected {
            return Err(FetchError::ServerAppIdMismatch {
                expected: expected.to_string(),
                got: identity.app_id,
            });
        }
    }

    tracing::debug!(
        verified_app_id = %identity.app_id,
        instance_id = %identity.instance_id,
        "server attestation verified"
    );
    Ok(())
}
