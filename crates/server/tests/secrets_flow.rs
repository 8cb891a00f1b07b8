//! End-to-end tests for the challenge/fetch protocol, driven through the
//! full router.

use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use http::{Request, StatusCode};
use tower::ServiceExt;

use jingui_common::attestation::{
    AttestationError, Bundle, Collector, VerifiedIdentity, Verifier,
};
use jingui_common::crypto::{self, MasterKey};
use jingui_server::database::Database;
use jingui_server::http_server;
use jingui_server::{ChallengeLedger, ServiceState};

const ADMIN_TOKEN: &str = "test-admin-token-0123456789";
const SECRET_VALUE: &str = "test-password-value";
const REFERENCE: &str = "jingui://gmail-vault/alice@gmail.com/password";

/// Verifier that trusts any bundle and reports a fixed app id.
struct StaticVerifier {
    app_id: String,
}

impl Verifier for StaticVerifier {
    fn verify(&self, bundle: &Bundle) -> Result<VerifiedIdentity, AttestationError> {
        if bundle.app_cert.is_empty() {
            return Err(AttestationError::MissingCert);
        }
        Ok(VerifiedIdentity {
            app_id: self.app_id.clone(),
            instance_id: bundle.instance_id.clone().unwrap_or_default(),
            device_id: bundle.device_id.clone().unwrap_or_default(),
        })
    }
}

struct StaticCollector(Bundle);

impl Collector for StaticCollector {
    fn collect(&self) -> Result<Bundle, AttestationError> {
        Ok(self.0.clone())
    }
}

struct Harness {
    app: Router,
    private_key: [u8; 32],
    fid: String,
}

fn keypair() -> ([u8; 32], [u8; 32]) {
    let mut private = [0u8; 32];
    getrandom::getrandom(&mut private).unwrap();
    (private, crypto::derive_public_key(&private))
}

fn master_key() -> MasterKey {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes).unwrap();
    MasterKey::from(bytes)
}

/// Provision the scenario-1 world: vault `gmail-vault`, one stored field,
/// one registered instance with a grant on the vault.
async fn harness(strict: bool, bound_app_id: &str) -> Harness {
    let key = master_key();
    let db = Database::connect(":memory:").await.unwrap();

    db.create_vault("gmail-vault", "Gmail").await.unwrap();
    db.create_vault("other-vault", "Other").await.unwrap();
    let encrypted = key.encrypt_at_rest(SECRET_VALUE.as_bytes()).unwrap();
    db.upsert_field("gmail-vault", "alice@gmail.com", "password", &encrypted)
        .await
        .unwrap();
    // The ungranted vault holds a real value too; authorization must still
    // refuse before the lookup could succeed.
    let other = key.encrypt_at_rest(b"other-value").unwrap();
    db.upsert_field("other-vault", "alice@gmail.com", "password", &other)
        .await
        .unwrap();

    let (private_key, public_key) = keypair();
    let fid = crypto::fid(&public_key);
    db.register_instance(&fid, &public_key, bound_app_id, "test instance")
        .await
        .unwrap();
    db.grant_access("gmail-vault", &fid).await.unwrap();

    let state = ServiceState::new(
        db,
        Arc::new(ChallengeLedger::new()),
        key,
        ADMIN_TOKEN.to_string(),
        strict,
        Arc::new(StaticVerifier {
            app_id: "expected-app".to_string(),
        }),
        Some(Arc::new(StaticCollector(Bundle {
            app_cert: "SERVER CERT".to_string(),
            app_id: Some("server-app".to_string()),
            ..Bundle::default()
        }))),
    );

    Harness {
        app: http_server::app(state, &[]),
        private_key,
        fid,
    }
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Issue a challenge and decrypt the nonce, returning (challenge_id,
/// base64 response).
async fn solve_challenge(h: &Harness, attestation: Option<serde_json::Value>) -> (String, String) {
    let mut body = serde_json::json!({ "fid": h.fid });
    if let Some(att) = attestation {
        body["client_attestation"] = att;
    }
    let response = h
        .app
        .clone()
        .oneshot(post_json("/v1/secrets/challenge", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    let challenge_id = json["challenge_id"].as_str().unwrap().to_string();
    let blob = BASE64.decode(json["challenge"].as_str().unwrap()).unwrap();
    let nonce = crypto::decrypt(&h.private_key, &blob).unwrap();
    (challenge_id, BASE64.encode(nonce))
}

fn fetch_body(h: &Harness, refs: &[&str], challenge_id: &str, response: &str) -> serde_json::Value {
    serde_json::json!({
        "fid": h.fid,
        "secret_references": refs,
        "challenge_id": challenge_id,
        "challenge_response": response,
    })
}

#[tokio::test]
async fn test_happy_path() {
    let h = harness(false, "").await;
    let (challenge_id, challenge_response) = solve_challenge(&h, None).await;

    let response = h
        .app
        .clone()
        .oneshot(post_json(
            "/v1/secrets/fetch",
            fetch_body(&h, &[REFERENCE], &challenge_id, &challenge_response),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let blob = BASE64
        .decode(json["secrets"][REFERENCE].as_str().unwrap())
        .unwrap();
    let plaintext = crypto::decrypt(&h.private_key, &blob).unwrap();
    assert_eq!(plaintext, SECRET_VALUE.as_bytes());
}

#[tokio::test]
async fn test_replay_is_rejected() {
    let h = harness(false, "").await;
    let (challenge_id, challenge_response) = solve_challenge(&h, None).await;
    let body = fetch_body(&h, &[REFERENCE], &challenge_id, &challenge_response);

    let first = h
        .app
        .clone()
        .oneshot(post_json("/v1/secrets/fetch", body.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    // Byte-for-byte identical resubmission.
    let second = h
        .app
        .clone()
        .oneshot(post_json("/v1/secrets/fetch", body))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_vault_without_grant_is_forbidden() {
    let h = harness(false, "").await;

    // Vault exists but the instance holds no grant on it.
    let (challenge_id, challenge_response) = solve_challenge(&h, None).await;
    let response = h
        .app
        .clone()
        .oneshot(post_json(
            "/v1/secrets/fetch",
            fetch_body(
                &h,
                &["jingui://other-vault/alice@gmail.com/password"],
                &challenge_id,
                &challenge_response,
            ),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // A nonexistent vault answers identically.
    let (challenge_id, challenge_response) = solve_challenge(&h, None).await;
    let response = h
        .app
        .clone()
        .oneshot(post_json(
            "/v1/secrets/fetch",
            fetch_body(
                &h,
                &["jingui://no-such-vault/alice@gmail.com/password"],
                &challenge_id,
                &challenge_response,
            ),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_field_is_not_found() {
    let h = harness(false, "").await;
    let (challenge_id, challenge_response) = solve_challenge(&h, None).await;

    let response = h
        .app
        .clone()
        .oneshot(post_json(
            "/v1/secrets/fetch",
            fetch_body(
                &h,
                &["jingui://gmail-vault/alice@gmail.com/nonexistent"],
                &challenge_id,
                &challenge_response,
            ),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_reference_is_bad_request() {
    let h = harness(false, "").await;
    let (challenge_id, challenge_response) = solve_challenge(&h, None).await;

    let response = h
        .app
        .clone()
        .oneshot(post_json(
            "/v1/secrets/fetch",
            fetch_body(
                &h,
                &["jingui://gmail-vault/missing-field-segment"],
                &challenge_id,
                &challenge_response,
            ),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_nonce_is_rejected_and_burns_challenge() {
    let h = harness(false, "").await;
    let (challenge_id, _) = solve_challenge(&h, None).await;
    let wrong = BASE64.encode([0u8; 32]);

    let response = h
        .app
        .clone()
        .oneshot(post_json(
            "/v1/secrets/fetch",
            fetch_body(&h, &[REFERENCE], &challenge_id, &wrong),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The entry is gone even though verification failed.
    let response = h
        .app
        .clone()
        .oneshot(post_json(
            "/v1/secrets/fetch",
            fetch_body(&h, &[REFERENCE], &challenge_id, &wrong),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_strict_mode_requires_attestation() {
    let h = harness(true, "expected-app").await;

    let response = h
        .app
        .clone()
        .oneshot(post_json(
            "/v1/secrets/challenge",
            serde_json::json!({ "fid": h.fid }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_strict_mode_app_id_mismatch() {
    let h = harness(true, "expected-app").await;

    let response = h
        .app
        .clone()
        .oneshot(post_json(
            "/v1/secrets/challenge",
            serde_json::json!({
                "fid": h.fid,
                "client_attestation": {
                    "app_cert": "CLIENT CERT",
                    "app_id": "some-other-app",
                },
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_strict_mode_full_flow() {
    let h = harness(true, "expected-app").await;

    let attestation = serde_json::json!({
        "app_cert": "CLIENT CERT",
        "app_id": "expected-app",
    });

    // Challenge response must carry the server's attestation.
    let body = serde_json::json!({ "fid": h.fid, "client_attestation": attestation });
    let response = h
        .app
        .clone()
        .oneshot(post_json("/v1/secrets/challenge", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["server_attestation"]["app_cert"], "SERVER CERT");

    let challenge_id = json["challenge_id"].as_str().unwrap().to_string();
    let blob = BASE64.decode(json["challenge"].as_str().unwrap()).unwrap();
    let nonce = crypto::decrypt(&h.private_key, &blob).unwrap();

    let response = h
        .app
        .clone()
        .oneshot(post_json(
            "/v1/secrets/fetch",
            fetch_body(&h, &[REFERENCE], &challenge_id, &BASE64.encode(nonce)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_fid_is_not_found() {
    let h = harness(false, "").await;

    let response = h
        .app
        .clone()
        .oneshot(post_json(
            "/v1/secrets/challenge",
            serde_json::json!({ "fid": "0".repeat(40) }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_debug_policy_gates_read_command() {
    let h = harness(false, "").await;

    // Disable debug reads for (gmail-vault, fid) through the admin API.
    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/v1/debug-policy/gmail-vault/{}", h.fid))
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {}", ADMIN_TOKEN))
                .body(Body::from(
                    serde_json::json!({ "allow_read": false }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A "read" command is refused.
    let (challenge_id, challenge_response) = solve_challenge(&h, None).await;
    let body = fetch_body(&h, &[REFERENCE], &challenge_id, &challenge_response);
    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/secrets/fetch")
                .header("content-type", "application/json")
                .header("x-jingui-command", "read")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The same references under a "run" command still succeed.
    let (challenge_id, challenge_response) = solve_challenge(&h, None).await;
    let body = fetch_body(&h, &[REFERENCE], &challenge_id, &challenge_response);
    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/secrets/fetch")
                .header("content-type", "application/json")
                .header("x-jingui-command", "run")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_order_short_circuits() {
    let h = harness(false, "").await;
    let (challenge_id, challenge_response) = solve_challenge(&h, None).await;

    // Second reference is unauthorized; nothing is returned for the first.
    let response = h
        .app
        .clone()
        .oneshot(post_json(
            "/v1/secrets/fetch",
            fetch_body(
                &h,
                &[REFERENCE, "jingui://other-vault/a/b"],
                &challenge_id,
                &challenge_response,
            ),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert!(json.get("secrets").is_none());
}
