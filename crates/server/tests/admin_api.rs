//! Admin surface tests: bearer auth, vault/item/instance CRUD, grants.

use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use http::{Request, StatusCode};
use tower::ServiceExt;

use jingui_common::attestation::RatlsVerifier;
use jingui_common::crypto::{self, MasterKey};
use jingui_server::database::Database;
use jingui_server::http_server;
use jingui_server::{ChallengeLedger, ServiceState};

const ADMIN_TOKEN: &str = "test-admin-token-0123456789";

async fn test_app() -> Router {
    let mut key_bytes = [0u8; 32];
    getrandom::getrandom(&mut key_bytes).unwrap();

    let state = ServiceState::new(
        Database::connect(":memory:").await.unwrap(),
        Arc::new(ChallengeLedger::new()),
        MasterKey::from(key_bytes),
        ADMIN_TOKEN.to_string(),
        false,
        Arc::new(RatlsVerifier::new()),
        None,
    );
    http_server::app(state, &[])
}

fn request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let body = match body {
        Some(v) => Body::from(v.to_string()),
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_admin_requires_bearer_token() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(request("GET", "/v1/vaults", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(request("GET", "/v1/vaults", Some("wrong-token-000000"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(request("GET", "/v1/vaults", Some(ADMIN_TOKEN), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_vault_crud_cycle() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/vaults",
            Some(ADMIN_TOKEN),
            Some(serde_json::json!({ "id": "v1", "name": "Vault One" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Duplicate id conflicts.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/vaults",
            Some(ADMIN_TOKEN),
            Some(serde_json::json!({ "id": "v1", "name": "Again" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            "/v1/vaults/v1",
            Some(ADMIN_TOKEN),
            Some(serde_json::json!({ "name": "Renamed" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request("GET", "/v1/vaults/v1", Some(ADMIN_TOKEN), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["name"], "Renamed");

    let response = app
        .clone()
        .oneshot(request("DELETE", "/v1/vaults/v1", Some(ADMIN_TOKEN), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request("GET", "/v1/vaults/v1", Some(ADMIN_TOKEN), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_item_storage_round_trips_through_encryption() {
    let app = test_app().await;

    app.clone()
        .oneshot(request(
            "POST",
            "/v1/vaults",
            Some(ADMIN_TOKEN),
            Some(serde_json::json!({ "id": "v1", "name": "V" })),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            "/v1/vaults/v1/items/alice@example.com",
            Some(ADMIN_TOKEN),
            Some(serde_json::json!({
                "fields": { "password": "hunter2", "username": "alice" },
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            "/v1/vaults/v1/items/alice@example.com",
            Some(ADMIN_TOKEN),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["fields"]["password"], "hunter2");
    assert_eq!(json["fields"]["username"], "alice");

    // Metadata listing carries no values.
    let response = app
        .clone()
        .oneshot(request("GET", "/v1/vaults/v1/items", Some(ADMIN_TOKEN), None))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
    assert!(json["items"][0].get("value").is_none());

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            "/v1/vaults/v1/items/alice@example.com",
            Some(ADMIN_TOKEN),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            "/v1/vaults/v1/items/alice@example.com",
            Some(ADMIN_TOKEN),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_instance_registration_derives_fid() {
    let app = test_app().await;

    let mut private = [0u8; 32];
    getrandom::getrandom(&mut private).unwrap();
    let public = crypto::derive_public_key(&private);
    let expected_fid = crypto::fid(&public);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/instances",
            Some(ADMIN_TOKEN),
            Some(serde_json::json!({
                "public_key": hex::encode(public),
                "app_id": "app-1",
                "label": "worker",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["fid"], expected_fid.as_str());

    // Bad key material is a 400.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/instances",
            Some(ADMIN_TOKEN),
            Some(serde_json::json!({ "public_key": "not-hex" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Same key again conflicts.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/instances",
            Some(ADMIN_TOKEN),
            Some(serde_json::json!({ "public_key": hex::encode(public) })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/v1/instances/{}", expected_fid),
            Some(ADMIN_TOKEN),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["public_key"], hex::encode(public));
    assert_eq!(json["app_id"], "app-1");
}

#[tokio::test]
async fn test_grant_lifecycle() {
    let app = test_app().await;

    app.clone()
        .oneshot(request(
            "POST",
            "/v1/vaults",
            Some(ADMIN_TOKEN),
            Some(serde_json::json!({ "id": "v1", "name": "V" })),
        ))
        .await
        .unwrap();

    let mut private = [0u8; 32];
    getrandom::getrandom(&mut private).unwrap();
    let public = crypto::derive_public_key(&private);
    let fid = crypto::fid(&public);
    app.clone()
        .oneshot(request(
            "POST",
            "/v1/instances",
            Some(ADMIN_TOKEN),
            Some(serde_json::json!({ "public_key": hex::encode(public) })),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/vaults/v1/instances/{}", fid),
            Some(ADMIN_TOKEN),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(request("GET", "/v1/vaults/v1/instances", Some(ADMIN_TOKEN), None))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["instances"].as_array().unwrap().len(), 1);
    assert_eq!(json["instances"][0]["fid"], fid.as_str());

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/v1/vaults/v1/instances/{}", fid),
            Some(ADMIN_TOKEN),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Granting against a missing instance is a 404.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/vaults/v1/instances/ffffffffffffffffffffffffffffffffffffffff",
            Some(ADMIN_TOKEN),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_fallback() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(request("GET", "/", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request("GET", "/v2/nope", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
