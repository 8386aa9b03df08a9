mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn root_and_health_respond() {
    let app = TestApp::new();

    let (status, body) = app.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["database"], json!("ok"));
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/clients", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));

    let (status, body) = app.get("/api/clients", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("Invalid or expired token"));
}

#[tokio::test]
async fn malformed_input_uses_the_error_envelope() {
    let app = TestApp::new();
    let token = common::staff_token();

    let (status, body) = app.get("/api/clients?where=not-json", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));

    let (status, _) = app.post("/api/clients", Some(&token), json!({ "name": "x", "id": "forced" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/clients/any/unknown-kind", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn spawned_server_logs_in_the_seeded_admin() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({ "email": common::SEED_ADMIN_EMAIL, "password": common::SEED_ADMIN_PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = res.json().await?;
    let token = body["data"]["token"].as_str().expect("token in login response");
    assert!(body["data"]["user"].get("passwordHash").is_none());

    let res = client
        .get(format!("{}/api/auth/whoami", server.base_url))
        .bearer_auth(token)
        .send()
        .await?;
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = res.json().await?;
    assert_eq!(body["data"]["session"]["role"], json!(1));
    assert_eq!(body["data"]["user"]["email"], json!(common::SEED_ADMIN_EMAIL));
    Ok(())
}
