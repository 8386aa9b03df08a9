mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{staff_token, TestApp};

#[tokio::test]
async fn created_user_can_log_in_and_sees_own_tenant() {
    let app = TestApp::new();
    let (client_id, _) = app.create_client("Acme").await;

    let (status, body) = app
        .post(
            "/api/users",
            Some(&staff_token()),
            json!({
                "email": "owner@acme.test",
                "password": "owner-password",
                "name": "Owner",
                "role": 4,
                "clientId": client_id,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["data"].get("passwordHash").is_none());

    let (status, body) = app
        .post("/api/auth/login", None, json!({ "email": "OWNER@acme.test", "password": "owner-password" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["user"]["clientId"], json!(client_id));

    let (status, body) = app.get("/api/auth/whoami", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["session"]["role"], json!(4));
    assert_eq!(body["data"]["session"]["clientId"], json!(client_id));

    let (status, _) = app.get(&format!("/api/clients/{}", client_id), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn user_validation_and_conflicts() {
    let app = TestApp::new();
    let user = json!({ "email": "pat@tsc.test", "password": "long-enough", "name": "Pat", "role": 3 });

    let (status, _) = app.post("/api/users", Some(&staff_token()), user.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app.post("/api/users", Some(&staff_token()), user).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));

    let (status, body) = app
        .post(
            "/api/users",
            Some(&staff_token()),
            json!({ "email": "not-an-email", "password": "short", "name": "X", "role": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fieldErrors"]["email"].is_string());
    assert!(body["fieldErrors"]["password"].is_string());

    let (status, _) = app
        .post(
            "/api/users",
            Some(&staff_token()),
            json!({ "email": "x@tsc.test", "password": "long-enough", "name": "X", "role": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bad_logins_share_one_response() {
    let app = TestApp::new();
    app.post(
        "/api/users",
        Some(&staff_token()),
        json!({ "email": "pat@tsc.test", "password": "long-enough", "name": "Pat", "role": 3 }),
    )
    .await;

    let (s1, wrong) = app
        .post("/api/auth/login", None, json!({ "email": "pat@tsc.test", "password": "nope" }))
        .await;
    let (s2, unknown) = app
        .post("/api/auth/login", None, json!({ "email": "who@tsc.test", "password": "long-enough" }))
        .await;
    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn tag_assigned_twice_conflicts() {
    let app = TestApp::new();
    let (_, body) = app.post("/api/technicians", Some(&staff_token()), json!({ "name": "Sam" })).await;
    let tags = format!("/api/technicians/{}/tags", body["data"]["id"].as_str().unwrap());

    let (status, _) = app.post(&tags, Some(&staff_token()), json!({ "tag": "chemical-licence" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app.post(&tags, Some(&staff_token()), json!({ "tag": "chemical-licence" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));

    let (_, body) = app.get(&tags, Some(&staff_token())).await;
    assert_eq!(body["data"]["total"], json!(1));
}
