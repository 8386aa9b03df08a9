#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use spraycare_api::auth::{generate_jwt, Claims};
use spraycare_api::database::MemoryDocumentStore;
use spraycare_api::types::Role;
use spraycare_api::AppState;

pub const SEED_ADMIN_EMAIL: &str = "admin@spraycare.test";
pub const SEED_ADMIN_PASSWORD: &str = "seed-admin-password";

/// Router over a fresh in-memory store, driven with `oneshot`
pub struct TestApp {
    pub store: Arc<MemoryDocumentStore>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryDocumentStore::new());
        let router = spraycare_api::app(AppState::new(store.clone()));
        Self { store, router }
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Create a client as staff and return `(id, accessToken)`
    pub async fn create_client(&self, name: &str) -> (String, String) {
        let (status, body) = self.post("/api/clients", Some(&staff_token()), serde_json::json!({ "name": name })).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let data = &body["data"];
        (data["id"].as_str().unwrap().to_string(), data["accessToken"].as_str().unwrap().to_string())
    }

    /// Create a nested client record as staff and return its document
    pub async fn create_child(&self, client_id: &str, kind: &str, body: Value) -> Value {
        let uri = format!("/api/clients/{}/{}", client_id, kind);
        let (status, body) = self.post(&uri, Some(&staff_token()), body).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }
}

pub fn token_for(user_id: &str, role: Role, client_id: Option<&str>) -> String {
    generate_jwt(&Claims::new(user_id, role, client_id.map(str::to_string))).unwrap()
}

pub fn staff_token() -> String {
    token_for("staff-user", Role::SuperAdmin, None)
}

pub fn portal_token(client_id: &str) -> String {
    token_for("portal-user", Role::ClientUser, Some(client_id))
}

/// The real binary on a free port with the memory store and a seeded admin
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

static SERVER: OnceLock<TestServer> = OnceLock::new();

impl TestServer {
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_spraycare-api"))
            .args(["serve", "--memory", "--port", &port.to_string()])
            .env("APP_ENV", "development")
            .env("SEED_ADMIN_EMAIL", SEED_ADMIN_EMAIL)
            .env("SEED_ADMIN_PASSWORD", SEED_ADMIN_PASSWORD)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}
