#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use folio_api::clock::ManualClock;
use folio_api::database::{Connector, MemoryConnector};
use folio_api::{router, AppConfig, AppState};

pub const PASSWORD: &str = "correct-horse";

/// In-process application backed by the memory store and a manual clock.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub upload_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    pub fn with_env(extra: &[(&str, &str)]) -> Self {
        Self::with_connector(Arc::new(MemoryConnector::new()), extra)
    }

    pub fn with_connector(connector: Arc<dyn Connector>, extra: &[(&str, &str)]) -> Self {
        let upload_dir = tempfile::tempdir().expect("temp upload dir");
        let upload_path = upload_dir.path().to_string_lossy().into_owned();

        let mut env: Vec<(String, String)> = vec![
            ("DATABASE_URL".to_string(), "memory://".to_string()),
            ("JWT_SECRET".to_string(), "integration-secret".to_string()),
            ("SECURITY_BCRYPT_COST".to_string(), "4".to_string()),
            ("UPLOAD_DIR".to_string(), upload_path),
        ];
        env.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        let config = AppConfig::from_lookup(|key| {
            env.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        })
        .expect("valid test config");

        let clock = Arc::new(ManualClock::default());
        let state = AppState::with_connector(config, connector, clock.clone()).expect("app state");

        Self {
            router: router(state.clone()),
            state,
            clock,
            upload_dir,
        }
    }

    /// Send a request and return status plus the raw body bytes.
    pub async fn send_raw(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
        (status, bytes.to_vec())
    }

    /// Send a request and decode the body as JSON (`Null` when empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = self.send_raw(request).await;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        self.send(json_request(method, uri, token, body)).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None, None).await
    }

    /// Register an admin and return the issued token.
    pub async fn register(&self, username: &str, email: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/admin/register",
                None,
                Some(json!({ "username": username, "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["data"]["token"].as_str().expect("token").to_string()
    }

    pub async fn login(&self, handle: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/admin/login",
                None,
                Some(json!({ "username": handle, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"]["token"].as_str().expect("token").to_string()
    }

    /// Register the default admin and return a token.
    pub async fn admin_token(&self) -> String {
        self.register("admin", "admin@example.com").await
    }

    /// Create a project as `token` and return its id.
    pub async fn create_project(&self, token: &str, payload: Value) -> String {
        let (status, body) = self
            .request(Method::POST, "/api/projects", Some(token), Some(payload))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["data"]["project"]["id"].as_str().expect("project id").to_string()
    }
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("valid request")
}

pub fn project_payload(title: &str, status: &str) -> Value {
    json!({
        "title": title,
        "description": "A project long enough to describe",
        "technologies": ["rust", "axum"],
        "githubUrl": "https://github.com/folio/example",
        "status": status,
    })
}

/// The real binary, spawned on a free port with the in-memory store.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
    _upload_dir: TempDir,
}

impl TestServer {
    pub fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let upload_dir = tempfile::tempdir().context("failed to create upload dir")?;

        let child = Command::new(env!("CARGO_BIN_EXE_folio-api"))
            .env("FOLIO_API_PORT", port.to_string())
            .env("DATABASE_URL", "memory://")
            .env("JWT_SECRET", "smoke-test-secret")
            .env("UPLOAD_DIR", upload_dir.path())
            .env("RUST_LOG", "folio_api=warn")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            child,
            _upload_dir: upload_dir,
        })
    }

    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/api/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK
                    || resp.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE
                {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
