#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use api_moduled::app::{router, AppState};
use api_moduled::config::AppConfig;
use api_moduled::executor::ProcessRunner;
use api_moduled::registry::HandlerRegistry;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const SECRET: &str = "test-secret";
pub const EXEC_PATH: &str = "/usr/bin:/bin";

/// Handler and public directories in a temp dir.
///
/// Handler programs are symlinks to system binaries, which avoids writing
/// and then executing fresh script files from a multi-threaded test.
pub struct HandlerTree {
    root: TempDir,
}

impl HandlerTree {
    pub fn new() -> Self {
        let mut root = TempDir::new().expect("temp dir");
        // Tests build the router from a temporary tree (`HandlerTree::new()...app()`),
        // so the directory must outlive the tree value itself.
        root.disable_cleanup(true);
        fs::create_dir(root.path().join("handlers")).expect("handlers dir");
        fs::create_dir(root.path().join("public")).expect("public dir");
        Self { root }
    }

    pub fn handler_dir(&self) -> PathBuf {
        self.root.path().join("handlers")
    }

    pub fn public_dir(&self) -> PathBuf {
        self.root.path().join("public")
    }

    /// `<handlers>/<name>/post` -> `program`
    pub fn route(self, name: &str, program: &str) -> Self {
        let dir = self.handler_dir().join(name);
        fs::create_dir_all(&dir).expect("route dir");
        symlink(program, dir.join("post")).expect("symlink post");
        self
    }

    pub fn input_schema(self, name: &str, schema: &str) -> Self {
        self.write(name, "validate-input.json", schema)
    }

    pub fn output_schema(self, name: &str, schema: &str) -> Self {
        self.write(name, "validate-output.json", schema)
    }

    pub fn public_file(self, name: &str, contents: &str) -> Self {
        fs::write(self.public_dir().join(name), contents).expect("public file");
        self
    }

    fn write(self, name: &str, file: &str, contents: &str) -> Self {
        let dir = self.handler_dir().join(name);
        fs::create_dir_all(&dir).expect("route dir");
        fs::write(dir.join(file), contents).expect("schema file");
        self
    }

    pub fn config(&self) -> AppConfig {
        let handler_dir = self.handler_dir().display().to_string();
        let public_dir = self.public_dir().display().to_string();
        AppConfig::from_vars(|key| match key {
            "PATH" => Some(EXEC_PATH.to_string()),
            "AMLD_HANDLER_DIR" => Some(handler_dir.clone()),
            "AMLD_PUBLIC_DIR" => Some(public_dir.clone()),
            "AMLD_JWT_SECRET" => Some(SECRET.to_string()),
            "AMLD_EXEC_TIMEOUT" => Some("10s".to_string()),
            _ => None,
        })
    }

    pub fn app(&self) -> Router {
        let config = self.config();
        let registry = HandlerRegistry::build(&config.server.handler_dir);
        let runner = Arc::new(ProcessRunner::new(config.exec.timeout));
        router(AppState::new(config, registry, runner))
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }
}

pub fn post(uri: &str, body: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("request")
}

/// Send one request through the router and decode the body.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.expect("infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, bytes.to_vec())
}

pub async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("response is not JSON ({}): {}", e, String::from_utf8_lossy(&bytes)));
    (status, value)
}

/// Log in with credentials the `login` handler echoes back as claims.
pub async fn login(app: &Router, claims: &str) -> String {
    let (status, body) = send_json(app, post("/api/login", claims, None)).await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().expect("token").to_string()
}

/// The built binary, listening on a free port.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    pub fn spawn(tree: &HandlerTree) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_api-moduled"))
            .env_clear()
            .env("PATH", EXEC_PATH)
            .env("RUST_LOG", "warn")
            .env("AMLD_BIND_ADDRESS", format!("127.0.0.1:{}", port))
            .env("AMLD_HANDLER_DIR", tree.handler_dir())
            .env("AMLD_PUBLIC_DIR", tree.public_dir())
            .env("AMLD_JWT_SECRET", SECRET)
            .current_dir(tree.path())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/api/logout", self.base_url);
            // Any HTTP answer means the listener is up
            if client.post(&url).send().await.is_ok() {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
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
