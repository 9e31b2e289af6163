//! Router test utilities

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::header::{CONTENT_TYPE, ORIGIN, USER_AGENT};
use axum::http::{Method, Request, Response, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use update_checker::config::ServerConfig;
use update_checker::server::{AppState, router};
use update_checker::store::{DEFAULT_BUSY_TIMEOUT, Store};

use super::registry::MockRegistry;

pub const CHECK_ATTRS: [&str; 4] = ["package_name", "package_version", "platform", "python_version"];

/// Default check body; a `None` override removes the field
pub fn check_data(overrides: &[(&str, Option<&str>)]) -> Value {
    let mut data = json!({
        "package_name": "praw",
        "package_version": "3.6.0",
        "platform": "darwin-16.1.0-x86_64-64bit",
        "python_version": "3.5"
    });
    let fields = data.as_object_mut().unwrap();
    for (key, value) in overrides {
        match value {
            Some(value) => fields.insert(key.to_string(), json!(value)),
            None => fields.remove(*key),
        };
    }
    data
}

pub fn praw_registry() -> MockRegistry {
    MockRegistry::new()
        .with_releases(
            "praw",
            &[
                ("3.5.0", "2016-05-01T10:00:00Z"),
                ("3.6.0", "2016-12-14T05:03:23Z"),
                ("4.0.0b1", "2016-11-20T00:00:00Z"),
                ("4.0.0rc3", "2016-12-20T00:00:00Z"),
            ],
        )
        .with_releases("prawtools", &[("0.19", "2015-06-01T00:00:00Z")])
}

pub struct TestApp {
    _temp_dir: TempDir,
    pub db_path: PathBuf,
    pub config: ServerConfig,
    pub store: Arc<Store>,
    pub registry: Arc<MockRegistry>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_registry(praw_registry())
    }

    pub fn with_registry(registry: MockRegistry) -> Self {
        Self::build(registry, DEFAULT_BUSY_TIMEOUT)
    }

    /// App whose store gives up on a locked database after `busy_timeout`
    pub fn with_busy_timeout(busy_timeout: Duration) -> Self {
        Self::build(praw_registry(), busy_timeout)
    }

    fn build(registry: MockRegistry, busy_timeout: Duration) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let store = Arc::new(Store::with_busy_timeout(&db_path, busy_timeout).unwrap());
        let registry = Arc::new(registry);
        let config = ServerConfig::default();

        let state = AppState::new(config.clone(), Arc::clone(&store), registry.clone());

        Self {
            _temp_dir: temp_dir,
            db_path,
            config,
            store,
            registry,
            router: router(state),
        }
    }

    async fn send(&self, mut request: Request<Body>, ip_last: u8) -> Response<Body> {
        request.extensions_mut().insert(peer(ip_last));
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// `PUT /check` from 127.0.0.`ip_last` with the given user agent
    pub async fn check_from(&self, body: &Value, ip_last: u8, user_agent: &str) -> Response<Body> {
        self.send(check_request(body, user_agent), ip_last).await
    }

    /// `PUT /check` running as its own task on the test runtime
    pub fn spawn_check(&self, body: &Value) -> JoinHandle<Response<Body>> {
        let mut request = check_request(body, "python-requests/2.12.4");
        request.extensions_mut().insert(peer(1));
        let router = self.router.clone();
        tokio::spawn(async move { router.oneshot(request).await.unwrap() })
    }

    pub async fn check(&self, body: &Value) -> Response<Body> {
        self.check_from(body, 1, "python-requests/2.12.4").await
    }

    pub async fn get(&self, path: &str, origin: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(origin) = origin {
            builder = builder.header(ORIGIN, origin);
        }
        self.send(builder.body(Body::empty()).unwrap(), 1).await
    }

    /// `GET /packages` body, asserting a 200 response
    pub async fn packages(&self) -> Vec<Value> {
        let response = self.get("/packages", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        serde_json::from_value(body_json(response).await).unwrap()
    }
}

fn peer(ip_last: u8) -> ConnectInfo<SocketAddr> {
    ConnectInfo(SocketAddr::from(([127, 0, 0, ip_last], 50000)))
}

fn check_request(body: &Value, user_agent: &str) -> Request<Body> {
    Request::builder()
        .method(Method::PUT)
        .uri("/check")
        .header(CONTENT_TYPE, "application/json")
        .header(USER_AGENT, user_agent)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
