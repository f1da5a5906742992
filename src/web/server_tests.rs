use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tokio::sync::Mutex;

use super::auth::AppState;
use super::server::router;
use super::*;
use crate::background::TaskOptions;
use crate::connectivity::ConnectivityOracle;
use crate::location::LocationSource;
use crate::permission::RetryPolicy;
use crate::store::PointStore;
use crate::sync::SyncCoordinator;
use crate::test_helpers::{
    make_point, RecordingSink, ScriptedNetwork, ScriptedPermissions, ScriptedProvider,
};
use crate::tracker::{CaptureInterval, TrackerParts, TrackerScheduler};

const CONFIG: &str = r#"
storage:
  backlog_path: /tmp/unused.jsonl
remote:
  base_url: "http://127.0.0.1:9"
api_keys:
  - key: operator-key
    name: operator
    permissions: [control, read]
  - key: viewer-key
    name: viewer
    permissions: [read]
"#;

struct TestServer {
    _dir: TempDir,
    base: String,
    client: reqwest::Client,
    network: Arc<ScriptedNetwork>,
    sink: Arc<RecordingSink>,
    store: Arc<PointStore>,
}

impl TestServer {
    async fn start(permissions: ScriptedPermissions) -> Self {
        let retry = RetryPolicy {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
        };
        Self::with_retry(permissions, retry).await
    }

    async fn with_retry(permissions: ScriptedPermissions, retry: RetryPolicy) -> Self {
        let dir = tempdir().unwrap();
        let store = Arc::new(PointStore::open(&dir.path().join("backlog.jsonl")).unwrap());
        let network = Arc::new(ScriptedNetwork::new(false));
        let sink = Arc::new(RecordingSink::accepting());
        let oracle = ConnectivityOracle::new(network.clone(), Duration::from_secs(1));
        let coordinator = Arc::new(SyncCoordinator::new(store.clone(), oracle, sink.clone()));
        let parts = TrackerParts {
            location: Arc::new(LocationSource::new(
                Arc::new(ScriptedProvider::default()),
                Duration::from_secs(5),
            )),
            coordinator: coordinator.clone(),
            permissions: Arc::new(permissions),
            retry,
        };
        let tracker =
            TrackerScheduler::new(CaptureInterval::TenSeconds, parts, TaskOptions::default());

        let state = AppState {
            config: Arc::new(Config::from_str(CONFIG).unwrap()),
            tracker: Arc::new(Mutex::new(tracker)),
            coordinator,
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestServer {
            _dir: dir,
            base: format!("http://{}", addr),
            client: reqwest::Client::new(),
            network,
            sink,
            store,
        }
    }

    async fn call(
        &self,
        method: reqwest::Method,
        path: &str,
        key: Option<&str>,
        body: Option<Value>,
    ) -> (u16, Value) {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.base, path));
        if let Some(key) = key {
            request = request.bearer_auth(key);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.unwrap();
        let status = response.status().as_u16();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }
}

#[tokio::test]
async fn requests_without_key_are_unauthorized() {
    let server = TestServer::start(ScriptedPermissions::granted()).await;

    let (status, body) = server
        .call(reqwest::Method::GET, "/api/tracker/status", None, None)
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = server
        .call(reqwest::Method::GET, "/api/tracker/status", Some("wrong"), None)
        .await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn read_only_key_cannot_start() {
    let server = TestServer::start(ScriptedPermissions::granted()).await;

    let (status, body) = server
        .call(reqwest::Method::POST, "/api/tracker/start", Some("viewer-key"), None)
        .await;

    assert_eq!(status, 403);
    assert_eq!(body["error"], "forbidden");
    assert_eq!(body["message"], "requires control permission");
}

#[tokio::test]
async fn start_status_stop_cycle() {
    let server = TestServer::start(ScriptedPermissions::granted()).await;

    let (status, mode) = server
        .call(
            reqwest::Method::POST,
            "/api/tracker/start",
            Some("operator-key"),
            Some(json!({ "interval": "5s" })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(mode["Running"]["interval"], "5s");

    let (status, body) = server
        .call(reqwest::Method::GET, "/api/tracker/status", Some("viewer-key"), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["interval"], "5s");

    let (status, body) = server
        .call(
            reqwest::Method::PUT,
            "/api/tracker/interval",
            Some("operator-key"),
            Some(json!({ "interval": "1s" })),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"], "interval_locked");

    let (status, _) = server
        .call(reqwest::Method::POST, "/api/tracker/start", Some("operator-key"), None)
        .await;
    assert_eq!(status, 409);

    let (status, mode) = server
        .call(reqwest::Method::POST, "/api/tracker/stop", Some("operator-key"), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(mode, json!("Stopped"));
}

#[tokio::test]
async fn interval_selection_while_stopped() {
    let server = TestServer::start(ScriptedPermissions::granted()).await;

    let (status, body) = server
        .call(reqwest::Method::GET, "/api/tracker/intervals", Some("viewer-key"), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["allowed"], json!(["10s", "5s", "3s", "1s"]));
    assert_eq!(body["selected"], "10s");

    let (status, body) = server
        .call(
            reqwest::Method::PUT,
            "/api/tracker/interval",
            Some("operator-key"),
            Some(json!({ "interval": "3s" })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["selected"], "3s");

    let (status, _) = server
        .call(
            reqwest::Method::PUT,
            "/api/tracker/interval",
            Some("operator-key"),
            Some(json!({ "interval": "7s" })),
        )
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn denied_location_permission_is_forbidden() {
    let server = TestServer::start(ScriptedPermissions::denying(5)).await;

    let (status, body) = server
        .call(reqwest::Method::POST, "/api/tracker/start", Some("operator-key"), None)
        .await;

    assert_eq!(status, 403);
    assert_eq!(body["error"], "location_permission_denied");
}

#[tokio::test]
async fn backlog_listing_and_flush() {
    let server = TestServer::start(ScriptedPermissions::granted()).await;
    let first = make_point(1);
    let second = make_point(2);
    server.store.append(&first).await.unwrap();
    server.store.append(&second).await.unwrap();

    let (status, body) = server
        .call(reqwest::Method::GET, "/api/backlog", Some("viewer-key"), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["len"], 2);
    assert_eq!(body["points"][0]["id"], first.id.to_string());

    let (status, body) = server
        .call(reqwest::Method::POST, "/api/backlog/flush", Some("operator-key"), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["online"], false);
    assert_eq!(body["remaining"], 2);

    server.network.set_connected(true);
    let (_, body) = server
        .call(reqwest::Method::POST, "/api/backlog/flush", Some("operator-key"), None)
        .await;
    assert_eq!(body["online"], true);
    assert_eq!(body["delivered"], 2);
    assert_eq!(body["remaining"], 0);
    assert_eq!(server.sink.received_ids(), vec![first.id, second.id]);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let server = TestServer::start(ScriptedPermissions::granted()).await;

    let (status, body) = server
        .call(reqwest::Method::GET, "/api-doc/openapi.json", None, None)
        .await;

    assert_eq!(status, 200);
    assert!(body["paths"].get("/api/tracker/start").is_some());
}

#[tokio::test]
async fn status_answers_while_start_waits_for_permission() {
    let retry = RetryPolicy {
        max_attempts: 2,
        initial_backoff: Duration::from_millis(600),
        max_backoff: Duration::from_millis(600),
    };
    let server = TestServer::with_retry(ScriptedPermissions::denying(1), retry).await;

    let (started, (status, elapsed)) = tokio::join!(
        server.call(reqwest::Method::POST, "/api/tracker/start", Some("operator-key"), None),
        async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let begin = std::time::Instant::now();
            let (status, _) = server
                .call(reqwest::Method::GET, "/api/tracker/status", Some("viewer-key"), None)
                .await;
            (status, begin.elapsed())
        }
    );

    assert_eq!(started.0, 200);
    assert_eq!(status, 200);
    assert!(elapsed < Duration::from_millis(400), "status took {:?}", elapsed);

    let (_, mode) = server
        .call(reqwest::Method::POST, "/api/tracker/stop", Some("operator-key"), None)
        .await;
    assert_eq!(mode, json!("Stopped"));
}
