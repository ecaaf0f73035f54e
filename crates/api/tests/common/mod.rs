#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use storyreel_api::config::ServerConfig;
use storyreel_api::router::build_app_router;
use storyreel_api::state::AppState;
use storyreel_client::config::ClientConfig;
use storyreel_core::batch::{Batch, BatchItem, BatchStatus};
use storyreel_orchestrator::runner::{
    ItemContext, ItemError, ItemOutput, ItemReporter, ItemRunner,
};
use storyreel_orchestrator::service::BatchService;
use storyreel_orchestrator::store::BatchStore;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        http_timeout_secs: 30,
        max_batches: 20,
        client: ClientConfig::default(),
    }
}

/// Item runner whose items stay processing until `gate` opens.
pub struct GateRunner {
    gate: CancellationToken,
}

#[async_trait]
impl ItemRunner for GateRunner {
    async fn run_item(
        &self,
        item: &BatchItem,
        _context: &ItemContext,
        reporter: &dyn ItemReporter,
        cancel: &CancellationToken,
    ) -> Result<ItemOutput, ItemError> {
        reporter.job_started(&format!("job-{}", item.id));
        tokio::select! {
            _ = cancel.cancelled() => Err(ItemError::Cancelled),
            _ = self.gate.cancelled() => Ok(ItemOutput {
                job_id: Some(format!("job-{}", item.id)),
                video_path: Some(format!("/videos/{}.mp4", item.id)),
            }),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub batches: Arc<BatchService>,
    /// Cancel to let every item complete.
    pub gate: CancellationToken,
}

impl TestApp {
    /// Open the gate: running and future items complete immediately.
    pub fn release_items(&self) {
        self.gate.cancel();
    }

    /// Wait (bounded) until the batch reaches `status`.
    pub async fn wait_for_status(&self, batch_id: &str, status: BatchStatus) {
        self.wait_until(batch_id, |b| b.status == status).await;
    }

    /// Wait (bounded) until an item of the batch is processing.
    pub async fn wait_for_running_item(&self, batch_id: &str) {
        self.wait_until(batch_id, |b| b.current_item().is_some()).await;
    }

    async fn wait_until(&self, batch_id: &str, done: impl Fn(&Batch) -> bool) {
        let reached = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if self.batches.get(batch_id).is_ok_and(|b| done(&b)) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(reached.is_ok(), "batch {batch_id} never reached the expected state");
    }
}

/// Build the full application router with all middleware layers.
///
/// Uses the same [`build_app_router`] as `main.rs`, with a gated item
/// runner in place of the execution engine.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let gate = CancellationToken::new();
    let runner = Arc::new(GateRunner { gate: gate.clone() });
    let batches = Arc::new(BatchService::new(
        Arc::new(BatchStore::new(config.max_batches)),
        runner,
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        batches: Arc::clone(&batches),
    };

    TestApp {
        router: build_app_router(state, &config),
        batches,
        gate,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &TestApp, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: &TestApp, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri, None).await
}

pub async fn post_json(app: &TestApp, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn delete(app: &TestApp, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
