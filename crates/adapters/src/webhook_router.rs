//! Webhook routes.
//!
//! `POST /webhook` runs the extractor and answers immediately; accepted
//! issues are relayed on a tracked background task so the relay outcome never
//! reaches the caller. `GET /health` always reports healthy.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use issue_relay_dispatch::RelayDispatcher;
use issue_relay_protocol::{extract, ExtractOutcome, NormalizedIssue};
use serde_json::{json, Value};
use tokio_util::task::TaskTracker;
use tracing::{error, info, info_span, warn, Instrument};

/// Path receiving GitLab webhooks.
pub const WEBHOOK_PATH: &str = "/webhook";
/// Liveness endpoint.
pub const HEALTH_PATH: &str = "/health";
/// Largest webhook body read into memory.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Shared handler state: the relay dispatcher, injected at startup, and the
/// relays still running.
#[derive(Clone)]
pub struct WebhookRouter {
    dispatcher: Arc<RelayDispatcher>,
    relays: TaskTracker,
}

impl WebhookRouter {
    /// Creates a new [`WebhookRouter`] around a configured dispatcher.
    pub fn new(dispatcher: RelayDispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            relays: TaskTracker::new(),
        }
    }

    /// Access the dispatcher used for accepted issues.
    pub fn dispatcher(&self) -> &RelayDispatcher {
        &self.dispatcher
    }

    /// Number of relays that have not finished yet.
    pub fn pending_relays(&self) -> usize {
        self.relays.len()
    }

    /// Build the axum router serving both endpoints.
    pub fn into_router(self) -> Router {
        Router::new()
            .route(WEBHOOK_PATH, post(receive_webhook))
            .route(HEALTH_PATH, get(health))
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .with_state(self)
    }

    /// Wait for running relays so their outcome is logged before exit.
    ///
    /// Returns `false` if some were still running after `limit`.
    pub async fn drain_relays(&self, limit: Duration) -> bool {
        self.relays.close();
        let pending = self.relays.len();
        if pending > 0 {
            info!(pending, "Waiting for running relays");
        }

        match tokio::time::timeout(limit, self.relays.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    pending = self.relays.len(),
                    limit_ms = limit.as_millis() as u64,
                    "Relays still running at shutdown were abandoned"
                );
                false
            }
        }
    }

    /// Relay in the background; the outcome is only logged.
    fn spawn_relay(&self, issue: NormalizedIssue) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let span = info_span!("relay", mode = dispatcher.config().mode(), number = %issue.number);
        self.relays.spawn(
            async move {
                dispatcher.dispatch(&issue).await;
            }
            .instrument(span),
        );
    }
}

async fn receive_webhook(
    State(router): State<WebhookRouter>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(
                status = %rejection.status(),
                error = %rejection.body_text(),
                "Could not read webhook body"
            );
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid JSON payload" })),
            )
                .into_response();
        }
    };

    info_span!("webhook", bytes = body.len()).in_scope(|| handle_webhook(&router, &body, extract))
}

fn handle_webhook<F>(router: &WebhookRouter, body: &[u8], extractor: F) -> Response
where
    F: FnOnce(&[u8]) -> ExtractOutcome,
{
    let outcome = match catch_unwind(AssertUnwindSafe(|| extractor(body))) {
        Ok(outcome) => outcome,
        Err(_) => {
            error!("Error processing webhook: extractor panicked");
            return internal_error();
        }
    };

    let (status, reply, issue) = reply_for(outcome);
    if let Some(issue) = issue {
        router.spawn_relay(issue);
    }
    (status, Json(reply)).into_response()
}

/// Status and body answered for an extractor outcome, plus the issue to relay.
pub fn reply_for(outcome: ExtractOutcome) -> (StatusCode, Value, Option<NormalizedIssue>) {
    match outcome {
        ExtractOutcome::Rejected(e) => (
            StatusCode::BAD_REQUEST,
            json!({ "error": e.client_message() }),
            None,
        ),
        ExtractOutcome::Ignored(kind) => (
            StatusCode::OK,
            json!({ "status": "acknowledged", "type": kind }),
            None,
        ),
        ExtractOutcome::Accepted(issue) => (
            StatusCode::OK,
            json!({ "status": "success", "message": "Issue processed" }),
            Some(issue),
        ),
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, Uri};
    use issue_relay_dispatch::{GenericRelayConfig, PipelineRelayConfig, RelayConfig, Secret};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn app(config: RelayConfig) -> Router {
        WebhookRouter::new(RelayDispatcher::new(config).unwrap()).into_router()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_webhook(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(WEBHOOK_PATH)
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    /// Remote that records request paths and answers with `status`.
    async fn spawn_remote(status: StatusCode) -> (String, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let remote = Router::new().fallback(move |uri: Uri| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(uri.path().to_string());
                status
            }
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, remote).await.unwrap();
        });

        (format!("http://{}", addr), rx)
    }

    #[tokio::test]
    async fn test_health_is_always_healthy() {
        for config in [
            RelayConfig::Disabled,
            RelayConfig::Generic(GenericRelayConfig::default()),
            RelayConfig::Pipeline(PipelineRelayConfig::default()),
        ] {
            let request = Request::builder()
                .uri(HEALTH_PATH)
                .body(Body::empty())
                .unwrap();
            let (status, body) = send(app(config), request).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({ "status": "healthy" }));
        }
    }

    #[tokio::test]
    async fn test_issue_event_processed() {
        let payload = json!({
            "object_kind": "issue",
            "object_attributes": { "iid": 42, "title": "T" },
        });

        let (status, body) = send(app(RelayConfig::Disabled), post_webhook(payload.to_string())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "success", "message": "Issue processed" }));
    }

    #[tokio::test]
    async fn test_other_kind_acknowledged() {
        let payload = json!({ "object_kind": "merge_request", "object_attributes": { "iid": 1 } });

        let (status, body) = send(app(RelayConfig::Disabled), post_webhook(payload.to_string())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "acknowledged", "type": "merge_request" }));
    }

    #[tokio::test]
    async fn test_null_kind_echoed_as_null() {
        let payload = json!({ "object_kind": null, "ref": "refs/heads/main" });

        let (status, body) = send(app(RelayConfig::Disabled), post_webhook(payload.to_string())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "acknowledged", "type": null }));
    }

    #[tokio::test]
    async fn test_extractor_panic_answers_500() {
        let router = WebhookRouter::new(RelayDispatcher::new(RelayConfig::Disabled).unwrap());

        let response = handle_webhook(&router, b"{}", |_: &[u8]| -> ExtractOutcome {
            panic!("extractor bug")
        });

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "Internal server error" }));
        assert_eq!(router.pending_relays(), 0);
    }

    #[tokio::test]
    async fn test_oversized_body_answers_json_error() {
        let oversized = vec![b' '; MAX_BODY_BYTES + 1];

        let (status, body) = send(app(RelayConfig::Disabled), post_webhook(oversized)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid JSON payload" }));
    }

    #[tokio::test]
    async fn test_drain_waits_for_relays() {
        let (base, mut requests) = spawn_remote(StatusCode::OK).await;
        let router = WebhookRouter::new(
            RelayDispatcher::new(RelayConfig::Generic(GenericRelayConfig {
                target_url: Some(base),
            }))
            .unwrap(),
        );
        let payload = json!({ "object_kind": "issue", "object_attributes": { "iid": 4 } });

        let (status, _) = send(router.clone().into_router(), post_webhook(payload.to_string())).await;
        assert_eq!(status, StatusCode::OK);

        assert!(router.drain_relays(Duration::from_secs(5)).await);
        assert_eq!(router.pending_relays(), 0);
        assert!(requests.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let (status, body) = send(app(RelayConfig::Disabled), post_webhook(Body::empty())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "No JSON payload" }));

        let (status, body) = send(app(RelayConfig::Disabled), post_webhook("{oops")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid JSON payload" }));

        let payload = json!({ "object_kind": "issue" }).to_string();
        let (status, body) = send(app(RelayConfig::Disabled), post_webhook(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "No issue data found" }));
    }

    #[tokio::test]
    async fn test_missing_target_still_succeeds() {
        let payload = json!({ "object_kind": "issue", "object_attributes": { "iid": 3 } });
        let config = RelayConfig::Generic(GenericRelayConfig { target_url: None });

        let (status, _) = send(app(config), post_webhook(payload.to_string())).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_pipeline_auth_failure_not_surfaced() {
        let (base, mut requests) = spawn_remote(StatusCode::UNAUTHORIZED).await;
        let config = RelayConfig::Pipeline(PipelineRelayConfig {
            project_id: Some("123".to_string()),
            token: Some(Secret::new("expired")),
            ref_name: Some("main".to_string()),
            base_url: Some(base),
            accept_invalid_certs: false,
        });
        let payload = json!({ "object_kind": "issue", "object_attributes": { "iid": 9 } });

        let (status, body) = send(app(config), post_webhook(payload.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");

        let path = tokio::time::timeout(Duration::from_secs(5), requests.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(path, "/api/v4/projects/123/trigger/pipeline");
    }

    #[tokio::test]
    async fn test_ignored_kind_makes_no_relay_call() {
        let (base, mut requests) = spawn_remote(StatusCode::OK).await;
        let config = RelayConfig::Generic(GenericRelayConfig {
            target_url: Some(base),
        });
        let payload = json!({ "object_kind": "note" });

        let (status, _) = send(app(config), post_webhook(payload.to_string())).await;
        assert_eq!(status, StatusCode::OK);

        let waited = tokio::time::timeout(Duration::from_millis(200), requests.recv()).await;
        assert!(waited.is_err(), "no relay call expected");
    }
}
