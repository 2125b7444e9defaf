//! Webhook intake.
//!
//! One JSON body per POST, one `{outcome, detail}` response per request.
//! The pipeline runs on its own task so a caller that hangs up early
//! cannot abort a reconciliation half way.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use hostsync_core::{InventoryEvent, Outcome, Pipeline, RejectReason, SyncError};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/", post(webhook))
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { pipeline })
}

/// Serve until `shutdown` resolves, then finish in-flight requests.
pub async fn serve(
    listener: TcpListener,
    pipeline: Arc<Pipeline>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "webhook receiver listening");
    }
    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health() -> Response {
    (StatusCode::OK, axum::Json(json!({ "status": "ok" }))).into_response()
}

async fn webhook(State(state): State<AppState>, body: Bytes) -> Response {
    let event = match InventoryEvent::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            info!(error = %e, "rejecting malformed webhook");
            return error_response(&e);
        }
    };

    let pipeline = Arc::clone(&state.pipeline);
    match tokio::spawn(async move { pipeline.handle(&event).await }).await {
        Ok(Ok(outcome)) => respond(outcome_status(&outcome), outcome.kind(), outcome.detail()),
        Ok(Err(e)) => error_response(&e),
        Err(join) => {
            error!(error = %join, "event task failed");
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "event processing aborted".into(),
            )
        }
    }
}

fn error_response(err: &SyncError) -> Response {
    respond(error_status(err), err.kind(), err.to_string())
}

fn respond(status: StatusCode, outcome: &str, detail: String) -> Response {
    (status, axum::Json(json!({ "outcome": outcome, "detail": detail }))).into_response()
}

pub fn outcome_status(outcome: &Outcome) -> StatusCode {
    match outcome {
        Outcome::Rejected(RejectReason::UnrecognizedPlatform) => StatusCode::UNPROCESSABLE_ENTITY,
        Outcome::Rejected(_) => StatusCode::BAD_REQUEST,
        Outcome::NoChange { .. } | Outcome::Updated(_) => StatusCode::OK,
        Outcome::Provisioned(_) => StatusCode::CREATED,
    }
}

pub fn error_status(err: &SyncError) -> StatusCode {
    match err {
        SyncError::MalformedInput { .. } => StatusCode::BAD_REQUEST,
        SyncError::LookupTransport { .. } | SyncError::ApplyTransport { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        SyncError::LookupApplication { .. }
        | SyncError::ApplyApplication { .. }
        | SyncError::ProvisioningFailure { .. } => StatusCode::BAD_GATEWAY,
        SyncError::AmbiguousLookup { .. } => StatusCode::CONFLICT,
        SyncError::UnresolvedReferenceName { .. } | SyncError::Startup { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use hostsync_core::{
        HostDirectory, Lookup, MonitoringRecord, ProvisionRequest, Provisioner, ReferenceData,
    };
    use pretty_assertions::assert_eq;
    use tokio::sync::oneshot;

    use super::*;

    struct FakeDirectory {
        existing: Option<MonitoringRecord>,
        fail_lookup: bool,
    }

    #[async_trait]
    impl HostDirectory for FakeDirectory {
        async fn find_by_ip(&self, ip: &str) -> Result<Lookup, SyncError> {
            if self.fail_lookup {
                return Err(SyncError::LookupTransport {
                    ip: ip.into(),
                    message: "timed out".into(),
                });
            }
            Ok(self
                .existing
                .clone()
                .map_or(Lookup::NotFound, Lookup::Found))
        }

        async fn update_host(&self, _update: &hostsync_core::HostUpdate) -> Result<(), SyncError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeProvisioner {
        requests: Mutex<Vec<ProvisionRequest>>,
    }

    #[async_trait]
    impl Provisioner for FakeProvisioner {
        async fn provision(&self, request: &ProvisionRequest) -> Result<(), SyncError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    struct Running {
        base: String,
        provisioner: Arc<FakeProvisioner>,
        stop: Option<oneshot::Sender<()>>,
        task: tokio::task::JoinHandle<std::io::Result<()>>,
    }

    impl Running {
        async fn shutdown(mut self) {
            if let Some(stop) = self.stop.take() {
                let _ = stop.send(());
            }
            self.task.await.unwrap().unwrap();
        }
    }

    async fn start(directory: FakeDirectory) -> Running {
        let provisioner = Arc::new(FakeProvisioner::default());
        let pipeline = Arc::new(Pipeline::new(
            Arc::new(directory),
            provisioner.clone(),
            Arc::new(ReferenceData::default()),
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(serve(listener, pipeline, async move {
            let _ = stopped.await;
        }));

        Running {
            base,
            provisioner,
            stop: Some(stop),
            task,
        }
    }

    fn payload(status: &str, platform: &str) -> serde_json::Value {
        json!({
            "event": "created",
            "data": {
                "name": "web01",
                "status": { "value": status },
                "primary_ip": { "address": "10.0.0.5/24" },
                "platform": { "name": platform },
                "tags": []
            }
        })
    }

    async fn post(base: &str, body: &serde_json::Value) -> (u16, serde_json::Value) {
        let resp = reqwest::Client::new()
            .post(format!("{base}/webhook"))
            .json(body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    #[test]
    fn outcome_status_mapping() {
        assert_eq!(
            outcome_status(&Outcome::Rejected(RejectReason::Inactive)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            outcome_status(&Outcome::Rejected(RejectReason::UnrecognizedPlatform)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            outcome_status(&Outcome::NoChange {
                hostid: "1".into()
            }),
            StatusCode::OK
        );
    }

    #[test]
    fn error_status_mapping() {
        let cases = [
            (
                SyncError::LookupTransport {
                    ip: "x".into(),
                    message: String::new(),
                },
                503,
            ),
            (
                SyncError::ApplyApplication {
                    host: "x".into(),
                    message: String::new(),
                },
                502,
            ),
            (
                SyncError::AmbiguousLookup {
                    ip: "x".into(),
                    count: 2,
                },
                409,
            ),
            (
                SyncError::UnresolvedReferenceName {
                    kind: hostsync_core::RefKind::Group,
                    name: "x".into(),
                },
                500,
            ),
            (
                SyncError::ProvisioningFailure {
                    host: "x".into(),
                    status: "exit status: 2".into(),
                    output: String::new(),
                },
                502,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(error_status(&err).as_u16(), expected, "{}", err.kind());
        }
    }

    #[tokio::test]
    async fn provisions_unknown_host() {
        let server = start(FakeDirectory {
            existing: None,
            fail_lookup: false,
        })
        .await;

        let (status, body) = post(&server.base, &payload("active", "Ubuntu")).await;

        assert_eq!(status, 201);
        assert_eq!(body["outcome"], "provisioned");
        assert_eq!(server.provisioner.requests.lock().unwrap().len(), 1);
        server.shutdown().await;
    }

    #[tokio::test]
    async fn rejections_and_failures() {
        let server = start(FakeDirectory {
            existing: None,
            fail_lookup: true,
        })
        .await;

        let (status, body) = post(&server.base, &payload("offline", "Ubuntu")).await;
        assert_eq!(status, 400);
        assert_eq!(body["outcome"], "rejected");

        let (status, _) = post(&server.base, &payload("active", "FreeBSD")).await;
        assert_eq!(status, 422);

        let (status, body) = post(&server.base, &payload("active", "Ubuntu")).await;
        assert_eq!(status, 503);
        assert_eq!(body["outcome"], "lookup_transport");

        let (status, body) = post(&server.base, &json!({ "data": { "name": "x" } })).await;
        assert_eq!(status, 400);
        assert_eq!(body["outcome"], "malformed_input");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn only_post_is_accepted() {
        let server = start(FakeDirectory {
            existing: None,
            fail_lookup: false,
        })
        .await;
        let client = reqwest::Client::new();

        let resp = client.get(format!("{}/", server.base)).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 405);

        let resp = client
            .post(format!("{}/", server.base))
            .body("not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400);

        let resp = client
            .get(format!("{}/health", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);

        server.shutdown().await;
    }
}
