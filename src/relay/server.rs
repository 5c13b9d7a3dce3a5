//! HTTP front of the relay: one endpoint that runs a build on behalf of a
//! midtier or edge host that cannot reach AWX itself.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use tokio::signal;
use tracing::{Instrument, error, info, info_span};

use super::wire::{BuildRequest, status_for};
use crate::awx::AutomationApi;
use crate::error::BuildError;
use crate::marker::MarkerStore;
use crate::orchestrator::{BuildStatus, Orchestrator};
use crate::poller::Sleeper;

/// `POST /build` and `POST /build/`, both served by the same handler.
pub fn router<A, M, S>(orchestrator: Arc<Orchestrator<A, M, S>>) -> Router
where
    A: AutomationApi + 'static,
    M: MarkerStore + 'static,
    S: Sleeper + 'static,
{
    Router::new()
        .route("/build", post(build::<A, M, S>))
        .route("/build/", post(build::<A, M, S>))
        .with_state(orchestrator)
}

async fn build<A, M, S>(
    State(orchestrator): State<Arc<Orchestrator<A, M, S>>>,
    payload: Result<Json<BuildRequest>, JsonRejection>,
) -> Response
where
    A: AutomationApi + 'static,
    M: MarkerStore + 'static,
    S: Sleeper + 'static,
{
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            error!("rejected build request: {rejection}");
            let err = BuildError::configuration(format!("malformed build request: {rejection}"));
            return (StatusCode::BAD_REQUEST, Json(err)).into_response();
        }
    };

    let mock = request.is_mock();
    let ctx = request.into_context();
    let span = info_span!("build", fqdn = %ctx.fqdn, host_type = %ctx.host_type, mock);

    let status = orchestrator
        .run_local(&ctx, mock)
        .instrument(span)
        .await;

    match status {
        BuildStatus::Successful => (StatusCode::OK, Json("successful")).into_response(),
        BuildStatus::Failed(err) => {
            let code = StatusCode::from_u16(status_for(err.kind()))
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (code, Json(err)).into_response()
        }
    }
}

/// Bind `0.0.0.0:<port>` and serve until Ctrl+C or SIGTERM.
pub async fn serve(app: Router, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("AWX relay listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("AWX relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("cannot listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::awx::JobStatus;
    use crate::context::{HostType, sample_context};
    use crate::error::ErrorKind;
    use crate::inventory::GroupRules;
    use crate::marker::fakes::MemoryMarkers;
    use crate::orchestrator::Platform;
    use crate::poller::fakes::RecordingSleeper;
    use crate::state_machine::PollTimings;
    use crate::testing::FakeApi;

    type FakeOrchestrator = Orchestrator<FakeApi, MemoryMarkers, RecordingSleeper>;

    fn relay_with(api: FakeApi) -> Arc<FakeOrchestrator> {
        Arc::new(Orchestrator::default().with_platform(Platform {
            api,
            markers: MemoryMarkers::default(),
            sleeper: RecordingSleeper::default(),
            rules: GroupRules::default(),
            timings: PollTimings::default(),
        }))
    }

    fn midtier_api() -> FakeApi {
        FakeApi::default().with_registered_host(1, "web01.dc1.example.com", 513, "dc1")
    }

    fn midtier_request(mock: bool) -> String {
        let mut ctx = sample_context(HostType::Midtier);
        ctx.inventory_id = 513;
        ctx.inventory_name = "Midtier-Baremetal".into();
        serde_json::to_string(&BuildRequest::new(&ctx, mock)).unwrap()
    }

    async fn post_build(app: Router, uri: &str, body: String) -> (StatusCode, String) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn runs_delegated_build_and_answers_successful() {
        let orch = relay_with(midtier_api());
        let (status, body) =
            post_build(router(orch.clone()), "/build/", midtier_request(false)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "\"successful\"");
    }

    #[tokio::test]
    async fn accepts_path_without_trailing_slash() {
        let orch = relay_with(midtier_api());
        let (status, _) = post_build(router(orch), "/build", midtier_request(false)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_payload_is_bad_request() {
        let orch = relay_with(FakeApi::default());
        let (status, body) =
            post_build(router(orch), "/build/", r#"{"fqdn": "x"}"#.to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: BuildError = serde_json::from_str(&body).unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn job_failure_maps_to_bad_gateway_with_structured_body() {
        let api = midtier_api();
        api.finish_template(15, JobStatus::Failed);
        let orch = relay_with(api);

        let (status, body) = post_build(router(orch), "/build/", midtier_request(false)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let err: BuildError = serde_json::from_str(&body).unwrap();
        assert!(matches!(err, BuildError::JobFailure { job_id: 1015, .. }));
    }

    #[tokio::test]
    async fn mock_request_never_reaches_awx() {
        let orch = relay_with(FakeApi::default());
        let (status, body) =
            post_build(router(orch.clone()), "/build/", midtier_request(true)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "\"successful\"");
    }

    #[tokio::test]
    async fn configuration_error_is_internal_server_error() {
        // Host sits in the internal inventory but asks for a midtier build.
        let orch = relay_with(FakeApi::default().with_host(1, "web01.dc1.example.com", 44));
        let (status, body) = post_build(router(orch), "/build/", midtier_request(false)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let err: BuildError = serde_json::from_str(&body).unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
