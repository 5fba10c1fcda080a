use crate::features::module_deployment::controller::ModuleDeploymentController;
use crate::shared::types::{
    status_list, DeployResponse, DeploymentId, DeploymentRequest, ModuleStatusResponse,
};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use modeploy_core::ErrorResponse;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

type SharedController = Arc<ModuleDeploymentController>;

/// Error body plus the HTTP status derived from its code
pub struct ApiError(pub ErrorResponse);

impl From<ErrorResponse> for ApiError {
    fn from(error: ErrorResponse) -> Self {
        Self(error)
    }
}

pub fn status_for_code(code: &str) -> StatusCode {
    match code {
        "INVALID_REQUEST" => StatusCode::BAD_REQUEST,
        "INVALID_IDENTIFIER" => StatusCode::UNPROCESSABLE_ENTITY,
        "REGISTRATION_FAILURE" | "SUBMISSION_FAILURE" | "TERMINATION_FAILURE" => {
            StatusCode::BAD_GATEWAY
        }
        "SERVICE_UNAVAILABLE" | "CANCELLED" => StatusCode::SERVICE_UNAVAILABLE,
        "TIMEOUT" => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (status_for_code(&self.0.error_code), Json(self.0)).into_response()
    }
}

pub fn router(controller: SharedController) -> Router {
    Router::new()
        .route("/modules", post(deploy_module).get(list_modules))
        .route(
            "/modules/:group/:label",
            get(module_status).delete(undeploy_module),
        )
        .route("/metrics", get(metrics))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(controller)
}

/// Serve the API until `shutdown` fires
pub async fn serve(
    addr: SocketAddr,
    controller: SharedController,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Module deployer API listening");

    axum::serve(listener, router(controller))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn deploy_module(
    State(controller): State<SharedController>,
    Json(request): Json<DeploymentRequest>,
) -> Result<(StatusCode, Json<DeployResponse>), ApiError> {
    let started = Instant::now();
    let result = controller.deploy(request).await;
    controller
        .observability()
        .record_api_request("deploy", started.elapsed().as_secs_f64());

    let id = result?;
    Ok((StatusCode::CREATED, Json(id.into())))
}

async fn undeploy_module(
    State(controller): State<SharedController>,
    Path((group, label)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let started = Instant::now();
    let result = controller.undeploy(&DeploymentId::new(group, label)).await;
    controller
        .observability()
        .record_api_request("undeploy", started.elapsed().as_secs_f64());

    result?;
    Ok(StatusCode::NO_CONTENT)
}

async fn module_status(
    State(controller): State<SharedController>,
    Path((group, label)): Path<(String, String)>,
) -> Result<Json<ModuleStatusResponse>, ApiError> {
    let started = Instant::now();
    let result = controller.status(&DeploymentId::new(group, label)).await;
    controller
        .observability()
        .record_api_request("status", started.elapsed().as_secs_f64());

    Ok(Json(result?.into()))
}

async fn list_modules(
    State(controller): State<SharedController>,
) -> Result<Json<Vec<ModuleStatusResponse>>, ApiError> {
    let started = Instant::now();
    let result = controller.statuses().await;
    controller
        .observability()
        .record_api_request("statuses", started.elapsed().as_secs_f64());

    Ok(Json(status_list(result?.statuses)))
}

async fn metrics(State(controller): State<SharedController>) -> Result<String, ApiError> {
    controller
        .observability()
        .render_metrics()
        .map_err(|message| ApiError(ErrorResponse::new("INTERNAL", message)))
}
