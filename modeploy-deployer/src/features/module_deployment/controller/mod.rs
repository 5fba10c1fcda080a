use crate::features::module_deployment::service::{ModuleDeployer, StatusReport};
use crate::features::observability::service::ObservabilityService;
use crate::shared::error::DeployerError;
use crate::shared::types::{DeploymentId, DeploymentRequest, ModuleStatus};
use modeploy_core::ErrorResponse;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Controller for module deployment API endpoints
pub struct ModuleDeploymentController {
    deployer: Arc<dyn ModuleDeployer>,
    observability: Arc<ObservabilityService>,
    shutdown: CancellationToken,
}

impl ModuleDeploymentController {
    /// Calls in flight are cancelled once `shutdown` fires.
    pub fn new(
        deployer: Arc<dyn ModuleDeployer>,
        observability: Arc<ObservabilityService>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            deployer,
            observability,
            shutdown,
        }
    }

    pub fn observability(&self) -> &ObservabilityService {
        &self.observability
    }

    /// Handle deploy request
    pub async fn deploy(&self, request: DeploymentRequest) -> Result<DeploymentId, ErrorResponse> {
        let id = request.id();
        info!(group = %id.group, label = %id.label, "Received deploy request");

        let result = self
            .deployer
            .deploy(request, &self.shutdown.child_token())
            .await;
        self.observability.record_deploy(&result);
        result.map_err(|err| module_error(err, &id))
    }

    /// Handle undeploy request
    pub async fn undeploy(&self, id: &DeploymentId) -> Result<(), ErrorResponse> {
        info!(%id, "Received undeploy request");

        let result = self
            .deployer
            .undeploy(id, &self.shutdown.child_token())
            .await;
        self.observability.record_undeploy(&result);
        result.map_err(|err| module_error(err, id))
    }

    /// Handle single module status request
    pub async fn status(&self, id: &DeploymentId) -> Result<ModuleStatus, ErrorResponse> {
        info!(%id, "Received status request");

        self.deployer
            .status(id, &self.shutdown.child_token())
            .await
            .map_err(|err| module_error(err, id))
    }

    /// Handle aggregate status request
    pub async fn statuses(&self) -> Result<StatusReport, ErrorResponse> {
        info!("Received status request for all modules");

        let report = self
            .deployer
            .statuses(&self.shutdown.child_token())
            .await
            .map_err(ErrorResponse::from)?;
        self.observability.record_status_query(report.running_count());
        self.observability
            .record_invalid_names(report.invalid_names.len());
        Ok(report)
    }
}

/// Error body tagged with the module the failed request was about
fn module_error(err: DeployerError, id: &DeploymentId) -> ErrorResponse {
    let details = HashMap::from([
        ("group".to_string(), id.group.clone()),
        ("label".to_string(), id.label.clone()),
    ]);
    ErrorResponse::from(err).with_details(details)
}
