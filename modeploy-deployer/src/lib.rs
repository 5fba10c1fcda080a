pub mod features;
pub mod server;
pub mod shared;

use features::cloud_app::repo::{CloudAppService, HttpCloudAppService, InMemoryCloudAppService};
use features::module_deployment::controller::ModuleDeploymentController;
use features::module_deployment::service::TaskModuleDeployer;
use features::observability::repo::ObservabilityRepository;
use features::observability::service::ObservabilityService;
use shared::config::DeployerConfig;
use shared::error::{DeployerError, DeployerResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Wire the cluster service, deployer, metrics and controller from config.
///
/// Without a cluster URL the deployer runs against an in-memory service.
pub fn build_controller(
    config: &DeployerConfig,
    shutdown: CancellationToken,
) -> DeployerResult<Arc<ModuleDeploymentController>> {
    let cloud_app: Arc<dyn CloudAppService> = match &config.cluster_url {
        Some(url) => {
            info!(cluster_url = %url, "Using remote cluster application service");
            Arc::new(
                HttpCloudAppService::new(url.clone(), config.call_timeout)
                    .map_err(|e| DeployerError::ServiceUnavailable(e.to_string()))?,
            )
        }
        None => {
            info!("No cluster URL configured, using in-memory application service");
            Arc::new(InMemoryCloudAppService::new())
        }
    };

    let deployer = Arc::new(TaskModuleDeployer::new(cloud_app, config));
    let observability = Arc::new(ObservabilityService::new(Arc::new(
        ObservabilityRepository::new().map_err(DeployerError::ServiceUnavailable)?,
    )));

    Ok(Arc::new(ModuleDeploymentController::new(
        deployer,
        observability,
        shutdown,
    )))
}
