pub use modeploy_core::{
    ArtifactCoordinates, CloudAppInstanceInfo, CloudAppType, DeploymentId, DeploymentRequest,
    ModuleDefinition, ModuleInstanceStatus, ModuleState, ModuleStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body returned by a successful deploy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployResponse {
    pub group: String,
    pub label: String,
}

impl From<DeploymentId> for DeployResponse {
    fn from(id: DeploymentId) -> Self {
        Self {
            group: id.group,
            label: id.label,
        }
    }
}

/// Status view returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleStatusResponse {
    pub group: String,
    pub label: String,
    pub state: ModuleState,
    pub running: bool,
    pub instances: Vec<ModuleInstanceStatus>,
}

impl From<ModuleStatus> for ModuleStatusResponse {
    fn from(status: ModuleStatus) -> Self {
        Self {
            state: status.state(),
            running: status.is_running(),
            group: status.id.group,
            label: status.id.label,
            instances: status.instances,
        }
    }
}

/// Flatten an aggregate status map into a stable, id-ordered list.
pub fn status_list(statuses: BTreeMap<DeploymentId, ModuleStatus>) -> Vec<ModuleStatusResponse> {
    statuses.into_values().map(Into::into).collect()
}
