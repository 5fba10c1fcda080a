pub mod http;

use async_trait::async_trait;
use modeploy_core::launch::instance_name_from_args;
use modeploy_core::{CloudAppInstanceInfo, CloudAppType};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

pub use http::HttpCloudAppService;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CloudAppError {
    #[error("application already exists: {0}")]
    AlreadyExists(String),
    #[error("cluster service unavailable: {0}")]
    Unavailable(String),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl CloudAppError {
    /// Worth retrying; everything else is a definite answer from the cluster.
    pub fn is_transient(&self) -> bool {
        matches!(self, CloudAppError::Unavailable(_))
    }
}

pub type CloudAppResult<T> = std::result::Result<T, CloudAppError>;

/// Cluster application service that registers, launches and lists applications
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CloudAppService: Send + Sync {
    /// Register a launchable package for an application kind.
    /// Fails with [`CloudAppError::AlreadyExists`] if it is already registered.
    async fn push_application(&self, app_name: &str, app_type: CloudAppType)
        -> CloudAppResult<()>;

    /// Launch one new instance and return its cluster application id
    async fn submit_application(
        &self,
        app_name: &str,
        app_type: CloudAppType,
        args: Vec<String>,
    ) -> CloudAppResult<String>;

    /// Snapshot of every known instance across all kinds
    async fn get_instances(&self) -> CloudAppResult<Vec<CloudAppInstanceInfo>>;

    /// Terminate a running instance
    async fn kill_application(&self, application_id: &str) -> CloudAppResult<()>;
}

pub const KILLED_STATE: &str = "KILLED";

#[derive(Default)]
struct InMemoryState {
    registered: HashSet<(String, CloudAppType)>,
    instances: Vec<CloudAppInstanceInfo>,
    next_id: u64,
}

/// In-process cluster application service
#[derive(Clone, Default)]
pub struct InMemoryCloudAppService {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryCloudAppService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance that was not launched through this service.
    pub async fn insert_instance(&self, instance: CloudAppInstanceInfo) {
        let mut state = self.state.write().await;
        state.instances.push(instance);
    }

    pub async fn set_state(&self, application_id: &str, new_state: &str) -> CloudAppResult<()> {
        let mut state = self.state.write().await;
        let instance = state
            .instances
            .iter_mut()
            .find(|instance| instance.application_id == application_id)
            .ok_or_else(|| CloudAppError::NotFound(application_id.to_string()))?;
        instance.state = new_state.to_string();
        Ok(())
    }

    pub async fn is_registered(&self, app_name: &str, app_type: CloudAppType) -> bool {
        let state = self.state.read().await;
        state
            .registered
            .contains(&(app_name.to_string(), app_type))
    }
}

#[async_trait]
impl CloudAppService for InMemoryCloudAppService {
    async fn push_application(
        &self,
        app_name: &str,
        app_type: CloudAppType,
    ) -> CloudAppResult<()> {
        let mut state = self.state.write().await;
        if !state.registered.insert((app_name.to_string(), app_type)) {
            return Err(CloudAppError::AlreadyExists(format!(
                "{app_name} ({app_type})"
            )));
        }
        Ok(())
    }

    async fn submit_application(
        &self,
        app_name: &str,
        app_type: CloudAppType,
        args: Vec<String>,
    ) -> CloudAppResult<String> {
        let mut state = self.state.write().await;
        if !state
            .registered
            .contains(&(app_name.to_string(), app_type))
        {
            return Err(CloudAppError::Rejected(format!(
                "{app_name} ({app_type}) is not registered"
            )));
        }

        let name = instance_name_from_args(&args)
            .ok_or_else(|| CloudAppError::Rejected("launch arguments carry no name".to_string()))?
            .to_string();

        state.next_id += 1;
        let application_id = format!("application_{}", state.next_id);
        state.instances.push(CloudAppInstanceInfo::new(
            application_id.clone(),
            name,
            modeploy_core::RUNNING_STATE,
        ));

        Ok(application_id)
    }

    async fn get_instances(&self) -> CloudAppResult<Vec<CloudAppInstanceInfo>> {
        let state = self.state.read().await;
        Ok(state.instances.clone())
    }

    async fn kill_application(&self, application_id: &str) -> CloudAppResult<()> {
        self.set_state(application_id, KILLED_STATE).await
    }
}
