use crate::features::cloud_app::repo::{CloudAppError, CloudAppResult, CloudAppService};
use crate::shared::config::{DeployerConfig, RetryPolicy};
use crate::shared::error::{DeployerError, DeployerResult};
use crate::shared::types::{
    CloudAppInstanceInfo, CloudAppType, DeploymentId, DeploymentRequest, ModuleInstanceStatus,
    ModuleStatus,
};
use async_trait::async_trait;
use modeploy_core::{InstanceNameCodec, LaunchSpec, PropertyForwarding};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Aggregated view of the cluster for one deployer kind.
///
/// Names that carry the deployer prefix but do not decode are reported in
/// `invalid_names` instead of failing the whole aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub statuses: BTreeMap<DeploymentId, ModuleStatus>,
    pub invalid_names: Vec<String>,
}

impl StatusReport {
    pub fn running_count(&self) -> usize {
        self.statuses.values().filter(|s| s.is_running()).count()
    }
}

/// Deploys modules onto the cluster and reports their status.
///
/// Implementations keep no record of what they deployed; every answer is
/// derived from the cluster's live instance listing.
#[async_trait]
pub trait ModuleDeployer: Send + Sync {
    async fn deploy(
        &self,
        request: DeploymentRequest,
        cancel: &CancellationToken,
    ) -> DeployerResult<DeploymentId>;

    async fn undeploy(&self, id: &DeploymentId, cancel: &CancellationToken) -> DeployerResult<()>;

    /// Status of one deployment. An id with no instance is reported as not
    /// running rather than as an error.
    async fn status(
        &self,
        id: &DeploymentId,
        cancel: &CancellationToken,
    ) -> DeployerResult<ModuleStatus>;

    async fn statuses(&self, cancel: &CancellationToken) -> DeployerResult<StatusReport>;
}

/// Deployer for one-shot task modules
pub struct TaskModuleDeployer {
    cloud_app: Arc<dyn CloudAppService>,
    codec: InstanceNameCodec,
    app_name: String,
    app_type: CloudAppType,
    call_timeout: Duration,
    push_retry: RetryPolicy,
    property_forwarding: PropertyForwarding,
}

impl TaskModuleDeployer {
    pub fn new(cloud_app: Arc<dyn CloudAppService>, config: &DeployerConfig) -> Self {
        Self {
            cloud_app,
            codec: InstanceNameCodec::task(),
            app_name: config.app_name.clone(),
            app_type: CloudAppType::Task,
            call_timeout: config.call_timeout,
            push_retry: config.push_retry,
            property_forwarding: config.property_forwarding,
        }
    }

    /// Run one cluster call under the call timeout, giving up early when
    /// `cancel` fires.
    async fn guarded<T, F>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        call: F,
    ) -> DeployerResult<CloudAppResult<T>>
    where
        T: Send,
        F: Future<Output = CloudAppResult<T>> + Send,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DeployerError::Cancelled(operation.to_string())),
            outcome = tokio::time::timeout(self.call_timeout, call) => outcome.map_err(|_| {
                DeployerError::Timeout(format!(
                    "{operation} exceeded {}ms",
                    self.call_timeout.as_millis()
                ))
            }),
        }
    }

    /// Register the application package for this deployer kind.
    /// Already registered counts as success.
    async fn ensure_registered(&self, cancel: &CancellationToken) -> DeployerResult<()> {
        let mut attempt = 1;
        loop {
            let outcome = match self
                .guarded(
                    "push application",
                    cancel,
                    self.cloud_app
                        .push_application(&self.app_name, self.app_type),
                )
                .await
            {
                Ok(outcome) => outcome,
                Err(DeployerError::Timeout(msg)) => Err(CloudAppError::Unavailable(msg)),
                Err(err) => return Err(err),
            };

            match outcome {
                Ok(()) => {
                    info!(app_name = %self.app_name, app_type = %self.app_type, "Application registered");
                    return Ok(());
                }
                Err(CloudAppError::AlreadyExists(_)) => {
                    debug!(app_name = %self.app_name, app_type = %self.app_type, "Application already registered");
                    return Ok(());
                }
                Err(err) if err.is_transient() && attempt < self.push_retry.max_attempts => {
                    warn!(attempt, error = %err, "Application registration failed, retrying");
                    let backoff = self.push_retry.delay(attempt);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            return Err(DeployerError::Cancelled("push application".to_string()));
                        }
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    attempt += 1;
                }
                Err(err) => return Err(DeployerError::RegistrationFailure(err.to_string())),
            }
        }
    }

    async fn list_instances(
        &self,
        cancel: &CancellationToken,
    ) -> DeployerResult<Vec<CloudAppInstanceInfo>> {
        self.guarded("list instances", cancel, self.cloud_app.get_instances())
            .await?
            .map_err(|e| DeployerError::ServiceUnavailable(e.to_string()))
    }

    fn instance_status(instance: CloudAppInstanceInfo) -> ModuleInstanceStatus {
        let running = instance.is_running();
        let mut status = ModuleInstanceStatus::new(instance.application_id, running)
            .with_attribute("name", instance.name)
            .with_attribute("state", instance.state);
        if let Some(address) = instance.address {
            status = status.with_attribute("address", address);
        }
        status
    }
}

#[async_trait]
impl ModuleDeployer for TaskModuleDeployer {
    async fn deploy(
        &self,
        request: DeploymentRequest,
        cancel: &CancellationToken,
    ) -> DeployerResult<DeploymentId> {
        let id = request.id();
        InstanceNameCodec::validate(&id)?;
        if request.count == Some(0) {
            return Err(DeployerError::InvalidRequest(
                "instance count must be at least 1".to_string(),
            ));
        }

        let instance_name = self.codec.encode(&id);
        info!(%id, coordinates = %request.coordinates, %instance_name, "Deploy request");
        debug!(
            parameters = ?request.definition.parameters,
            deployment_properties = ?request.deployment_properties,
            "Deploy request details"
        );
        if let Some(count) = request.count.filter(|count| *count > 1) {
            warn!(%id, count, "Task modules launch a single instance, ignoring count");
        }

        let launch = LaunchSpec::build(
            &request.coordinates,
            &instance_name,
            &request.definition.parameters,
        )
        .with_deployment_properties(&request.deployment_properties, self.property_forwarding);
        debug!(args = ?launch.args(), "Launch arguments");

        self.ensure_registered(cancel).await?;

        let application_id = self
            .guarded(
                "submit application",
                cancel,
                self.cloud_app
                    .submit_application(&self.app_name, self.app_type, launch.into_args()),
            )
            .await?
            .map_err(|e| DeployerError::SubmissionFailure(e.to_string()))?;

        info!(%id, %application_id, "Module submitted");
        Ok(id)
    }

    async fn undeploy(&self, id: &DeploymentId, cancel: &CancellationToken) -> DeployerResult<()> {
        info!(%id, "Undeploy request");

        let targets: Vec<CloudAppInstanceInfo> = self
            .list_instances(cancel)
            .await?
            .into_iter()
            .filter(|instance| !instance.is_terminal() && self.codec.matches(&instance.name))
            .filter(|instance| {
                self.codec
                    .decode(&instance.name)
                    .is_ok_and(|decoded| decoded == *id)
            })
            .collect();

        if targets.is_empty() {
            info!(%id, "No live instance to undeploy");
            return Ok(());
        }

        for instance in targets {
            let outcome = self
                .guarded(
                    "kill application",
                    cancel,
                    self.cloud_app.kill_application(&instance.application_id),
                )
                .await?;

            match outcome {
                Ok(()) => {
                    info!(%id, application_id = %instance.application_id, "Instance terminated");
                }
                Err(CloudAppError::NotFound(_)) => {
                    debug!(%id, application_id = %instance.application_id, "Instance already gone");
                }
                Err(err) => {
                    return Err(DeployerError::TerminationFailure(format!(
                        "{}: {err}",
                        instance.application_id
                    )));
                }
            }
        }

        Ok(())
    }

    async fn status(
        &self,
        id: &DeploymentId,
        cancel: &CancellationToken,
    ) -> DeployerResult<ModuleStatus> {
        debug!(%id, "Status request");
        let mut report = self.statuses(cancel).await?;
        Ok(report
            .statuses
            .remove(id)
            .unwrap_or_else(|| ModuleStatus::not_running(id.clone())))
    }

    async fn statuses(&self, cancel: &CancellationToken) -> DeployerResult<StatusReport> {
        let mut report = StatusReport::default();

        for instance in self.list_instances(cancel).await? {
            if !self.codec.matches(&instance.name) {
                continue;
            }

            let id = match self.codec.decode(&instance.name) {
                Ok(id) => id,
                Err(err) => {
                    warn!(name = %instance.name, error = %err, "Skipping instance with undecodable name");
                    report.invalid_names.push(instance.name);
                    continue;
                }
            };

            let status = ModuleStatus::of(id.clone())
                .with(Self::instance_status(instance))
                .build();
            match report.statuses.get_mut(&id) {
                Some(existing) => existing.merge(status),
                None => {
                    report.statuses.insert(id, status);
                }
            }
        }

        debug!(
            modules = report.statuses.len(),
            invalid = report.invalid_names.len(),
            "Status aggregated"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::cloud_app::repo::{InMemoryCloudAppService, MockCloudAppService};
    use crate::shared::types::{ArtifactCoordinates, ModuleDefinition, ModuleState};

    fn test_config() -> DeployerConfig {
        DeployerConfig {
            call_timeout: Duration::from_millis(200),
            push_retry: RetryPolicy {
                max_attempts: 3,
                backoff: Duration::from_millis(1),
            },
            ..DeployerConfig::default()
        }
    }

    fn create_test_deployer() -> (TaskModuleDeployer, InMemoryCloudAppService) {
        let cloud_app = InMemoryCloudAppService::new();
        let deployer = TaskModuleDeployer::new(Arc::new(cloud_app.clone()), &test_config());
        (deployer, cloud_app)
    }

    fn mock_deployer(mock: MockCloudAppService) -> TaskModuleDeployer {
        TaskModuleDeployer::new(Arc::new(mock), &test_config())
    }

    fn create_request(group: &str, label: &str) -> DeploymentRequest {
        DeploymentRequest::new(
            "group:artifact:1.0".parse::<ArtifactCoordinates>().unwrap(),
            ModuleDefinition::new(group, label).with_parameter("foo", "bar"),
        )
    }

    fn instance(application_id: &str, name: &str, state: &str) -> CloudAppInstanceInfo {
        CloudAppInstanceInfo::new(application_id, name, state)
    }

    #[tokio::test]
    async fn test_deploy_returns_id_and_launches_named_instance() {
        let (deployer, cloud_app) = create_test_deployer();
        let cancel = CancellationToken::new();

        let id = deployer
            .deploy(create_request("g1", "l1"), &cancel)
            .await
            .unwrap();

        assert_eq!(id, DeploymentId::new("g1", "l1"));
        let instances = cloud_app.get_instances().await.unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].name, "scdtask:g1:l1");
        assert!(cloud_app.is_registered("app", CloudAppType::Task).await);
    }

    #[tokio::test]
    async fn test_deploy_builds_expected_arguments() {
        let mut mock = MockCloudAppService::new();
        mock.expect_push_application()
            .times(1)
            .returning(|_, _| Ok(()));
        mock.expect_submit_application()
            .times(1)
            .returning(|app_name, app_type, args| {
                assert_eq!(app_name, "app");
                assert_eq!(app_type, CloudAppType::Task);
                assert_eq!(args.len(), 3);
                assert!(args[0].ends_with("--dataflow.module.coordinates=group:artifact:1.0"));
                assert_eq!(args[1], "--spring.yarn.appName=scdtask:g1:l1");
                assert!(args[2].ends_with("--dataflow.module.parameters.foo=bar"));
                Ok("application_1".to_string())
            });

        let deployer = mock_deployer(mock);
        let id = deployer
            .deploy(create_request("g1", "l1"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(id, DeploymentId::new("g1", "l1"));
    }

    #[tokio::test]
    async fn test_deploy_twice_tolerates_existing_registration() {
        let (deployer, cloud_app) = create_test_deployer();
        let cancel = CancellationToken::new();

        deployer
            .deploy(create_request("g1", "l1"), &cancel)
            .await
            .unwrap();
        deployer
            .deploy(create_request("g1", "l1"), &cancel)
            .await
            .unwrap();

        assert_eq!(cloud_app.get_instances().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_deploy_push_conflict_still_submits() {
        let mut mock = MockCloudAppService::new();
        mock.expect_push_application()
            .times(1)
            .returning(|_, _| Err(CloudAppError::AlreadyExists("app".to_string())));
        mock.expect_submit_application()
            .times(1)
            .returning(|_, _, _| Ok("application_2".to_string()));

        let deployer = mock_deployer(mock);
        let result = deployer
            .deploy(create_request("g1", "l1"), &CancellationToken::new())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_deploy_push_rejected_aborts_before_submit() {
        let mut mock = MockCloudAppService::new();
        mock.expect_push_application()
            .times(1)
            .returning(|_, _| Err(CloudAppError::Rejected("no quota".to_string())));
        mock.expect_submit_application().times(0);

        let deployer = mock_deployer(mock);
        let err = deployer
            .deploy(create_request("g1", "l1"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployerError::RegistrationFailure(_)));
    }

    #[tokio::test]
    async fn test_deploy_push_retries_transient_failure() {
        let mut mock = MockCloudAppService::new();
        let mut calls = 0;
        mock.expect_push_application()
            .times(2)
            .returning(move |_, _| {
                calls += 1;
                if calls == 1 {
                    Err(CloudAppError::Unavailable("connection reset".to_string()))
                } else {
                    Ok(())
                }
            });
        mock.expect_submit_application()
            .times(1)
            .returning(|_, _, _| Ok("application_3".to_string()));

        let deployer = mock_deployer(mock);
        let result = deployer
            .deploy(create_request("g1", "l1"), &CancellationToken::new())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_deploy_push_retries_exhausted() {
        let mut mock = MockCloudAppService::new();
        mock.expect_push_application()
            .times(3)
            .returning(|_, _| Err(CloudAppError::Unavailable("down".to_string())));
        mock.expect_submit_application().times(0);

        let deployer = mock_deployer(mock);
        let err = deployer
            .deploy(create_request("g1", "l1"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployerError::RegistrationFailure(_)));
    }

    #[tokio::test]
    async fn test_deploy_submit_failure_propagates() {
        let mut mock = MockCloudAppService::new();
        mock.expect_push_application().returning(|_, _| Ok(()));
        mock.expect_submit_application()
            .times(1)
            .returning(|_, _, _| Err(CloudAppError::Rejected("queue full".to_string())));

        let deployer = mock_deployer(mock);
        let err = deployer
            .deploy(create_request("g1", "l1"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployerError::SubmissionFailure(_)));
    }

    #[tokio::test]
    async fn test_deploy_rejects_delimiter_in_label_without_cluster_calls() {
        let mut mock = MockCloudAppService::new();
        mock.expect_push_application().times(0);
        mock.expect_submit_application().times(0);

        let deployer = mock_deployer(mock);
        let err = deployer
            .deploy(create_request("g1", "l:1"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployerError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_deploy_rejects_zero_count() {
        let (deployer, _) = create_test_deployer();
        let err = deployer
            .deploy(
                create_request("g1", "l1").with_count(0),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DeployerError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_deploy_forwards_properties_when_configured() {
        let mut mock = MockCloudAppService::new();
        mock.expect_push_application().returning(|_, _| Ok(()));
        mock.expect_submit_application()
            .times(1)
            .returning(|_, _, args| {
                assert_eq!(args.len(), 4);
                assert!(args[3].ends_with("--dataflow.module.deploymentProperties.memory=512"));
                Ok("application_4".to_string())
            });

        let config = DeployerConfig {
            property_forwarding: PropertyForwarding::LaunchArguments,
            ..test_config()
        };
        let deployer = TaskModuleDeployer::new(Arc::new(mock), &config);

        let mut properties = BTreeMap::new();
        properties.insert("memory".to_string(), "512".to_string());
        let request = create_request("g1", "l1").with_deployment_properties(properties);

        deployer
            .deploy(request, &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_deploy_cancelled_before_push() {
        let mut mock = MockCloudAppService::new();
        mock.expect_push_application().returning(|_, _| Ok(()));
        mock.expect_submit_application().times(0);

        let deployer = mock_deployer(mock);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = deployer
            .deploy(create_request("g1", "l1"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DeployerError::Cancelled(_)));
    }

    struct SlowCloudAppService;

    #[async_trait]
    impl CloudAppService for SlowCloudAppService {
        async fn push_application(&self, _: &str, _: CloudAppType) -> CloudAppResult<()> {
            Ok(())
        }

        async fn submit_application(
            &self,
            _: &str,
            _: CloudAppType,
            _: Vec<String>,
        ) -> CloudAppResult<String> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok("application_slow".to_string())
        }

        async fn get_instances(&self) -> CloudAppResult<Vec<CloudAppInstanceInfo>> {
            Ok(vec![])
        }

        async fn kill_application(&self, _: &str) -> CloudAppResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_deploy_submit_timeout() {
        let deployer = TaskModuleDeployer::new(Arc::new(SlowCloudAppService), &test_config());
        let err = deployer
            .deploy(create_request("g1", "l1"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployerError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_status_filters_foreign_instances() {
        let (deployer, cloud_app) = create_test_deployer();
        cloud_app
            .insert_instance(instance("application_1", "scdtask:g1:l1", "RUNNING"))
            .await;
        cloud_app
            .insert_instance(instance("application_2", "other:x:y", "RUNNING"))
            .await;

        let report = deployer.statuses(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.statuses.len(), 1);
        let status = &report.statuses[&DeploymentId::new("g1", "l1")];
        assert!(status.is_running());
        assert!(report.invalid_names.is_empty());
    }

    #[tokio::test]
    async fn test_status_skips_malformed_names() {
        let (deployer, cloud_app) = create_test_deployer();
        cloud_app
            .insert_instance(instance("application_1", "scdtask:malformed", "RUNNING"))
            .await;
        cloud_app
            .insert_instance(instance("application_2", "scdtask:g1:l1", "RUNNING"))
            .await;

        let report = deployer.statuses(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.statuses.len(), 1);
        assert!(report.statuses.contains_key(&DeploymentId::new("g1", "l1")));
        assert_eq!(report.invalid_names, vec!["scdtask:malformed".to_string()]);
    }

    #[tokio::test]
    async fn test_status_merges_instances_with_same_id() {
        let (deployer, cloud_app) = create_test_deployer();
        cloud_app
            .insert_instance(instance("application_1", "scdtask:g1:l1", "RUNNING"))
            .await;
        cloud_app
            .insert_instance(instance("application_2", "scdtask:g1:l1", "FINISHED"))
            .await;

        let report = deployer.statuses(&CancellationToken::new()).await.unwrap();

        let status = &report.statuses[&DeploymentId::new("g1", "l1")];
        assert_eq!(status.instances.len(), 2);
        assert_eq!(status.state(), ModuleState::Partial);
        assert_eq!(report.running_count(), 1);
    }

    #[tokio::test]
    async fn test_status_running_requires_running_state() {
        let (deployer, cloud_app) = create_test_deployer();
        cloud_app
            .insert_instance(instance("application_1", "scdtask:g1:l1", "ACCEPTED"))
            .await;

        let status = deployer
            .status(&DeploymentId::new("g1", "l1"), &CancellationToken::new())
            .await
            .unwrap();
        assert!(!status.is_running());
        assert_eq!(status.instances[0].attributes["state"], "ACCEPTED");
    }

    #[tokio::test]
    async fn test_status_for_unknown_id_is_not_running() {
        let (deployer, _) = create_test_deployer();

        let status = deployer
            .status(&DeploymentId::new("g9", "l9"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(status.id, DeploymentId::new("g9", "l9"));
        assert!(!status.is_running());
        assert!(status.instances.iter().all(|i| i.attributes.is_empty()));
    }

    #[tokio::test]
    async fn test_statuses_listing_failure() {
        let mut mock = MockCloudAppService::new();
        mock.expect_get_instances()
            .returning(|| Err(CloudAppError::Unavailable("down".to_string())));

        let deployer = mock_deployer(mock);
        let err = deployer
            .statuses(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployerError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_undeploy_kills_matching_instance() {
        let (deployer, cloud_app) = create_test_deployer();
        let cancel = CancellationToken::new();
        let id = deployer
            .deploy(create_request("g1", "l1"), &cancel)
            .await
            .unwrap();
        deployer
            .deploy(create_request("g1", "l2"), &cancel)
            .await
            .unwrap();

        deployer.undeploy(&id, &cancel).await.unwrap();

        assert!(!deployer.status(&id, &cancel).await.unwrap().is_running());
        let other = deployer
            .status(&DeploymentId::new("g1", "l2"), &cancel)
            .await
            .unwrap();
        assert!(other.is_running());
        assert_eq!(cloud_app.get_instances().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_undeploy_kills_instance_not_yet_running() {
        let (deployer, cloud_app) = create_test_deployer();
        cloud_app
            .insert_instance(instance("application_1", "scdtask:g1:l1", "ACCEPTED"))
            .await;

        deployer
            .undeploy(&DeploymentId::new("g1", "l1"), &CancellationToken::new())
            .await
            .unwrap();

        let instances = cloud_app.get_instances().await.unwrap();
        assert_eq!(instances[0].state, "KILLED");
    }

    #[tokio::test]
    async fn test_undeploy_kills_every_live_instance_of_id() {
        let (deployer, cloud_app) = create_test_deployer();
        cloud_app
            .insert_instance(instance("application_1", "scdtask:g1:l1", "RUNNING"))
            .await;
        cloud_app
            .insert_instance(instance("application_2", "scdtask:g1:l1", "SUBMITTED"))
            .await;
        cloud_app
            .insert_instance(instance("application_3", "scdtask:g1:l1", "FINISHED"))
            .await;
        cloud_app
            .insert_instance(instance("application_4", "scdtask:g1:l2", "RUNNING"))
            .await;

        deployer
            .undeploy(&DeploymentId::new("g1", "l1"), &CancellationToken::new())
            .await
            .unwrap();

        let states: Vec<String> = cloud_app
            .get_instances()
            .await
            .unwrap()
            .into_iter()
            .map(|instance| instance.state)
            .collect();
        assert_eq!(states, vec!["KILLED", "KILLED", "FINISHED", "RUNNING"]);
    }

    #[tokio::test]
    async fn test_undeploy_missing_instance_is_ok() {
        let mut mock = MockCloudAppService::new();
        mock.expect_get_instances().returning(|| {
            Ok(vec![CloudAppInstanceInfo::new(
                "application_1",
                "other:g1:l1",
                "RUNNING",
            )])
        });
        mock.expect_kill_application().times(0);

        let deployer = mock_deployer(mock);
        let result = deployer
            .undeploy(&DeploymentId::new("g1", "l1"), &CancellationToken::new())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_undeploy_tolerates_instance_already_gone() {
        let mut mock = MockCloudAppService::new();
        mock.expect_get_instances().returning(|| {
            Ok(vec![CloudAppInstanceInfo::new(
                "application_1",
                "scdtask:g1:l1",
                "RUNNING",
            )])
        });
        mock.expect_kill_application()
            .times(1)
            .returning(|id| Err(CloudAppError::NotFound(id.to_string())));

        let deployer = mock_deployer(mock);
        let result = deployer
            .undeploy(&DeploymentId::new("g1", "l1"), &CancellationToken::new())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_undeploy_kill_failure_propagates() {
        let mut mock = MockCloudAppService::new();
        mock.expect_get_instances().returning(|| {
            Ok(vec![CloudAppInstanceInfo::new(
                "application_1",
                "scdtask:g1:l1",
                "RUNNING",
            )])
        });
        mock.expect_kill_application()
            .times(1)
            .returning(|_| Err(CloudAppError::Rejected("not permitted".to_string())));

        let deployer = mock_deployer(mock);
        let err = deployer
            .undeploy(&DeploymentId::new("g1", "l1"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployerError::TerminationFailure(_)));
    }
}
