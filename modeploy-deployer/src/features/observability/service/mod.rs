use crate::features::observability::repo::ObservabilityRepository;
use crate::shared::error::DeployerResult;
use std::sync::Arc;

pub struct ObservabilityService {
    repo: Arc<ObservabilityRepository>,
}

impl ObservabilityService {
    pub fn new(repo: Arc<ObservabilityRepository>) -> Self {
        Self { repo }
    }

    pub fn record_deploy<T>(&self, result: &DeployerResult<T>) {
        self.repo.inc_deploy(outcome(result));
    }

    pub fn record_undeploy<T>(&self, result: &DeployerResult<T>) {
        self.repo.inc_undeploy(outcome(result));
    }

    pub fn record_status_query(&self, running_modules: usize) {
        self.repo.inc_status_query();
        self.repo.set_running_modules(running_modules as f64);
    }

    pub fn record_invalid_names(&self, count: usize) {
        if count > 0 {
            self.repo.inc_invalid_instance_names(count as u64);
        }
    }

    pub fn record_api_request(&self, endpoint: &str, seconds: f64) {
        self.repo.observe_api_request(endpoint, seconds);
    }

    pub fn render_metrics(&self) -> Result<String, String> {
        self.repo.render_metrics()
    }
}

/// `ok`, or the error code of the failure
fn outcome<T>(result: &DeployerResult<T>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(err) => err.code(),
    }
}
