use modeploy_core::CoreError;
use thiserror::Error;

/// Module deployer errors
#[derive(Debug, Error)]
pub enum DeployerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Application registration failed: {0}")]
    RegistrationFailure(String),
    #[error("Application submission failed: {0}")]
    SubmissionFailure(String),
    #[error("Invalid instance identifier: {0}")]
    InvalidIdentifier(String),
    #[error("Instance termination failed: {0}")]
    TerminationFailure(String),
    #[error("Cluster service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl From<CoreError> for DeployerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidIdentifier(msg) => DeployerError::InvalidIdentifier(msg),
            CoreError::InvalidCoordinates(msg) | CoreError::InvalidRequest(msg) => {
                DeployerError::InvalidRequest(msg)
            }
        }
    }
}

impl DeployerError {
    pub fn code(&self) -> &'static str {
        match self {
            DeployerError::InvalidRequest(_) => "INVALID_REQUEST",
            DeployerError::RegistrationFailure(_) => "REGISTRATION_FAILURE",
            DeployerError::SubmissionFailure(_) => "SUBMISSION_FAILURE",
            DeployerError::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            DeployerError::TerminationFailure(_) => "TERMINATION_FAILURE",
            DeployerError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            DeployerError::Timeout(_) => "TIMEOUT",
            DeployerError::Cancelled(_) => "CANCELLED",
        }
    }
}

impl From<DeployerError> for modeploy_core::ErrorResponse {
    fn from(err: DeployerError) -> Self {
        let code = err.code();
        let message = match err {
            DeployerError::InvalidRequest(msg)
            | DeployerError::RegistrationFailure(msg)
            | DeployerError::SubmissionFailure(msg)
            | DeployerError::InvalidIdentifier(msg)
            | DeployerError::TerminationFailure(msg)
            | DeployerError::ServiceUnavailable(msg)
            | DeployerError::Timeout(msg)
            | DeployerError::Cancelled(msg) => msg,
        };

        modeploy_core::ErrorResponse::new(code, message)
    }
}

pub type DeployerResult<T> = std::result::Result<T, DeployerError>;
