pub mod identity;
pub mod launch;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use identity::InstanceNameCodec;
pub use launch::{LaunchSpec, PropertyForwarding};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("Invalid artifact coordinates: {0}")]
    InvalidCoordinates(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Maven-style reference to a packaged module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactCoordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub extension: Option<String>,
    pub classifier: Option<String>,
    pub version: String,
}

impl ArtifactCoordinates {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            extension: None,
            classifier: None,
            version: version.into(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// A classifier is only rendered together with an extension.
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }
}

impl fmt::Display for ArtifactCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if let Some(extension) = &self.extension {
            write!(f, ":{extension}")?;
            if let Some(classifier) = &self.classifier {
                write!(f, ":{classifier}")?;
            }
        }
        write!(f, ":{}", self.version)
    }
}

impl FromStr for ArtifactCoordinates {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.iter().any(|part| part.is_empty()) {
            return Err(CoreError::InvalidCoordinates(s.to_string()));
        }

        match parts.as_slice() {
            [group_id, artifact_id, version] => {
                Ok(ArtifactCoordinates::new(*group_id, *artifact_id, *version))
            }
            [group_id, artifact_id, extension, version] => {
                Ok(ArtifactCoordinates::new(*group_id, *artifact_id, *version)
                    .with_extension(*extension))
            }
            [group_id, artifact_id, extension, classifier, version] => {
                Ok(ArtifactCoordinates::new(*group_id, *artifact_id, *version)
                    .with_extension(*extension)
                    .with_classifier(*classifier))
            }
            _ => Err(CoreError::InvalidCoordinates(s.to_string())),
        }
    }
}

impl Serialize for ArtifactCoordinates {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ArtifactCoordinates {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A module within a group, with its definition parameters.
///
/// Parameters are kept sorted by key so that launch arguments built from
/// them come out in the same order on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    pub group: String,
    pub label: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl ModuleDefinition {
    pub fn new(group: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            label: label.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeploymentId {
    pub group: String,
    pub label: String,
}

impl DeploymentId {
    pub fn new(group: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            label: label.into(),
        }
    }

    pub fn from_definition(definition: &ModuleDefinition) -> Self {
        Self::new(definition.group.clone(), definition.label.clone())
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRequest {
    pub coordinates: ArtifactCoordinates,
    pub definition: ModuleDefinition,
    #[serde(default)]
    pub deployment_properties: BTreeMap<String, String>,
    #[serde(default)]
    pub count: Option<u32>,
}

impl DeploymentRequest {
    pub fn new(coordinates: ArtifactCoordinates, definition: ModuleDefinition) -> Self {
        Self {
            coordinates,
            definition,
            deployment_properties: BTreeMap::new(),
            count: None,
        }
    }

    pub fn with_deployment_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.deployment_properties = properties;
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn id(&self) -> DeploymentId {
        DeploymentId::from_definition(&self.definition)
    }
}

/// Kind of application package registered with the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloudAppType {
    Task,
}

impl CloudAppType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudAppType::Task => "TASK",
        }
    }
}

impl fmt::Display for CloudAppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const RUNNING_STATE: &str = "RUNNING";

/// States after which an instance will never run again.
pub const TERMINAL_STATES: [&str; 3] = ["FINISHED", "FAILED", "KILLED"];

/// Snapshot of one instance as reported by the cluster application service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudAppInstanceInfo {
    pub application_id: String,
    pub name: String,
    pub state: String,
    #[serde(default)]
    pub address: Option<String>,
}

impl CloudAppInstanceInfo {
    pub fn new(
        application_id: impl Into<String>,
        name: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            application_id: application_id.into(),
            name: name.into(),
            state: state.into(),
            address: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == RUNNING_STATE
    }

    /// Anything not yet terminal is live, including instances still
    /// waiting to be scheduled.
    pub fn is_terminal(&self) -> bool {
        TERMINAL_STATES.contains(&self.state.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInstanceStatus {
    pub instance_id: String,
    pub running: bool,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ModuleInstanceStatus {
    pub fn new(instance_id: impl Into<String>, running: bool) -> Self {
        Self {
            instance_id: instance_id.into(),
            running,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    Deployed,
    Partial,
    Undeployed,
}

/// Aggregated status of every cluster instance sharing one deployment id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleStatus {
    pub id: DeploymentId,
    pub instances: Vec<ModuleInstanceStatus>,
}

impl ModuleStatus {
    pub fn of(id: DeploymentId) -> ModuleStatusBuilder {
        ModuleStatusBuilder {
            id,
            instances: Vec::new(),
        }
    }

    /// Status for an id with no live instance.
    pub fn not_running(id: DeploymentId) -> Self {
        let instance = ModuleInstanceStatus::new(id.to_string(), false);
        Self::of(id).with(instance).build()
    }

    pub fn is_running(&self) -> bool {
        self.instances.iter().any(|instance| instance.running)
    }

    pub fn state(&self) -> ModuleState {
        let running = self.instances.iter().filter(|i| i.running).count();
        if running == 0 {
            ModuleState::Undeployed
        } else if running == self.instances.len() {
            ModuleState::Deployed
        } else {
            ModuleState::Partial
        }
    }

    /// Append the instances of `other`, which must describe the same id.
    pub fn merge(&mut self, other: ModuleStatus) {
        debug_assert_eq!(self.id, other.id);
        self.instances.extend(other.instances);
    }
}

pub struct ModuleStatusBuilder {
    id: DeploymentId,
    instances: Vec<ModuleInstanceStatus>,
}

impl ModuleStatusBuilder {
    pub fn with(mut self, instance: ModuleInstanceStatus) -> Self {
        self.instances.push(instance);
        self
    }

    pub fn build(self) -> ModuleStatus {
        ModuleStatus {
            id: self.id,
            instances: self.instances,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
    pub details: Option<HashMap<String, String>>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_details(mut self, details: HashMap<String, String>) -> Self {
        self.details = Some(details);
        self
    }
}
