//! Instance naming convention.
//!
//! A deployment is found again on the cluster purely by name: the deployer
//! launches every instance under `<prefix>:<group>:<label>` and decodes that
//! name back into a [`DeploymentId`] when it lists instances.
//!
//! Group and label must be non-empty and must not contain [`DELIMITER`],
//! otherwise the name cannot be decoded. [`InstanceNameCodec::validate`]
//! checks this and callers run it before any name is handed to the cluster.

use crate::{CoreError, DeploymentId, Result};

pub const DELIMITER: char = ':';

/// Prefix used for one-shot task deployments.
pub const TASK_PREFIX: &str = "scdtask";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceNameCodec {
    prefix: String,
}

impl InstanceNameCodec {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn task() -> Self {
        Self::new(TASK_PREFIX)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn validate(id: &DeploymentId) -> Result<()> {
        for (field, value) in [("group", &id.group), ("label", &id.label)] {
            if value.is_empty() {
                return Err(CoreError::InvalidRequest(format!(
                    "deployment {field} cannot be empty"
                )));
            }
            if value.contains(DELIMITER) {
                return Err(CoreError::InvalidRequest(format!(
                    "deployment {field} '{value}' must not contain '{DELIMITER}'"
                )));
            }
        }
        Ok(())
    }

    pub fn encode(&self, id: &DeploymentId) -> String {
        debug_assert!(Self::validate(id).is_ok(), "unencodable id {id}");
        format!(
            "{}{DELIMITER}{}{DELIMITER}{}",
            self.prefix, id.group, id.label
        )
    }

    /// Decode any three-part name. The prefix itself is not compared here;
    /// use [`InstanceNameCodec::matches`] to filter first.
    pub fn decode(&self, name: &str) -> Result<DeploymentId> {
        let parts: Vec<&str> = name.split(DELIMITER).collect();
        match parts.as_slice() {
            [_, group, label] if !group.is_empty() && !label.is_empty() => {
                Ok(DeploymentId::new(*group, *label))
            }
            _ => Err(CoreError::InvalidIdentifier(format!(
                "invalid instance name [{name}]"
            ))),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| rest.starts_with(DELIMITER))
    }
}

impl Default for InstanceNameCodec {
    fn default() -> Self {
        Self::task()
    }
}
