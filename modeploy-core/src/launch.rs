use crate::ArtifactCoordinates;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix the cluster client strips before passing an option to the
/// launched container.
pub const LAUNCH_CONTEXT_ARGUMENT: &str = "--spring.yarn.client.launchcontext.arguments.";
pub const COORDINATES_OPTION: &str = "--dataflow.module.coordinates";
pub const PARAMETER_OPTION: &str = "--dataflow.module.parameters.";
pub const DEPLOYMENT_PROPERTY_OPTION: &str = "--dataflow.module.deploymentProperties.";
pub const APP_NAME_OPTION: &str = "--spring.yarn.appName";

/// Whether deployment properties travel with the launch arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyForwarding {
    #[default]
    Disabled,
    LaunchArguments,
}

/// Ordered launch arguments for one submission.
///
/// Order: coordinates, instance name, then one `key=value` argument per
/// definition parameter in key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    args: Vec<String>,
}

impl LaunchSpec {
    pub fn build(
        coordinates: &ArtifactCoordinates,
        instance_name: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Self {
        let mut args = Vec::with_capacity(parameters.len() + 2);
        args.push(format!(
            "{LAUNCH_CONTEXT_ARGUMENT}{COORDINATES_OPTION}={coordinates}"
        ));
        args.push(format!("{APP_NAME_OPTION}={instance_name}"));
        for (key, value) in parameters {
            args.push(format!(
                "{LAUNCH_CONTEXT_ARGUMENT}{PARAMETER_OPTION}{key}={value}"
            ));
        }
        Self { args }
    }

    pub fn with_deployment_properties(
        mut self,
        properties: &BTreeMap<String, String>,
        forwarding: PropertyForwarding,
    ) -> Self {
        if forwarding == PropertyForwarding::LaunchArguments {
            for (key, value) in properties {
                self.args.push(format!(
                    "{LAUNCH_CONTEXT_ARGUMENT}{DEPLOYMENT_PROPERTY_OPTION}{key}={value}"
                ));
            }
        }
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn into_args(self) -> Vec<String> {
        self.args
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// Extract the instance name carried by a launch argument list.
pub fn instance_name_from_args(args: &[String]) -> Option<&str> {
    args.iter().find_map(|arg| {
        arg.strip_prefix(APP_NAME_OPTION)
            .and_then(|rest| rest.strip_prefix('='))
    })
}
