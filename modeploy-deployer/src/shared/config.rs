use modeploy_core::PropertyForwarding;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:9393";
pub const DEFAULT_APP_NAME: &str = "app";
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PUSH_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_PUSH_BACKOFF_MS: u64 = 200;

/// Bounded retry applied to application registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_PUSH_MAX_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_PUSH_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// Linear backoff before retry number `attempt`, saturating at `Duration::MAX`
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployerConfig {
    pub listen_addr: SocketAddr,
    /// Base URL of the cluster application service; `None` runs in-memory.
    pub cluster_url: Option<String>,
    pub app_name: String,
    pub call_timeout: Duration,
    pub push_retry: RetryPolicy,
    pub property_forwarding: PropertyForwarding,
}

impl Default for DeployerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 9393)),
            cluster_url: None,
            app_name: DEFAULT_APP_NAME.to_string(),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            push_retry: RetryPolicy::default(),
            property_forwarding: PropertyForwarding::Disabled,
        }
    }
}

impl DeployerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let listen_addr = parse_or("MODEPLOY_LISTEN_ADDR", &lookup, defaults.listen_addr);
        let cluster_url = lookup("MODEPLOY_CLUSTER_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        let app_name = lookup("MODEPLOY_APP_NAME")
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or(defaults.app_name);
        let call_timeout = Duration::from_secs(parse_or(
            "MODEPLOY_CALL_TIMEOUT_SECS",
            &lookup,
            DEFAULT_CALL_TIMEOUT_SECS,
        ));
        let max_attempts = parse_or(
            "MODEPLOY_PUSH_MAX_ATTEMPTS",
            &lookup,
            DEFAULT_PUSH_MAX_ATTEMPTS,
        )
        .max(1);
        let backoff = Duration::from_millis(parse_or(
            "MODEPLOY_PUSH_BACKOFF_MS",
            &lookup,
            DEFAULT_PUSH_BACKOFF_MS,
        ));
        let property_forwarding =
            if parse_or("MODEPLOY_FORWARD_DEPLOYMENT_PROPERTIES", &lookup, false) {
                PropertyForwarding::LaunchArguments
            } else {
                PropertyForwarding::Disabled
            };

        Self {
            listen_addr,
            cluster_url,
            app_name,
            call_timeout,
            push_retry: RetryPolicy {
                max_attempts,
                backoff,
            },
            property_forwarding,
        }
    }
}

fn parse_or<T>(key: &str, lookup: &impl Fn(&str) -> Option<String>, default: T) -> T
where
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "Ignoring unparsable configuration value");
                default
            }
        },
        None => default,
    }
}
