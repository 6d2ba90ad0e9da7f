use std::{path::Path, time::Duration};

use anyhow::Context;
use converge::{SpecError, WaitSpec};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::lifecycle::{LifecyclePlan, RetryPolicy};

pub const DEFAULT_ENDPOINT: &str = "https://eu.api.ovh.com/1.0";

/// Contents of the YAML configuration file. Every field is optional.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the cloud API
    pub endpoint: Option<String>,
    /// Cloud project owning the clusters
    pub project_id: Option<String>,
    /// Bearer token sent with every request
    pub token: Option<String>,
    /// Overrides for cluster waits
    pub cluster: PlanOverrides,
    /// Overrides for node pool waits
    pub node_pool: PlanOverrides,
    /// Retries of delete operations on transport errors
    pub delete_retry: RetryOverrides,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct PlanOverrides {
    pub existence: WaitOverrides,
    pub provisioning: WaitOverrides,
    pub update: WaitOverrides,
    pub deletion: WaitOverrides,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct WaitOverrides {
    pub timeout_secs: Option<u64>,
    pub delay_secs: Option<u64>,
    pub min_poll_interval_secs: Option<u64>,
    pub max_poll_interval_secs: Option<u64>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct RetryOverrides {
    pub attempts: Option<u32>,
    pub backoff_secs: Option<u64>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        serde_yaml_ng::from_str(&data)
            .with_context(|| format!("parse config file {}", path.display()))
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn delete_retry(&self) -> RetryPolicy {
        let default = RetryPolicy::default();
        RetryPolicy {
            attempts: self.delete_retry.attempts.unwrap_or(default.attempts).max(1),
            backoff: self
                .delete_retry
                .backoff_secs
                .map_or(default.backoff, Duration::from_secs),
        }
    }

    /// JSON schema of the configuration file.
    pub fn schema() -> schemars::Schema {
        schemars::schema_for!(Config)
    }
}

impl PlanOverrides {
    pub fn apply(&self, plan: LifecyclePlan) -> Result<LifecyclePlan, SpecError> {
        Ok(LifecyclePlan {
            existence: self.existence.apply(plan.existence)?,
            provisioning: self.provisioning.apply(plan.provisioning)?,
            update: plan.update.map(|spec| self.update.apply(spec)).transpose()?,
            deletion: self.deletion.apply(plan.deletion)?,
        })
    }
}

impl WaitOverrides {
    pub fn apply(&self, mut spec: WaitSpec) -> Result<WaitSpec, SpecError> {
        if let Some(secs) = self.timeout_secs {
            spec = spec.with_timeout(Duration::from_secs(secs))?;
        }
        if let Some(secs) = self.delay_secs {
            spec = spec.with_delay(Duration::from_secs(secs));
        }
        if let Some(secs) = self.min_poll_interval_secs {
            spec = spec.with_min_poll_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = self.max_poll_interval_secs {
            spec = spec.with_max_poll_interval(Duration::from_secs(secs));
        }
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::node_pool;

    const CONFIG: &str = r#"
project_id: 0123abcd
node_pool:
  provisioning:
    timeout_secs: 1800
    min_poll_interval_secs: 10
  update:
    timeout_secs: 60
delete_retry:
  attempts: 5
"#;

    #[test]
    fn parses_partial_config() {
        let config: Config = serde_yaml_ng::from_str(CONFIG).unwrap();

        assert_eq!(config.project_id.as_deref(), Some("0123abcd"));
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(config.cluster, PlanOverrides::default());
        assert_eq!(
            config.delete_retry(),
            RetryPolicy {
                attempts: 5,
                backoff: Duration::from_secs(10),
            }
        );
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(serde_yaml_ng::from_str::<Config>("project: x").is_err());
    }

    #[test]
    fn overrides_only_what_is_set() {
        let config: Config = serde_yaml_ng::from_str(CONFIG).unwrap();
        let defaults = node_pool::plan().unwrap();

        let plan = config.node_pool.apply(defaults.clone()).unwrap();

        assert_eq!(plan.provisioning.timeout(), Duration::from_secs(1800));
        assert_eq!(plan.provisioning.min_poll_interval(), Duration::from_secs(10));
        assert_eq!(plan.provisioning.delay(), defaults.provisioning.delay());
        assert_eq!(plan.update.unwrap().timeout(), Duration::from_secs(60));
        assert_eq!(plan.existence, defaults.existence);
        assert_eq!(plan.deletion, defaults.deletion);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let overrides = PlanOverrides {
            deletion: WaitOverrides {
                timeout_secs: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };

        let err = overrides.apply(node_pool::plan().unwrap()).unwrap_err();
        assert_eq!(err, SpecError::ZeroTimeout);
    }

    #[test]
    fn schema_describes_overrides() {
        let schema = serde_json::to_value(Config::schema()).unwrap();
        assert!(schema["properties"]["node_pool"].is_object());
        assert!(schema.to_string().contains("timeout_secs"));
    }
}
