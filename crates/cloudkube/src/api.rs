use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

/// Managed Kubernetes cluster as reported by the backend.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    pub version: String,
    pub status: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub nodes_url: Option<String>,
    #[serde(default)]
    pub is_up_to_date: bool,
    #[serde(default)]
    pub control_plane_is_up_to_date: bool,
    #[serde(default)]
    pub next_upgrade_versions: Vec<String>,
    #[serde(default)]
    pub update_policy: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCreateRequest {
    #[garde(length(min = 1, max = 64))]
    pub name: String,
    #[garde(custom(region_code))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[garde(custom(kube_version))]
    pub version: String,
}

/// Node pool attached to a cluster.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodePool {
    pub id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    pub name: String,
    pub flavor: String,
    pub status: String,
    pub desired_nodes: u32,
    pub min_nodes: u32,
    pub max_nodes: u32,
    #[serde(default)]
    pub current_nodes: Option<u32>,
    #[serde(default)]
    pub monthly_billed: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolCreateRequest {
    #[garde(length(min = 1, max = 64))]
    pub name: String,
    #[garde(length(min = 1))]
    pub flavor_name: String,
    #[garde(custom(within(self.min_nodes, self.max_nodes)))]
    pub desired_nodes: u32,
    #[garde(custom(at_most(self.max_nodes)))]
    pub min_nodes: u32,
    #[garde(range(min = 1))]
    pub max_nodes: u32,
    #[garde(skip)]
    #[serde(default)]
    pub monthly_billed: bool,
}

/// Only the capacity of a node pool can change after creation.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolUpdateRequest {
    #[garde(custom(within(self.min_nodes, self.max_nodes)))]
    pub desired_nodes: u32,
    #[garde(custom(at_most(self.max_nodes)))]
    pub min_nodes: u32,
    #[garde(range(min = 1))]
    pub max_nodes: u32,
}

impl From<&NodePool> for NodePoolUpdateRequest {
    fn from(pool: &NodePool) -> Self {
        Self {
            desired_nodes: pool.desired_nodes,
            min_nodes: pool.min_nodes,
            max_nodes: pool.max_nodes,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Kubeconfig {
    pub content: String,
}

fn kube_version(value: &str, _: &()) -> garde::Result {
    let valid = value
        .split_once('.')
        .is_some_and(|(major, minor)| is_number(major) && is_number(minor));
    if !valid {
        return Err(garde::Error::new(format!(
            "{value:?} is not a MAJOR.MINOR Kubernetes version"
        )));
    }
    Ok(())
}

fn region_code(value: &Option<String>, _: &()) -> garde::Result {
    let Some(region) = value else {
        return Ok(());
    };
    let letters = region.trim_end_matches(|c: char| c.is_ascii_digit());
    let valid = !letters.is_empty()
        && letters.len() < region.len()
        && letters.chars().all(|c| c.is_ascii_uppercase());
    if !valid {
        return Err(garde::Error::new(format!(
            "{region:?} is not a region code such as GRA7"
        )));
    }
    Ok(())
}

fn at_most(max: u32) -> impl FnOnce(&u32, &()) -> garde::Result {
    move |value, _| {
        if *value > max {
            return Err(garde::Error::new(format!("must not exceed {max}")));
        }
        Ok(())
    }
}

fn within(min: u32, max: u32) -> impl FnOnce(&u32, &()) -> garde::Result {
    move |value, _| {
        if *value < min || *value > max {
            return Err(garde::Error::new(format!("must be between {min} and {max}")));
        }
        Ok(())
    }
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
