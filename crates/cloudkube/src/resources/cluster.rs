use converge::SpecError;
use serde::{Deserialize, Serialize};
use tracing::{Level, instrument};

use super::{DELETE_SETTLE_DELAY, DELETING, READY, SETTLE_DELAY, minutes, wait_spec};
use crate::{
    Error, Result,
    api::{Cluster, ClusterCreateRequest, Kubeconfig},
    lifecycle::{DELETED, FOUND, LifecyclePlan, NOT_FOUND},
    repository::{ResourceRepository, RestClient, TransportError},
};

/// Status of a cluster whose control plane is being deployed.
pub const INSTALLING: &str = "INSTALLING";

/// Clusters of one cloud project.
#[derive(Debug, Clone)]
pub struct ClusterRepository {
    client: RestClient,
    project_id: String,
}

impl ClusterRepository {
    pub fn new(client: RestClient, project_id: impl Into<String>) -> Self {
        Self {
            client,
            project_id: project_id.into(),
        }
    }

    fn collection(&self) -> String {
        format!("/cloud/project/{}/kube", self.project_id)
    }

    fn item(&self, id: &str) -> String {
        format!("{}/{}", self.collection(), id)
    }

    /// Fetch the admin kubeconfig of a cluster.
    #[instrument(level = Level::DEBUG, skip(self))]
    pub async fn kubeconfig(&self, id: &str) -> Result<Kubeconfig, TransportError> {
        let endpoint = format!("{}/kubeconfig", self.item(id));
        self.client.post(&endpoint, None::<&()>).await
    }
}

impl ResourceRepository for ClusterRepository {
    type Resource = Cluster;
    type CreateRequest = ClusterCreateRequest;

    const KIND: &'static str = "cluster";

    async fn create(&self, request: &ClusterCreateRequest) -> Result<Cluster, TransportError> {
        self.client.post(&self.collection(), Some(request)).await
    }

    async fn get(&self, id: &str) -> Result<Cluster, TransportError> {
        self.client.get(&self.item(id)).await
    }

    async fn delete(&self, id: &str) -> Result<(), TransportError> {
        self.client.delete(&self.item(id)).await
    }
}

/// Waits for cluster operations. Clusters cannot be updated in place.
pub fn plan() -> Result<LifecyclePlan, SpecError> {
    Ok(LifecyclePlan {
        existence: wait_spec(&[NOT_FOUND], &[FOUND], minutes(30), SETTLE_DELAY)?,
        provisioning: wait_spec(&[INSTALLING], &[READY], minutes(20), SETTLE_DELAY)?,
        update: None,
        deletion: wait_spec(&[DELETING], &[DELETED], minutes(10), DELETE_SETTLE_DELAY)?,
    })
}

/// Credentials of the current context of a kubeconfig, still base64-encoded.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ClusterCredentials {
    pub server: String,
    pub client_certificate_data: String,
    pub client_key_data: String,
    pub cluster_ca_certificate_data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct KubeconfigFile {
    current_context: String,
    #[serde(default)]
    contexts: Vec<NamedContext>,
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    users: Vec<NamedUser>,
}

#[derive(Deserialize)]
struct NamedContext {
    name: String,
    context: ContextEntry,
}

#[derive(Deserialize)]
struct ContextEntry {
    cluster: String,
    user: String,
}

#[derive(Deserialize)]
struct NamedCluster {
    name: String,
    cluster: ClusterEntry,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ClusterEntry {
    server: String,
    #[serde(default)]
    certificate_authority_data: String,
}

#[derive(Deserialize)]
struct NamedUser {
    name: String,
    user: UserEntry,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct UserEntry {
    #[serde(default)]
    client_certificate_data: String,
    #[serde(default)]
    client_key_data: String,
}

impl ClusterCredentials {
    pub fn from_kubeconfig(content: &str) -> Result<Self> {
        let file: KubeconfigFile =
            serde_yaml_ng::from_str(content).map_err(|e| Error::Kubeconfig(e.to_string()))?;

        let context = file
            .contexts
            .iter()
            .find(|c| c.name == file.current_context)
            .ok_or_else(|| {
                Error::Kubeconfig(format!("no context named {:?}", file.current_context))
            })?;
        let cluster = file
            .clusters
            .iter()
            .find(|c| c.name == context.context.cluster)
            .ok_or_else(|| {
                Error::Kubeconfig(format!("no cluster named {:?}", context.context.cluster))
            })?;
        let user = file
            .users
            .iter()
            .find(|u| u.name == context.context.user)
            .ok_or_else(|| Error::Kubeconfig(format!("no user named {:?}", context.context.user)))?;

        Ok(Self {
            server: cluster.cluster.server.clone(),
            client_certificate_data: user.user.client_certificate_data.clone(),
            client_key_data: user.user.client_key_data.clone(),
            cluster_ca_certificate_data: cluster.cluster.certificate_authority_data.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: kubernetes-admin@demo
clusters:
- name: other
  cluster:
    server: https://other.example.net
- name: demo
  cluster:
    server: https://abc123.c1.gra7.k8s.example.net
    certificate-authority-data: Q0EtREFUQQ==
contexts:
- name: kubernetes-admin@demo
  context:
    cluster: demo
    user: kubernetes-admin-demo
users:
- name: kubernetes-admin-demo
  user:
    client-certificate-data: Q0VSVA==
    client-key-data: S0VZ
"#;

    #[test]
    fn extracts_current_context_credentials() {
        let creds = ClusterCredentials::from_kubeconfig(KUBECONFIG).unwrap();
        assert_eq!(
            creds,
            ClusterCredentials {
                server: "https://abc123.c1.gra7.k8s.example.net".to_string(),
                client_certificate_data: "Q0VSVA==".to_string(),
                client_key_data: "S0VZ".to_string(),
                cluster_ca_certificate_data: "Q0EtREFUQQ==".to_string(),
            }
        );
    }

    #[test]
    fn rejects_dangling_context() {
        let broken = KUBECONFIG.replace("cluster: demo", "cluster: missing");
        let err = ClusterCredentials::from_kubeconfig(&broken).unwrap_err();
        assert!(matches!(err, Error::Kubeconfig(msg) if msg.contains("missing")));

        assert!(ClusterCredentials::from_kubeconfig("not: [valid").is_err());
    }

    #[test]
    fn default_plan() {
        let plan = plan().unwrap();

        assert!(plan.update.is_none());
        assert_eq!(plan.existence.timeout(), Duration::from_secs(30 * 60));
        assert_eq!(plan.provisioning.timeout(), Duration::from_secs(20 * 60));
        assert!(plan.provisioning.pending().eq([INSTALLING]));
        assert_eq!(plan.deletion.delay(), Duration::from_secs(10));
        assert_eq!(plan.deletion.min_poll_interval(), Duration::from_secs(3));
    }
}
