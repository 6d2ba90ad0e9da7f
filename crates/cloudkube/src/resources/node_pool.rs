use converge::SpecError;

use super::{DELETE_SETTLE_DELAY, DELETING, READY, SETTLE_DELAY, minutes, wait_spec};
use crate::{
    api::{NodePool, NodePoolCreateRequest, NodePoolUpdateRequest},
    lifecycle::{DELETED, FOUND, LifecyclePlan, NOT_FOUND},
    repository::{MutableRepository, ResourceRepository, RestClient, TransportError},
};

/// Statuses a node pool passes through while nodes are added, replaced or removed.
/// The backend uses them for creation and resizing alike.
pub const TRANSITIONAL: [&str; 4] = ["INSTALLING", "UPDATING", "REDEPLOYING", "RESIZING"];

/// Node pools of one cluster.
#[derive(Debug, Clone)]
pub struct NodePoolRepository {
    client: RestClient,
    project_id: String,
    cluster_id: String,
}

impl NodePoolRepository {
    pub fn new(
        client: RestClient,
        project_id: impl Into<String>,
        cluster_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            project_id: project_id.into(),
            cluster_id: cluster_id.into(),
        }
    }

    fn collection(&self) -> String {
        format!(
            "/cloud/project/{}/kube/{}/nodepool",
            self.project_id, self.cluster_id
        )
    }

    fn item(&self, id: &str) -> String {
        format!("{}/{}", self.collection(), id)
    }
}

impl ResourceRepository for NodePoolRepository {
    type Resource = NodePool;
    type CreateRequest = NodePoolCreateRequest;

    const KIND: &'static str = "node pool";

    async fn create(&self, request: &NodePoolCreateRequest) -> Result<NodePool, TransportError> {
        self.client.post(&self.collection(), Some(request)).await
    }

    async fn get(&self, id: &str) -> Result<NodePool, TransportError> {
        self.client.get(&self.item(id)).await
    }

    async fn delete(&self, id: &str) -> Result<(), TransportError> {
        self.client.delete(&self.item(id)).await
    }
}

impl MutableRepository for NodePoolRepository {
    type UpdateRequest = NodePoolUpdateRequest;

    async fn update(&self, id: &str, request: &NodePoolUpdateRequest) -> Result<(), TransportError> {
        self.client.put(&self.item(id), request).await
    }
}

pub fn plan() -> Result<LifecyclePlan, SpecError> {
    Ok(LifecyclePlan {
        existence: wait_spec(&[NOT_FOUND], &[FOUND], minutes(2), SETTLE_DELAY)?,
        provisioning: wait_spec(&TRANSITIONAL, &[READY], minutes(10), SETTLE_DELAY)?,
        update: Some(wait_spec(&TRANSITIONAL, &[READY], minutes(45), SETTLE_DELAY)?),
        deletion: wait_spec(&[DELETING], &[DELETED], minutes(45), DELETE_SETTLE_DELAY)?,
    })
}
