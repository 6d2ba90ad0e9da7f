use std::{fmt, time::Duration};

use converge::ConvergenceWaiter;
use garde::Validate;
use tracing::{Level, instrument};

use crate::{
    Error, Result,
    repository::{MutableRepository, ObservedResource, ResourceRepository},
};

pub mod plan;
pub mod probe;

pub use plan::{LifecyclePlan, Stage};
pub use probe::{DELETED, FOUND, NOT_FOUND, ProbeMode, RepositoryProbe, classify};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Create => "create",
            OperationKind::Read => "read",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        })
    }
}

/// Bounded retry of a whole delete operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(10),
        }
    }
}

/// Drives create, update and delete calls of one resource kind to completion.
pub struct Lifecycle<R> {
    repository: R,
    plan: LifecyclePlan,
    waiter: ConvergenceWaiter,
}

impl<R: ResourceRepository> Lifecycle<R> {
    pub fn new(repository: R, plan: LifecyclePlan, waiter: ConvergenceWaiter) -> Self {
        Self {
            repository,
            plan,
            waiter,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn plan(&self) -> &LifecyclePlan {
        &self.plan
    }

    /// Create the resource and wait until it is visible and provisioned.
    ///
    /// If a wait fails, the returned error still carries the new identifier
    /// (see [`Error::resource_id`]): the resource may exist in a partial state.
    #[instrument(level = Level::DEBUG, skip(self), fields(kind = R::KIND))]
    pub async fn create(&self, request: &R::CreateRequest) -> Result<R::Resource> {
        request
            .validate()
            .map_err(|source| Error::InvalidRequest {
                kind: R::KIND,
                source,
            })?;
        self.check_cancelled(OperationKind::Create, None)?;

        tracing::info!("Creating {}: {:?}", R::KIND, request);
        let created = self
            .repository
            .create(request)
            .await
            .map_err(|source| Error::Request {
                kind: R::KIND,
                operation: OperationKind::Create,
                id: None,
                source,
            })?;

        let id = created.id().to_string();
        tracing::info!("Created {} {}, waiting for it to be ready", R::KIND, id);

        self.complete(OperationKind::Create, &id).await
    }

    #[instrument(level = Level::DEBUG, skip(self), fields(kind = R::KIND))]
    pub async fn read(&self, id: &str) -> Result<R::Resource> {
        self.repository
            .get(id)
            .await
            .map_err(|source| Error::Request {
                kind: R::KIND,
                operation: OperationKind::Read,
                id: Some(id.to_string()),
                source,
            })
    }

    /// Delete the resource and wait until it can no longer be fetched.
    #[instrument(level = Level::DEBUG, skip(self), fields(kind = R::KIND))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.check_cancelled(OperationKind::Delete, Some(id))?;

        tracing::info!("Deleting {} {}", R::KIND, id);
        self.repository
            .delete(id)
            .await
            .map_err(|source| Error::Request {
                kind: R::KIND,
                operation: OperationKind::Delete,
                id: Some(id.to_string()),
                source,
            })?;

        self.converge(OperationKind::Delete, id).await?;
        tracing::info!("{} {} is deleted", R::KIND, id);
        Ok(())
    }

    /// [`delete`](Self::delete), retried while it fails on transport errors.
    ///
    /// A delete call answered with not-found is never retried. On the first
    /// attempt it is an error; on a retry it means an earlier attempt went
    /// through, so it counts as success.
    pub async fn delete_with_retry(&self, id: &str, policy: RetryPolicy) -> Result<()> {
        let mut attempt = 1;
        loop {
            let err = match self.delete(id).await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };

            if err.is_not_found_on(OperationKind::Delete) {
                if attempt == 1 {
                    return Err(err);
                }
                tracing::info!("{} {} already deleted", R::KIND, id);
                return Ok(());
            }
            if attempt >= policy.attempts || !err.is_transport() {
                return Err(err);
            }

            tracing::warn!(
                attempt,
                "Deleting {} {} failed, retrying in {:?}: {}",
                R::KIND,
                id,
                policy.backoff,
                err
            );
            tokio::select! {
                biased;
                _ = self.waiter.cancellation().cancelled() => {
                    return Err(Error::Cancelled {
                        kind: R::KIND,
                        operation: OperationKind::Delete,
                        id: Some(id.to_string()),
                    });
                }
                _ = tokio::time::sleep(policy.backoff) => {}
            }
            attempt += 1;
        }
    }

    /// Run every wait of `operation` and return the resource's final state.
    async fn complete(&self, operation: OperationKind, id: &str) -> Result<R::Resource> {
        match self.converge(operation, id).await? {
            Some(resource) => Ok(resource),
            None => self.read(id).await,
        }
    }

    /// Run the plan's waits for `operation` in order. Returns the payload of
    /// the last observation, if it carried one.
    async fn converge(&self, operation: OperationKind, id: &str) -> Result<Option<R::Resource>> {
        let mut last = None;

        for stage in self.plan.stages(operation) {
            tracing::debug!(stage = stage.name, "Waiting for {} {}", R::KIND, id);

            let probe = RepositoryProbe::new(&self.repository, id, stage.mode);
            let done = self
                .waiter
                .wait(id, &probe, stage.spec)
                .await
                .map_err(|source| Error::Wait {
                    kind: R::KIND,
                    operation,
                    id: id.to_string(),
                    stage: stage.name,
                    source,
                })?;

            tracing::debug!(
                stage = stage.name,
                probes = done.probes,
                elapsed = ?done.elapsed,
                "{} {} is {}",
                R::KIND,
                id,
                done.observation.state
            );
            last = done.observation.payload;
        }

        Ok(last)
    }

    fn check_cancelled(&self, operation: OperationKind, id: Option<&str>) -> Result<()> {
        if self.waiter.cancellation().is_cancelled() {
            return Err(Error::Cancelled {
                kind: R::KIND,
                operation,
                id: id.map(str::to_string),
            });
        }
        Ok(())
    }
}

impl<R: MutableRepository> Lifecycle<R> {
    /// Apply an in-place update and wait for the resource to settle again.
    #[instrument(level = Level::DEBUG, skip(self), fields(kind = R::KIND))]
    pub async fn update(&self, id: &str, request: &R::UpdateRequest) -> Result<R::Resource> {
        request
            .validate()
            .map_err(|source| Error::InvalidRequest {
                kind: R::KIND,
                source,
            })?;
        self.check_cancelled(OperationKind::Update, Some(id))?;

        tracing::info!("Updating {} {}: {:?}", R::KIND, id, request);
        self.repository
            .update(id, request)
            .await
            .map_err(|source| Error::Request {
                kind: R::KIND,
                operation: OperationKind::Update,
                id: Some(id.to_string()),
                source,
            })?;

        self.complete(OperationKind::Update, id).await
    }
}
