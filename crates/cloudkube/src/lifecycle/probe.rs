use std::future::Future;

use converge::{Observation, ResourceProbe};

use crate::repository::{ObservedResource, ResourceRepository, TransportError};

/// Synthetic label for a resource that cannot be fetched yet.
pub const NOT_FOUND: &str = "NOT_FOUND";
/// Synthetic label for a resource that can be fetched, whatever its status.
pub const FOUND: &str = "FOUND";
/// Synthetic label for a resource that is gone after deletion.
pub const DELETED: &str = "DELETED";

/// How a fetch result is turned into a state label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMode {
    /// Right after creation: not-found is `NOT_FOUND`, any fetched payload is `FOUND`.
    Existence,
    /// The resource's own status field. Not-found is fatal.
    Status,
    /// After deletion: not-found is `DELETED`, otherwise the status field.
    Absence,
}

/// Map one fetch of a resource to an observation.
///
/// Transport errors other than not-found are always returned as-is.
pub fn classify<T: ObservedResource>(
    mode: ProbeMode,
    fetched: Result<T, TransportError>,
) -> Result<Observation<T>, TransportError> {
    match (mode, fetched) {
        (ProbeMode::Existence, Ok(resource)) => Ok(Observation::new(FOUND, resource)),
        (ProbeMode::Existence, Err(e)) if e.is_not_found() => Ok(Observation::absent(NOT_FOUND)),
        (ProbeMode::Absence, Err(e)) if e.is_not_found() => Ok(Observation::absent(DELETED)),
        (ProbeMode::Status | ProbeMode::Absence, Ok(resource)) => {
            Ok(Observation::new(resource.status().to_string(), resource))
        }
        (_, Err(e)) => Err(e),
    }
}

/// A [`ResourceProbe`] that fetches one resource through its repository.
pub struct RepositoryProbe<'a, R> {
    repository: &'a R,
    id: &'a str,
    mode: ProbeMode,
}

impl<'a, R: ResourceRepository> RepositoryProbe<'a, R> {
    pub fn new(repository: &'a R, id: &'a str, mode: ProbeMode) -> Self {
        Self {
            repository,
            id,
            mode,
        }
    }
}

impl<R: ResourceRepository> ResourceProbe for RepositoryProbe<'_, R> {
    type Payload = R::Resource;
    type Error = TransportError;

    fn probe(
        &self,
    ) -> impl Future<Output = Result<Observation<R::Resource>, TransportError>> + Send {
        async move { classify(self.mode, self.repository.get(self.id).await) }
    }
}
