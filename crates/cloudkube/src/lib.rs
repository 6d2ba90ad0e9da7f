/// Cloud API payloads and requests
pub mod api;

/// Command-line configuration
pub mod config;

/// Create/update/delete orchestration around convergence waits
pub mod lifecycle;

/// Request/response access to the cloud API
pub mod repository;

/// Clusters and node pools
pub mod resources;

use converge::{SpecError, WaitError};
use thiserror::Error;

use crate::{lifecycle::OperationKind, repository::TransportError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid {kind} request: {source}")]
    InvalidRequest {
        kind: &'static str,
        source: garde::Report,
    },
    #[error("Failed to {operation} {kind}{}: {source}", .id.as_deref().map(|id| format!(" {id}")).unwrap_or_default())]
    Request {
        kind: &'static str,
        operation: OperationKind,
        id: Option<String>,
        source: TransportError,
    },
    #[error("Failed to {operation} {kind} {id} ({stage} wait): {source}")]
    Wait {
        kind: &'static str,
        operation: OperationKind,
        id: String,
        stage: &'static str,
        source: WaitError<TransportError>,
    },
    #[error("Cancelled {operation} of {kind}{}", .id.as_deref().map(|id| format!(" {id}")).unwrap_or_default())]
    Cancelled {
        kind: &'static str,
        operation: OperationKind,
        id: Option<String>,
    },
    #[error("Invalid wait configuration: {0}")]
    WaitSpec(#[from] SpecError),
    #[error("Invalid kubeconfig: {0}")]
    Kubeconfig(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Identifier of the resource the failed operation acted on, if one was
    /// known or assigned before the failure.
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            Error::Request { id, .. } | Error::Cancelled { id, .. } => id.as_deref(),
            Error::Wait { id, .. } => Some(id),
            _ => None,
        }
    }

    /// The operation failed because a request or probe could not reach the backend.
    pub fn is_transport(&self) -> bool {
        match self {
            Error::Request { .. } => true,
            Error::Wait { source, .. } => source.transport().is_some(),
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled { .. } => true,
            Error::Wait { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    pub(crate) fn is_not_found_on(&self, op: OperationKind) -> bool {
        matches!(self, Error::Request { operation, source, .. } if *operation == op && source.is_not_found())
    }
}
