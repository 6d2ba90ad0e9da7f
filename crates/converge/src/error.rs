use std::time::Duration;

use thiserror::Error;

/// A [`WaitSpec`](crate::WaitSpec) that cannot describe a meaningful wait.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("States are both pending and target: {}", .labels.join(", "))]
    Overlap { labels: Vec<String> },
    #[error("At least one target state is required")]
    EmptyTarget,
    #[error("Timeout must be greater than zero")]
    ZeroTimeout,
}

/// Why a convergence wait stopped without reaching a target state.
///
/// Every variant carries the resource identifier, the number of probes issued
/// and the time spent waiting so callers can report or retry the operation.
#[derive(Debug, Error)]
pub enum WaitError<E>
where
    E: std::error::Error + 'static,
{
    #[error("Probing {resource} failed after {probes} probe(s): {source}")]
    Transport {
        resource: String,
        last_state: Option<String>,
        probes: usize,
        elapsed: Duration,
        #[source]
        source: E,
    },
    #[error("{resource} reached unexpected state {state} (expected one of: {})", .expected.join(", "))]
    UnexpectedState {
        resource: String,
        state: String,
        expected: Vec<String>,
        probes: usize,
        elapsed: Duration,
    },
    #[error("Timed out after {timeout:?} waiting for {resource} (last state: {})", .last_state.as_deref().unwrap_or("none"))]
    Timeout {
        resource: String,
        last_state: Option<String>,
        timeout: Duration,
        probes: usize,
        elapsed: Duration,
    },
    #[error("Wait for {resource} cancelled after {elapsed:?} (last state: {})", .last_state.as_deref().unwrap_or("none"))]
    Cancelled {
        resource: String,
        last_state: Option<String>,
        probes: usize,
        elapsed: Duration,
    },
}

impl<E> WaitError<E>
where
    E: std::error::Error + 'static,
{
    pub fn resource(&self) -> &str {
        match self {
            WaitError::Transport { resource, .. }
            | WaitError::UnexpectedState { resource, .. }
            | WaitError::Timeout { resource, .. }
            | WaitError::Cancelled { resource, .. } => resource,
        }
    }

    /// Last label observed before the wait stopped, if any probe succeeded.
    pub fn last_state(&self) -> Option<&str> {
        match self {
            WaitError::UnexpectedState { state, .. } => Some(state),
            WaitError::Transport { last_state, .. }
            | WaitError::Timeout { last_state, .. }
            | WaitError::Cancelled { last_state, .. } => last_state.as_deref(),
        }
    }

    pub fn probes(&self) -> usize {
        match self {
            WaitError::Transport { probes, .. }
            | WaitError::UnexpectedState { probes, .. }
            | WaitError::Timeout { probes, .. }
            | WaitError::Cancelled { probes, .. } => *probes,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            WaitError::Transport { elapsed, .. }
            | WaitError::UnexpectedState { elapsed, .. }
            | WaitError::Timeout { elapsed, .. }
            | WaitError::Cancelled { elapsed, .. } => *elapsed,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WaitError::Cancelled { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }

    /// Borrow the transport error that ended the wait, if that is why it stopped.
    pub fn transport(&self) -> Option<&E> {
        match self {
            WaitError::Transport { source, .. } => Some(source),
            _ => None,
        }
    }
}
