//! State-convergence waits for resources whose backend provisions asynchronously.
//!
//! A [`ConvergenceWaiter`] repeatedly runs a [`ResourceProbe`] and classifies
//! each observed label against a [`WaitSpec`] until the resource reaches a
//! target state, reports something unexpected, the deadline passes, or the
//! caller cancels. The waiter knows nothing about the resources it polls.

/// Wait failures and invalid wait configurations
pub mod error;

/// Probe capability and observations
pub mod probe;

/// Wait configuration and state classification
pub mod spec;

/// The polling engine
pub mod waiter;

pub use error::{SpecError, WaitError};
pub use probe::{Observation, ResourceProbe};
pub use spec::{Classification, WaitSpec};
pub use waiter::{Convergence, ConvergenceWaiter};

pub use tokio_util::sync::CancellationToken;
