use std::time::Duration;

use converge::{SpecError, WaitSpec};

pub mod cluster;
pub mod node_pool;

pub use cluster::{ClusterCredentials, ClusterRepository};
pub use node_pool::NodePoolRepository;

/// Stable status of a provisioned cluster or node pool.
pub const READY: &str = "READY";
/// Status reported while a deletion is in progress.
pub const DELETING: &str = "DELETING";

/// Delay before the first poll after a create or update call.
const SETTLE_DELAY: Duration = Duration::from_secs(5);
/// Delay before the first poll after a delete call.
const DELETE_SETTLE_DELAY: Duration = Duration::from_secs(10);
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(3);

const fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}

fn wait_spec(
    pending: &[&str],
    target: &[&str],
    timeout: Duration,
    delay: Duration,
) -> Result<WaitSpec, SpecError> {
    Ok(WaitSpec::new(pending.iter().copied(), target.iter().copied(), timeout)?
        .with_delay(delay)
        .with_min_poll_interval(MIN_POLL_INTERVAL))
}
