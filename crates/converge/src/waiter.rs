use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{Level, instrument};

use crate::{Classification, Observation, ResourceProbe, WaitError, WaitSpec};

/// Stand-in deadline for durations too large to add to an [`Instant`].
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// A wait that reached one of its target states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convergence<T> {
    pub observation: Observation<T>,
    pub probes: usize,
    pub elapsed: Duration,
}

/// Polls a [`ResourceProbe`] until it reports a target state.
///
/// The waiter holds no state between calls apart from the cancellation token
/// shared with its caller, so one instance can drive any number of waits.
#[derive(Debug, Clone, Default)]
pub struct ConvergenceWaiter {
    cancel: CancellationToken,
}

impl ConvergenceWaiter {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Block until `probe` reports a state in `spec`'s target set.
    ///
    /// Transport errors and unexpected states stop the wait immediately. The
    /// deadline covers the settling delay, the sleeps and the probes themselves.
    #[instrument(level = Level::DEBUG, skip(self, probe, spec), fields(timeout = ?spec.timeout()))]
    pub async fn wait<P>(
        &self,
        resource: &str,
        probe: &P,
        spec: &WaitSpec,
    ) -> Result<Convergence<P::Payload>, WaitError<P::Error>>
    where
        P: ResourceProbe,
    {
        let start = Instant::now();
        let deadline = start
            .checked_add(spec.timeout())
            .unwrap_or_else(|| start + FAR_FUTURE);
        let mut backoff = spec.backoff();
        let mut probes = 0;
        let mut last_state: Option<String> = None;

        let cancelled = |last_state: &Option<String>, probes: usize| WaitError::Cancelled {
            resource: resource.to_string(),
            last_state: last_state.clone(),
            probes,
            elapsed: start.elapsed(),
        };
        let timed_out = |last_state: &Option<String>, probes: usize| WaitError::Timeout {
            resource: resource.to_string(),
            last_state: last_state.clone(),
            timeout: spec.timeout(),
            probes,
            elapsed: start.elapsed(),
        };

        if !spec.delay().is_zero() {
            tracing::debug!(delay = ?spec.delay(), "Waiting before first probe");
            if !self.pause(spec.delay(), deadline).await {
                return Err(cancelled(&last_state, probes));
            }
        }

        loop {
            if self.cancel.is_cancelled() {
                return Err(cancelled(&last_state, probes));
            }
            if Instant::now() >= deadline {
                tracing::warn!(last_state = ?last_state, probes, "Wait timed out");
                return Err(timed_out(&last_state, probes));
            }

            probes += 1;
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(cancelled(&last_state, probes)),
                _ = sleep_until(deadline) => return Err(timed_out(&last_state, probes)),
                outcome = probe.probe() => outcome,
            };

            let observation = match outcome {
                Ok(observation) => observation,
                Err(source) => {
                    tracing::warn!(error = %source, probes, "Probe failed");
                    return Err(WaitError::Transport {
                        resource: resource.to_string(),
                        last_state,
                        probes,
                        elapsed: start.elapsed(),
                        source,
                    });
                }
            };

            match spec.classify(&observation.state) {
                Classification::Target => {
                    tracing::debug!(state = %observation.state, probes, "Reached target state");
                    return Ok(Convergence {
                        observation,
                        probes,
                        elapsed: start.elapsed(),
                    });
                }
                Classification::Unexpected => {
                    tracing::warn!(state = %observation.state, probes, "Unexpected state");
                    return Err(WaitError::UnexpectedState {
                        resource: resource.to_string(),
                        state: observation.state,
                        expected: spec.expected(),
                        probes,
                        elapsed: start.elapsed(),
                    });
                }
                Classification::Pending => {
                    let interval = backoff.step();
                    tracing::debug!(state = %observation.state, next_poll = ?interval, "Still pending");
                    last_state = Some(observation.state);
                    if !self.pause(interval, deadline).await {
                        return Err(cancelled(&last_state, probes));
                    }
                }
            }
        }
    }

    /// Sleep for `duration` but never past `deadline`. Returns `false` if cancelled.
    async fn pause(&self, duration: Duration, deadline: Instant) -> bool {
        let wake = Instant::now()
            .checked_add(duration)
            .map_or(deadline, |wake| wake.min(deadline));
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = sleep_until(wake) => true,
        }
    }
}
