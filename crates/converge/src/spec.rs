use std::{collections::BTreeSet, time::Duration};

use crate::SpecError;

/// First backoff step; doubled after every pending poll.
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Default ceiling on the spacing between two polls.
pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// How a single observed state label relates to a [`WaitSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Pending,
    Target,
    Unexpected,
}

/// Configuration for one convergence wait.
///
/// `pending` and `target` are disjoint by construction. Any label outside both
/// sets is unexpected and ends the wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitSpec {
    pending: BTreeSet<String>,
    target: BTreeSet<String>,
    timeout: Duration,
    delay: Duration,
    min_poll_interval: Duration,
    max_poll_interval: Duration,
}

impl WaitSpec {
    pub fn new<P, T>(pending: P, target: T, timeout: Duration) -> Result<Self, SpecError>
    where
        P: IntoIterator,
        P::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        let pending: BTreeSet<String> = pending.into_iter().map(Into::into).collect();
        let target: BTreeSet<String> = target.into_iter().map(Into::into).collect();

        if target.is_empty() {
            return Err(SpecError::EmptyTarget);
        }

        let overlap: Vec<String> = pending.intersection(&target).cloned().collect();
        if !overlap.is_empty() {
            return Err(SpecError::Overlap { labels: overlap });
        }

        if timeout.is_zero() {
            return Err(SpecError::ZeroTimeout);
        }

        Ok(Self {
            pending,
            target,
            timeout,
            delay: Duration::ZERO,
            min_poll_interval: Duration::ZERO,
            max_poll_interval: DEFAULT_MAX_POLL_INTERVAL,
        })
    }

    /// Settling delay before the first probe.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Floor on the spacing between two polls.
    pub fn with_min_poll_interval(mut self, interval: Duration) -> Self {
        self.min_poll_interval = interval;
        self
    }

    /// Ceiling on exponential backoff growth. The floor still wins if it is larger.
    pub fn with_max_poll_interval(mut self, interval: Duration) -> Self {
        self.max_poll_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, SpecError> {
        if timeout.is_zero() {
            return Err(SpecError::ZeroTimeout);
        }
        self.timeout = timeout;
        Ok(self)
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    pub fn target(&self) -> impl Iterator<Item = &str> {
        self.target.iter().map(String::as_str)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn min_poll_interval(&self) -> Duration {
        self.min_poll_interval
    }

    pub fn max_poll_interval(&self) -> Duration {
        self.max_poll_interval
    }

    pub fn classify(&self, state: &str) -> Classification {
        if self.target.contains(state) {
            Classification::Target
        } else if self.pending.contains(state) {
            Classification::Pending
        } else {
            Classification::Unexpected
        }
    }

    /// All labels the wait knows how to interpret, target states first.
    pub fn expected(&self) -> Vec<String> {
        self.target.iter().chain(self.pending.iter()).cloned().collect()
    }

    pub(crate) fn backoff(&self) -> Backoff {
        Backoff {
            next: INITIAL_BACKOFF,
            min: self.min_poll_interval,
            max: self.max_poll_interval,
        }
    }
}

/// Exponential backoff with a floor, one step per pending poll.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    next: Duration,
    min: Duration,
    max: Duration,
}

impl Backoff {
    pub(crate) fn step(&mut self) -> Duration {
        let current = self.next.min(self.max);
        self.next = current.saturating_mul(2);
        current.max(self.min)
    }
}
