use std::future::Future;

/// The outcome of one successful, classified poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation<T> {
    /// State label reported by the backend, or a synthetic one such as `NOT_FOUND`.
    pub state: String,
    /// Fetched payload. `None` when the label stands for the resource's absence.
    pub payload: Option<T>,
}

impl<T> Observation<T> {
    pub fn new(state: impl Into<String>, payload: T) -> Self {
        Self {
            state: state.into(),
            payload: Some(payload),
        }
    }

    pub fn absent(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            payload: None,
        }
    }
}

/// Fetches the current observable state of one resource.
///
/// Probes must be side-effect free beyond the read they issue. A transport
/// failure is returned as `Err` and is never retried by the waiter.
pub trait ResourceProbe: Send + Sync {
    type Payload: Send;
    type Error: std::error::Error + Send + Sync + 'static;

    fn probe(&self) -> impl Future<Output = Result<Observation<Self::Payload>, Self::Error>> + Send;
}

/// Probe backed by a closure returning a future.
pub struct FnProbe<F> {
    f: F,
}

/// Build a [`ResourceProbe`] from a closure, in the spirit of [`std::iter::from_fn`].
pub fn from_fn<F, Fut, T, E>(f: F) -> FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Observation<T>, E>> + Send,
    T: Send,
    E: std::error::Error + Send + Sync + 'static,
{
    FnProbe { f }
}

impl<F, Fut, T, E> ResourceProbe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Observation<T>, E>> + Send,
    T: Send,
    E: std::error::Error + Send + Sync + 'static,
{
    type Payload = T;
    type Error = E;

    fn probe(&self) -> impl Future<Output = Result<Observation<T>, E>> + Send {
        (self.f)()
    }
}
