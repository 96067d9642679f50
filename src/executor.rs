//! Runs gated submissions on a worker pool.

use std::future::Future;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::pipeline::{CorrelationId, Pipeline, Submission};

/// Adapter that spawns gated calls onto a tokio runtime and hands back
/// the task handle through which the caller observes completion.
///
/// The executor holds only a [`Handle`], so it is cheap to clone and does
/// not keep the runtime alive.
#[derive(Clone, Debug)]
pub struct Executor {
    handle: Handle,
}

impl Executor {
    /// Wraps an explicit runtime handle.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime of the calling context, if there is one.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Spawns `op` behind `pipeline`'s gates.
    ///
    /// The returned [`JoinHandle`] resolves to the [`Submission`] carrying
    /// the correlation id and the call's determinate outcome. Dropping the
    /// handle detaches the task; the gates still record the outcome.
    pub fn submit<F, Fut, T, E>(
        &self,
        pipeline: &Pipeline,
        correlation: impl Into<CorrelationId>,
        op: F,
    ) -> JoinHandle<Submission<T, E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: std::error::Error + Send + 'static,
    {
        let pipeline = pipeline.clone();
        let correlation = correlation.into();
        self.handle
            .spawn(async move { pipeline.submit(correlation, op).await })
    }
}
