//! Composition of both gates around a guarded operation.

use std::future::Future;
use std::sync::Arc;

use tracing::Instrument;

use crate::breaker::CircuitBreaker;
use crate::bulkhead::Bulkhead;
use crate::error::{GateError, GateResult};

/// Opaque caller-supplied token tracing one logical request through gate
/// decisions and outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    /// The token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of one submission, always paired with the correlation id that
/// accompanied it.
#[derive(Debug)]
pub struct Submission<T, E> {
    /// The caller-supplied correlation identifier.
    pub correlation: CorrelationId,
    /// The call's determinate outcome.
    pub result: GateResult<T, E>,
}

impl<T, E> Submission<T, E> {
    /// True when the operation ran and produced a value.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// True when a gate shed the call without running the operation.
    pub fn is_rejection(&self) -> bool {
        matches!(&self.result, Err(err) if err.is_rejection())
    }
}

/// Runs an operation behind a bulkhead and a circuit breaker, in that
/// fixed order.
///
/// Admission control sheds excess load before the in-memory circuit
/// check, and a call that never obtained a permit never reaches the
/// breaker's sliding window.
///
/// Cloning shares the underlying gate instances.
#[derive(Clone, Debug)]
pub struct Pipeline {
    bulkhead: Bulkhead,
    breaker: CircuitBreaker,
}

impl Pipeline {
    /// Composes the two gates.
    pub fn new(bulkhead: Bulkhead, breaker: CircuitBreaker) -> Self {
        Self { bulkhead, breaker }
    }

    /// The admission gate.
    pub fn bulkhead(&self) -> &Bulkhead {
        &self.bulkhead
    }

    /// The circuit breaker.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Runs `op` behind both gates and reports its outcome back into the
    /// breaker.
    ///
    /// The returned [`Submission`] always carries `correlation` and one of
    /// the four determinate outcomes: the operation's value, its failure,
    /// or one of the two gate rejections. A rejected call never invokes
    /// `op`. The bulkhead permit is held for the whole operation and
    /// released on every exit path.
    pub async fn submit<F, Fut, T, E>(
        &self,
        correlation: impl Into<CorrelationId>,
        op: F,
    ) -> Submission<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        let correlation = correlation.into();
        let span = tracing::debug_span!(
            "gate_submit",
            correlation = %correlation,
            bulkhead = %self.bulkhead.name(),
            breaker = %self.breaker.name(),
        );

        let result = self.run_gated(&correlation, op).instrument(span).await;
        Submission {
            correlation,
            result,
        }
    }

    async fn run_gated<F, Fut, T, E>(&self, correlation: &CorrelationId, op: F) -> GateResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        let Some(permit) = self.bulkhead.acquire().await else {
            tracing::debug!(correlation = %correlation, "shed by bulkhead");
            return Err(GateError::BulkheadRejected);
        };

        if !self.breaker.try_acquire() {
            tracing::debug!(correlation = %correlation, "shed by circuit breaker");
            return Err(GateError::CircuitOpen);
        }

        // The permit guards the operation itself; it is released by RAII
        // whichever way the future resolves, including cancellation.
        let outcome = op().await;
        drop(permit);

        match outcome {
            Ok(value) => {
                self.breaker.record_success();
                Ok(value)
            }
            Err(err) => {
                self.breaker.record_failure();
                tracing::debug!(correlation = %correlation, error = %err, "operation failed");
                Err(GateError::Operation(err))
            }
        }
    }
}
