//! Error types for gate rejections and configuration validation.

use thiserror::Error;

/// Result of a guarded call: the operation's value, or why it never ran /
/// why it failed.
pub type GateResult<T, E> = Result<T, GateError<E>>;

/// Why a guarded call did not produce a value.
///
/// The two rejection variants mean the operation was never invoked; they
/// are safe to retry later. `Operation` carries the downstream failure
/// verbatim.
#[derive(Debug, Error)]
pub enum GateError<E> {
    /// No bulkhead permit became available within the wait window.
    #[error("bulkhead rejected the call: no permit within the wait window")]
    BulkheadRejected,

    /// The circuit breaker is shedding calls to a suspected-failing
    /// operation.
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// The guarded operation itself failed.
    #[error("operation failed: {0}")]
    Operation(#[source] E),
}

impl<E> GateError<E> {
    /// True when the operation was never invoked (shed by a gate rather
    /// than failed downstream).
    pub fn is_rejection(&self) -> bool {
        matches!(self, GateError::BulkheadRejected | GateError::CircuitOpen)
    }

    /// The downstream failure, if the operation ran and failed.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            GateError::Operation(err) => Some(err),
            _ => None,
        }
    }
}

/// Rejected gate configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A bulkhead must admit at least one concurrent call.
    #[error("max_concurrent_calls must be greater than zero")]
    ZeroConcurrency,

    /// The failure-rate threshold must lie in `(0, 100]` percent.
    #[error("failure_rate_threshold must be within (0, 100], got {0}")]
    ThresholdOutOfRange(f64),

    /// The sliding window needs at least one slot.
    #[error("sliding_window_size must be greater than zero")]
    ZeroWindowSize,

    /// A zero open-state wait would re-admit calls immediately.
    #[error("wait_duration_in_open_state must be greater than zero")]
    ZeroOpenWait,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("downstream exploded")]
    struct Downstream;

    #[test]
    fn rejections_are_flagged() {
        assert!(GateError::<Downstream>::BulkheadRejected.is_rejection());
        assert!(GateError::<Downstream>::CircuitOpen.is_rejection());
        assert!(!GateError::Operation(Downstream).is_rejection());
    }

    #[test]
    fn operation_error_is_preserved() {
        let err = GateError::Operation(Downstream);
        assert_eq!(err.to_string(), "operation failed: downstream exploded");
        assert!(err.into_operation_error().is_some());
        assert!(GateError::<Downstream>::CircuitOpen
            .into_operation_error()
            .is_none());
    }
}
