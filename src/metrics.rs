//! Pluggable metric sink for gate events.

use std::time::Duration;

use crate::state::State;

/// Which gate shed a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// The bulkhead had no free permit within the wait window.
    Bulkhead,
    /// The circuit breaker was open (or mid-trial).
    CircuitOpen,
}

impl RejectionKind {
    /// Stable label for metric tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionKind::Bulkhead => "bulkhead",
            RejectionKind::CircuitOpen => "circuit-open",
        }
    }
}

/// Receives gate events for export to a metrics system.
///
/// The crate ships no exporter; implement this trait to bridge into
/// whatever backend the application uses. All methods are called on the
/// hot path and must not block.
pub trait MetricSink: Send + Sync + 'static {
    /// A breaker moved between states.
    fn record_state_transition(&self, gate: &str, from: State, to: State);

    /// A guarded operation completed.
    fn record_call(&self, gate: &str, success: bool);

    /// A call was shed without invoking the operation.
    fn record_rejection(&self, gate: &str, kind: RejectionKind);

    /// A bulkhead permit request resolved after `waited`.
    fn record_permit_wait(&self, gate: &str, waited: Duration, granted: bool);
}

/// Discards all events. The default sink when none is configured.
pub struct NullMetricSink;

impl MetricSink for NullMetricSink {
    fn record_state_transition(&self, _gate: &str, _from: State, _to: State) {}
    fn record_call(&self, _gate: &str, _success: bool) {}
    fn record_rejection(&self, _gate: &str, _kind: RejectionKind) {}
    fn record_permit_wait(&self, _gate: &str, _waited: Duration, _granted: bool) {}
}
