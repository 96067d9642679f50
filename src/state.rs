//! Circuit breaker state machine.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// The possible states of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Calls are permitted and their outcomes feed the sliding window.
    Closed = 0,

    /// Calls are rejected until the open-state wait elapses.
    Open = 1,

    /// A single trial call is in flight to test recovery.
    HalfOpen = 2,
}

impl State {
    /// Stable lowercase label, used for log fields and metric tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::Open => "open",
            State::HalfOpen => "half-open",
        }
    }
}

impl From<u8> for State {
    fn from(value: u8) -> Self {
        match value {
            1 => State::Open,
            2 => State::HalfOpen,
            _ => State::Closed,
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic state holder with compare-and-swap transitions.
///
/// The transition timestamp doubles as the opened-at instant while the
/// breaker is `Open`: the open-state wait is measured from the moment of
/// the last transition.
pub(crate) struct StateCell {
    state: AtomicU8,
    last_transition: parking_lot::Mutex<Instant>,
}

impl StateCell {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(State::Closed as u8),
            last_transition: parking_lot::Mutex::new(Instant::now()),
        }
    }

    pub fn current(&self) -> State {
        State::from(self.state.load(Ordering::Acquire))
    }

    /// Time elapsed since the last successful transition.
    pub fn time_in_state(&self) -> Duration {
        self.last_transition.lock().elapsed()
    }

    /// CAS from `from` to `to`. Exactly one concurrent caller can win a
    /// given transition; the winner also stamps the transition instant.
    pub fn transition(&self, from: State, to: State) -> bool {
        let swapped = self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if swapped {
            *self.last_transition.lock() = Instant::now();
        }

        swapped
    }

    /// Trip to `Open` from whatever non-open state the breaker is in.
    pub fn trip_open(&self) -> bool {
        let current = self.current();
        if current == State::Open {
            return false;
        }

        self.transition(current, State::Open)
    }

    /// Claim the single recovery trial. Only one of the callers racing on
    /// an expired open state wins this CAS.
    pub fn claim_trial(&self) -> bool {
        self.transition(State::Open, State::HalfOpen)
    }
}
