//! Failure-rate-driven circuit breaker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::BreakerConfig;
use crate::hook::HookRegistry;
use crate::metrics::{MetricSink, NullMetricSink, RejectionKind};
use crate::state::{State, StateCell};
use crate::window::SlidingWindow;

struct BreakerInner {
    name: Arc<str>,
    state: StateCell,
    window: Mutex<SlidingWindow>,
    config: BreakerConfig,
    success_total: AtomicU64,
    failure_total: AtomicU64,
    rejected_total: AtomicU64,
    metric_sink: Arc<dyn MetricSink>,
    hooks: Arc<HookRegistry>,
}

/// Stops calling a downstream operation whose recent failure rate crossed
/// the configured threshold.
///
/// State machine:
/// - `Closed`: calls are admitted; each completed call lands in the
///   sliding window. Once the window is full, a failure rate at or above
///   the threshold trips the breaker to `Open`.
/// - `Open`: calls are rejected without running the operation. After
///   [`wait_duration_in_open_state`](BreakerConfig::wait_duration_in_open_state)
///   a single caller is admitted as a recovery trial.
/// - `HalfOpen`: the trial is in flight; everyone else is rejected. A
///   successful trial closes the breaker, a failed one re-opens it and
///   restarts the open clock.
///
/// [`try_acquire`](CircuitBreaker::try_acquire) never blocks, and
/// rejections never touch the window.
///
/// Cloning is cheap and all clones share the same state.
pub struct CircuitBreaker {
    inner: Arc<BreakerInner>,
}

impl CircuitBreaker {
    /// Creates a named breaker.
    pub fn new(name: impl Into<Arc<str>>, config: BreakerConfig) -> Self {
        Self::with_instruments(
            name,
            config,
            Arc::new(NullMetricSink),
            Arc::new(HookRegistry::new()),
        )
    }

    /// Creates a named breaker reporting to `metric_sink` and firing
    /// `hooks` on events.
    pub fn with_instruments(
        name: impl Into<Arc<str>>,
        config: BreakerConfig,
        metric_sink: Arc<dyn MetricSink>,
        hooks: Arc<HookRegistry>,
    ) -> Self {
        let inner = BreakerInner {
            name: name.into(),
            state: StateCell::new(),
            window: Mutex::new(SlidingWindow::new(config.sliding_window_size())),
            config,
            success_total: AtomicU64::new(0),
            failure_total: AtomicU64::new(0),
            rejected_total: AtomicU64::new(0),
            metric_sink,
            hooks,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// This breaker's name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The current state.
    pub fn state(&self) -> State {
        self.inner.state.current()
    }

    /// Failure rate in percent over the sliding window, or `None` while
    /// the window has fewer samples than its configured size.
    pub fn failure_rate(&self) -> Option<f64> {
        self.inner.window.lock().failure_rate()
    }

    /// Completed calls currently held in the window.
    pub fn window_samples(&self) -> usize {
        self.inner.window.lock().samples()
    }

    /// Total successes recorded.
    pub fn success_total(&self) -> u64 {
        self.inner.success_total.load(Ordering::Relaxed)
    }

    /// Total failures recorded.
    pub fn failure_total(&self) -> u64 {
        self.inner.failure_total.load(Ordering::Relaxed)
    }

    /// Total calls shed while open or mid-trial.
    pub fn rejected_total(&self) -> u64 {
        self.inner.rejected_total.load(Ordering::Relaxed)
    }

    /// Asks whether a call may proceed. Never blocks.
    ///
    /// While `Open`, the first caller after the open wait elapses wins the
    /// recovery trial; concurrent callers at that instant still see a
    /// rejection.
    pub fn try_acquire(&self) -> bool {
        match self.inner.state.current() {
            State::Closed => true,
            State::Open => {
                let wait = self.inner.config.wait_duration_in_open_state();
                if self.inner.state.time_in_state() >= wait && self.inner.state.claim_trial() {
                    self.on_transition(State::Open, State::HalfOpen);
                    true
                } else {
                    self.reject();
                    false
                }
            }
            // The trial call is outstanding; at most one in flight.
            State::HalfOpen => {
                self.reject();
                false
            }
        }
    }

    /// Records a successful completion of the guarded operation.
    pub fn record_success(&self) {
        self.inner.success_total.fetch_add(1, Ordering::Relaxed);
        self.inner.metric_sink.record_call(&self.inner.name, true);
        self.inner.hooks.notify_success();

        match self.inner.state.current() {
            State::HalfOpen => {
                if self.inner.state.transition(State::HalfOpen, State::Closed) {
                    self.inner.window.lock().reset();
                    self.on_transition(State::HalfOpen, State::Closed);
                }
            }
            State::Closed => self.record_outcome_closed(false),
            // Late completion after a forced transition; counted only.
            State::Open => {}
        }
    }

    /// Records a failed completion of the guarded operation.
    pub fn record_failure(&self) {
        self.inner.failure_total.fetch_add(1, Ordering::Relaxed);
        self.inner.metric_sink.record_call(&self.inner.name, false);
        self.inner.hooks.notify_failure();

        match self.inner.state.current() {
            State::HalfOpen => {
                // Failed trial: back to open with a fresh open clock.
                if self.inner.state.transition(State::HalfOpen, State::Open) {
                    self.inner.window.lock().reset();
                    self.on_transition(State::HalfOpen, State::Open);
                }
            }
            State::Closed => self.record_outcome_closed(true),
            State::Open => {}
        }
    }

    /// Forces the breaker open regardless of the window. Returns `false`
    /// if it was already open.
    pub fn force_open(&self) -> bool {
        let from = self.inner.state.current();
        if !self.inner.state.trip_open() {
            return false;
        }

        self.inner.window.lock().reset();
        self.on_transition(from, State::Open);
        true
    }

    /// Forces the breaker closed regardless of the open wait. Returns
    /// `false` if it was already closed.
    pub fn force_closed(&self) -> bool {
        let from = self.inner.state.current();
        if from == State::Closed || !self.inner.state.transition(from, State::Closed) {
            return false;
        }

        self.inner.window.lock().reset();
        self.on_transition(from, State::Closed);
        true
    }

    /// Appends a closed-state outcome and trips the breaker when the full
    /// window's failure rate reaches the threshold.
    fn record_outcome_closed(&self, failure: bool) {
        let mut window = self.inner.window.lock();
        window.record(failure);

        let tripped_rate = match window.failure_rate() {
            Some(rate) if rate >= self.inner.config.failure_rate_threshold() => rate,
            _ => return,
        };

        if self.inner.state.transition(State::Closed, State::Open) {
            window.reset();
            drop(window);
            tracing::warn!(
                breaker = %self.inner.name,
                failure_rate = tripped_rate,
                threshold = self.inner.config.failure_rate_threshold(),
                "failure rate crossed threshold"
            );
            self.on_transition(State::Closed, State::Open);
        }
    }

    fn reject(&self) {
        self.inner.rejected_total.fetch_add(1, Ordering::Relaxed);
        self.inner
            .metric_sink
            .record_rejection(&self.inner.name, RejectionKind::CircuitOpen);
        self.inner.hooks.notify_rejection();
        tracing::debug!(breaker = %self.inner.name, "call rejected, circuit open");
    }

    // Hooks run after the transition is committed and outside the window
    // lock.
    fn on_transition(&self, from: State, to: State) {
        self.inner
            .metric_sink
            .record_state_transition(&self.inner.name, from, to);
        self.inner.hooks.notify_transition(to);
        tracing::debug!(
            breaker = %self.inner.name,
            from = %from,
            to = %to,
            "state transition"
        );
    }
}

impl Clone for CircuitBreaker {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .field("window_samples", &self.window_samples())
            .finish()
    }
}
