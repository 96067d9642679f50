//! Per-instance callbacks for circuit breaker events.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::state::State;

type HookFn = Arc<dyn Fn() + Send + Sync + 'static>;

#[derive(Default)]
struct Hooks {
    on_open: Option<HookFn>,
    on_close: Option<HookFn>,
    on_half_open: Option<HookFn>,
    on_success: Option<HookFn>,
    on_failure: Option<HookFn>,
    on_rejection: Option<HookFn>,
}

/// Registry of callbacks fired on breaker events.
///
/// Hooks run synchronously on the path that triggered them, after all
/// state changes are committed; keep them cheap.
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<Hooks>,
}

impl HookRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when the breaker trips open.
    pub fn set_on_open<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hooks.write().on_open = Some(Arc::new(f));
    }

    /// Called when the breaker resets to closed.
    pub fn set_on_close<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hooks.write().on_close = Some(Arc::new(f));
    }

    /// Called when the breaker admits a recovery trial.
    pub fn set_on_half_open<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hooks.write().on_half_open = Some(Arc::new(f));
    }

    /// Called on each recorded success.
    pub fn set_on_success<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hooks.write().on_success = Some(Arc::new(f));
    }

    /// Called on each recorded failure.
    pub fn set_on_failure<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hooks.write().on_failure = Some(Arc::new(f));
    }

    /// Called each time the breaker sheds a call.
    pub fn set_on_rejection<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hooks.write().on_rejection = Some(Arc::new(f));
    }

    fn run(hook: &Option<HookFn>) {
        if let Some(hook) = hook {
            hook();
        }
    }

    pub(crate) fn notify_transition(&self, to: State) {
        let hooks = self.hooks.read();
        match to {
            State::Open => Self::run(&hooks.on_open),
            State::Closed => Self::run(&hooks.on_close),
            State::HalfOpen => Self::run(&hooks.on_half_open),
        }
    }

    pub(crate) fn notify_success(&self) {
        Self::run(&self.hooks.read().on_success);
    }

    pub(crate) fn notify_failure(&self) {
        Self::run(&self.hooks.read().on_failure);
    }

    pub(crate) fn notify_rejection(&self) {
        Self::run(&self.hooks.read().on_rejection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn unset_hooks_are_no_ops() {
        let registry = HookRegistry::new();
        registry.notify_transition(State::Open);
        registry.notify_success();
        registry.notify_failure();
        registry.notify_rejection();
    }

    #[test]
    fn transition_dispatches_to_the_matching_hook() {
        let registry = HookRegistry::new();
        let opened = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&opened);
        registry.set_on_open(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        let counter = Arc::clone(&closed);
        registry.set_on_close(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        registry.notify_transition(State::Open);
        registry.notify_transition(State::Open);
        registry.notify_transition(State::Closed);

        assert_eq!(opened.load(Ordering::Relaxed), 2);
        assert_eq!(closed.load(Ordering::Relaxed), 1);
    }
}
