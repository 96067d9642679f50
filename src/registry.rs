//! Named, lazily-created gate instances.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::breaker::CircuitBreaker;
use crate::bulkhead::Bulkhead;
use crate::config::{BreakerConfig, BulkheadConfig};
use crate::hook::HookRegistry;
use crate::metrics::{MetricSink, NullMetricSink};

type GateMap<V> = HashMap<String, V, ahash::RandomState>;

/// Hands out one gate instance per logical name.
///
/// The registry is an ordinary value: own it at the composition root and
/// pass it (or gates cloned out of it) to whatever needs one. There is no
/// process-wide instance. Entries are created on first lookup with the
/// registry defaults and reused thereafter; there is no removal.
pub struct GateRegistry {
    bulkheads: RwLock<GateMap<Bulkhead>>,
    breakers: RwLock<GateMap<CircuitBreaker>>,
    bulkhead_defaults: BulkheadConfig,
    breaker_defaults: BreakerConfig,
    metric_sink: Arc<dyn MetricSink>,
}

impl GateRegistry {
    /// Creates a registry with the given per-gate default configurations.
    pub fn new(bulkhead_defaults: BulkheadConfig, breaker_defaults: BreakerConfig) -> Self {
        Self {
            bulkheads: RwLock::new(GateMap::default()),
            breakers: RwLock::new(GateMap::default()),
            bulkhead_defaults,
            breaker_defaults,
            metric_sink: Arc::new(NullMetricSink),
        }
    }

    /// Routes events of every gate this registry creates to `sink`.
    ///
    /// Applies only to gates created after the call; in practice, set the
    /// sink before handing the registry out.
    pub fn with_metric_sink(mut self, sink: impl MetricSink) -> Self {
        self.metric_sink = Arc::new(sink);
        self
    }

    /// The bulkhead registered under `name`, created with the registry
    /// defaults on first access.
    pub fn bulkhead(&self, name: &str) -> Bulkhead {
        self.bulkhead_with(name, self.bulkhead_defaults.clone())
    }

    /// Like [`bulkhead`](Self::bulkhead), but `config` is used if this
    /// lookup is the one that creates the instance. An existing instance
    /// keeps its original configuration.
    pub fn bulkhead_with(&self, name: &str, config: BulkheadConfig) -> Bulkhead {
        if let Some(gate) = self.bulkheads.read().get(name) {
            return gate.clone();
        }

        // Re-check under the write lock: a racing creator may have won.
        let mut gates = self.bulkheads.write();
        gates
            .entry(name.to_owned())
            .or_insert_with(|| {
                Bulkhead::with_metric_sink(name, config, Arc::clone(&self.metric_sink))
            })
            .clone()
    }

    /// The circuit breaker registered under `name`, created with the
    /// registry defaults on first access.
    pub fn breaker(&self, name: &str) -> CircuitBreaker {
        self.breaker_with(name, self.breaker_defaults.clone())
    }

    /// Like [`breaker`](Self::breaker), but `config` is used if this
    /// lookup is the one that creates the instance. An existing instance
    /// keeps its original configuration.
    pub fn breaker_with(&self, name: &str, config: BreakerConfig) -> CircuitBreaker {
        if let Some(gate) = self.breakers.read().get(name) {
            return gate.clone();
        }

        let mut gates = self.breakers.write();
        gates
            .entry(name.to_owned())
            .or_insert_with(|| {
                CircuitBreaker::with_instruments(
                    name,
                    config,
                    Arc::clone(&self.metric_sink),
                    Arc::new(HookRegistry::new()),
                )
            })
            .clone()
    }

    /// Number of bulkheads created so far.
    pub fn bulkhead_count(&self) -> usize {
        self.bulkheads.read().len()
    }

    /// Number of breakers created so far.
    pub fn breaker_count(&self) -> usize {
        self.breakers.read().len()
    }
}

impl Default for GateRegistry {
    fn default() -> Self {
        Self::new(BulkheadConfig::default(), BreakerConfig::default())
    }
}

impl std::fmt::Debug for GateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateRegistry")
            .field("bulkheads", &self.bulkhead_count())
            .field("breakers", &self.breaker_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn same_name_yields_the_same_instance() {
        let registry = GateRegistry::default();

        let first = registry.bulkhead("payments");
        let second = registry.bulkhead("payments");

        // Holding a permit through one handle is visible through the other.
        let held = first.try_acquire().unwrap();
        assert_eq!(
            second.available_permits(),
            second.max_concurrent_calls() - 1
        );
        drop(held);
        assert_eq!(registry.bulkhead_count(), 1);
    }

    #[test]
    fn different_names_are_independent() {
        let registry = GateRegistry::default();

        let payments = registry.breaker("payments");
        let inventory = registry.breaker("inventory");

        assert!(payments.force_open());
        assert_eq!(inventory.state(), crate::State::Closed);
        assert_eq!(registry.breaker_count(), 2);
    }

    #[test]
    fn first_lookup_config_sticks() {
        let registry = GateRegistry::default();

        let config = BulkheadConfig::builder()
            .max_concurrent_calls(3)
            .build()
            .unwrap();
        let gate = registry.bulkhead_with("payments", config);
        assert_eq!(gate.max_concurrent_calls(), 3);

        // A later lookup with a different config gets the existing instance.
        let other_config = BulkheadConfig::builder()
            .max_concurrent_calls(99)
            .max_wait(Duration::from_secs(1))
            .build()
            .unwrap();
        let same = registry.bulkhead_with("payments", other_config);
        assert_eq!(same.max_concurrent_calls(), 3);
    }

    #[test]
    fn concurrent_first_access_creates_one_instance() {
        let registry = Arc::new(GateRegistry::default());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || registry.breaker("payments")));
        }
        let gates: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // Forcing open through any handle must be visible through all.
        assert!(gates[0].force_open());
        for gate in &gates {
            assert_eq!(gate.state(), crate::State::Open);
        }
        assert_eq!(registry.breaker_count(), 1);
    }
}
