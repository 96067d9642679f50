//! Bounded-concurrency admission gate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

use crate::config::BulkheadConfig;
use crate::metrics::{MetricSink, NullMetricSink, RejectionKind};

struct BulkheadInner {
    name: Arc<str>,
    semaphore: Arc<Semaphore>,
    config: BulkheadConfig,
    acquired_total: AtomicU64,
    rejected_total: AtomicU64,
    metric_sink: Arc<dyn MetricSink>,
}

/// Caps the number of concurrent in-flight calls to a resource.
///
/// Waiters are queued FIFO: the longest-waiting caller is granted first
/// when a permit frees up. A wait is bounded by the configured
/// [`max_wait`](BulkheadConfig::max_wait) (or a per-call override) and is
/// cancellable; a timed-out caller never runs the guarded operation.
///
/// Cloning is cheap and all clones share the same permit pool.
pub struct Bulkhead {
    inner: Arc<BulkheadInner>,
}

impl Bulkhead {
    /// Creates a named bulkhead.
    pub fn new(name: impl Into<Arc<str>>, config: BulkheadConfig) -> Self {
        Self::with_metric_sink(name, config, Arc::new(NullMetricSink))
    }

    /// Creates a named bulkhead that reports events to `metric_sink`.
    pub fn with_metric_sink(
        name: impl Into<Arc<str>>,
        config: BulkheadConfig,
        metric_sink: Arc<dyn MetricSink>,
    ) -> Self {
        let inner = BulkheadInner {
            name: name.into(),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_calls())),
            config,
            acquired_total: AtomicU64::new(0),
            rejected_total: AtomicU64::new(0),
            metric_sink,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// This bulkhead's name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The configured concurrency limit.
    pub fn max_concurrent_calls(&self) -> usize {
        self.inner.config.max_concurrent_calls()
    }

    /// Permits not currently held by in-flight calls.
    pub fn available_permits(&self) -> usize {
        self.inner.semaphore.available_permits()
    }

    /// Total permits handed out since construction.
    pub fn acquired_total(&self) -> u64 {
        self.inner.acquired_total.load(Ordering::Relaxed)
    }

    /// Total acquisition attempts that timed out.
    pub fn rejected_total(&self) -> u64 {
        self.inner.rejected_total.load(Ordering::Relaxed)
    }

    /// Acquires a permit, waiting up to the configured `max_wait`.
    ///
    /// Returns `None` if the wait elapsed without a permit; the guarded
    /// operation must not be invoked in that case.
    pub async fn acquire(&self) -> Option<BulkheadPermit> {
        self.acquire_timeout(self.inner.config.max_wait()).await
    }

    /// Acquires a permit with a caller-supplied wait budget, overriding
    /// the configured one for this call only.
    pub async fn acquire_timeout(&self, wait: Duration) -> Option<BulkheadPermit> {
        let started = Instant::now();
        let semaphore = Arc::clone(&self.inner.semaphore);

        let permit = if wait.is_zero() {
            semaphore.try_acquire_owned().ok()
        } else {
            match tokio::time::timeout(wait, semaphore.acquire_owned()).await {
                Ok(acquired) => acquired.ok(),
                Err(_elapsed) => None,
            }
        };

        self.resolve(permit, started.elapsed())
    }

    /// Acquires a permit only if one is free right now.
    pub fn try_acquire(&self) -> Option<BulkheadPermit> {
        let permit = Arc::clone(&self.inner.semaphore).try_acquire_owned().ok();
        self.resolve(permit, Duration::ZERO)
    }

    fn resolve(
        &self,
        permit: Option<OwnedSemaphorePermit>,
        waited: Duration,
    ) -> Option<BulkheadPermit> {
        match permit {
            Some(permit) => {
                self.inner.acquired_total.fetch_add(1, Ordering::Relaxed);
                self.inner
                    .metric_sink
                    .record_permit_wait(&self.inner.name, waited, true);
                Some(BulkheadPermit { _permit: permit })
            }
            None => {
                self.inner.rejected_total.fetch_add(1, Ordering::Relaxed);
                self.inner
                    .metric_sink
                    .record_permit_wait(&self.inner.name, waited, false);
                self.inner
                    .metric_sink
                    .record_rejection(&self.inner.name, RejectionKind::Bulkhead);
                tracing::debug!(
                    bulkhead = %self.inner.name,
                    waited_ms = waited.as_millis() as u64,
                    "permit wait elapsed, call rejected"
                );
                None
            }
        }
    }
}

impl Clone for Bulkhead {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Bulkhead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bulkhead")
            .field("name", &self.inner.name)
            .field("max_concurrent_calls", &self.max_concurrent_calls())
            .field("available_permits", &self.available_permits())
            .finish()
    }
}

/// A held admission permit.
///
/// Dropping the permit releases it exactly once, on every exit path of
/// the guarded block: normal return, error, panic unwind, or task
/// cancellation.
#[must_use = "dropping the permit immediately releases it"]
pub struct BulkheadPermit {
    _permit: OwnedSemaphorePermit,
}

impl std::fmt::Debug for BulkheadPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkheadPermit").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulkhead(limit: usize, wait: Duration) -> Bulkhead {
        let config = BulkheadConfig::builder()
            .max_concurrent_calls(limit)
            .max_wait(wait)
            .build()
            .unwrap();
        Bulkhead::new("test", config)
    }

    #[test]
    fn try_acquire_up_to_the_limit() {
        let gate = bulkhead(2, Duration::ZERO);

        let first = gate.try_acquire();
        let second = gate.try_acquire();
        assert!(first.is_some());
        assert!(second.is_some());
        assert_eq!(gate.available_permits(), 0);

        assert!(gate.try_acquire().is_none());
        assert_eq!(gate.rejected_total(), 1);

        drop(first);
        assert_eq!(gate.available_permits(), 1);
        assert!(gate.try_acquire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_wait_fails_fast() {
        let gate = bulkhead(1, Duration::ZERO);
        let held = gate.acquire().await;
        assert!(held.is_some());

        // No wait budget: the second acquire resolves immediately.
        assert!(gate.acquire().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_is_granted_a_freed_permit() {
        let gate = bulkhead(1, Duration::from_millis(500));
        let held = gate.acquire().await.unwrap();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.acquire().await.is_some() })
        };

        // Free the permit before the waiter's budget runs out.
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(held);

        assert!(waiter.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_times_out_when_nothing_frees() {
        let gate = bulkhead(1, Duration::from_millis(200));
        let _held = gate.acquire().await.unwrap();

        assert!(gate.acquire().await.is_none());
        assert_eq!(gate.rejected_total(), 1);
        assert_eq!(gate.acquired_total(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn caller_supplied_timeout_overrides_config() {
        let gate = bulkhead(1, Duration::ZERO);
        let held = gate.acquire().await.unwrap();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move {
                gate.acquire_timeout(Duration::from_millis(300))
                    .await
                    .is_some()
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(held);

        assert!(waiter.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_are_granted_in_fifo_order() {
        let gate = bulkhead(1, Duration::from_secs(10));
        let held = gate.acquire().await.unwrap();

        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for id in 0..3 {
            let gate = gate.clone();
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let permit = gate.acquire().await.unwrap();
                order.lock().push(id);
                drop(permit);
            }));
            // Let this waiter enqueue before spawning the next.
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        drop(held);
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }
}
