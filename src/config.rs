//! Gate configuration with validated builders.

use std::time::Duration;

use crate::error::ConfigError;

/// Configuration for a [`Bulkhead`](crate::Bulkhead).
#[derive(Debug, Clone)]
pub struct BulkheadConfig {
    max_concurrent_calls: usize,
    max_wait: Duration,
}

impl BulkheadConfig {
    /// Starts a builder seeded with the defaults.
    pub fn builder() -> BulkheadConfigBuilder {
        BulkheadConfigBuilder::default()
    }

    /// Upper bound on concurrent in-flight calls.
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_concurrent_calls
    }

    /// How long an acquire may wait for a freed permit. Zero means fail
    /// fast.
    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }
}

impl Default for BulkheadConfig {
    /// 25 permits, no waiting.
    fn default() -> Self {
        Self {
            max_concurrent_calls: 25,
            max_wait: Duration::ZERO,
        }
    }
}

/// Builder for [`BulkheadConfig`].
#[derive(Debug, Clone)]
pub struct BulkheadConfigBuilder {
    max_concurrent_calls: usize,
    max_wait: Duration,
}

impl Default for BulkheadConfigBuilder {
    fn default() -> Self {
        let defaults = BulkheadConfig::default();
        Self {
            max_concurrent_calls: defaults.max_concurrent_calls,
            max_wait: defaults.max_wait,
        }
    }
}

impl BulkheadConfigBuilder {
    /// Sets the concurrency limit. Must be positive.
    pub fn max_concurrent_calls(mut self, limit: usize) -> Self {
        self.max_concurrent_calls = limit;
        self
    }

    /// Sets the permit wait budget. `Duration::ZERO` disables waiting.
    pub fn max_wait(mut self, wait: Duration) -> Self {
        self.max_wait = wait;
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> Result<BulkheadConfig, ConfigError> {
        if self.max_concurrent_calls == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        Ok(BulkheadConfig {
            max_concurrent_calls: self.max_concurrent_calls,
            max_wait: self.max_wait,
        })
    }
}

/// Configuration for a [`CircuitBreaker`](crate::CircuitBreaker).
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    failure_rate_threshold: f64,
    sliding_window_size: usize,
    wait_duration_in_open_state: Duration,
}

impl BreakerConfig {
    /// Starts a builder seeded with the defaults.
    pub fn builder() -> BreakerConfigBuilder {
        BreakerConfigBuilder::default()
    }

    /// Failure rate in percent at or above which the breaker opens.
    pub fn failure_rate_threshold(&self) -> f64 {
        self.failure_rate_threshold
    }

    /// Number of completed calls the sliding window holds.
    pub fn sliding_window_size(&self) -> usize {
        self.sliding_window_size
    }

    /// How long the breaker stays open before admitting a trial call.
    pub fn wait_duration_in_open_state(&self) -> Duration {
        self.wait_duration_in_open_state
    }
}

impl Default for BreakerConfig {
    /// 50% threshold over a 100-call window, 60s open wait.
    fn default() -> Self {
        Self {
            failure_rate_threshold: 50.0,
            sliding_window_size: 100,
            wait_duration_in_open_state: Duration::from_secs(60),
        }
    }
}

/// Builder for [`BreakerConfig`].
#[derive(Debug, Clone)]
pub struct BreakerConfigBuilder {
    failure_rate_threshold: f64,
    sliding_window_size: usize,
    wait_duration_in_open_state: Duration,
}

impl Default for BreakerConfigBuilder {
    fn default() -> Self {
        let defaults = BreakerConfig::default();
        Self {
            failure_rate_threshold: defaults.failure_rate_threshold,
            sliding_window_size: defaults.sliding_window_size,
            wait_duration_in_open_state: defaults.wait_duration_in_open_state,
        }
    }
}

impl BreakerConfigBuilder {
    /// Sets the opening threshold in percent. Must lie in `(0, 100]`.
    pub fn failure_rate_threshold(mut self, percent: f64) -> Self {
        self.failure_rate_threshold = percent;
        self
    }

    /// Sets the sliding window size. Must be positive.
    pub fn sliding_window_size(mut self, size: usize) -> Self {
        self.sliding_window_size = size;
        self
    }

    /// Sets the open-state wait. Must be positive.
    pub fn wait_duration_in_open_state(mut self, wait: Duration) -> Self {
        self.wait_duration_in_open_state = wait;
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> Result<BreakerConfig, ConfigError> {
        if !(self.failure_rate_threshold > 0.0 && self.failure_rate_threshold <= 100.0) {
            return Err(ConfigError::ThresholdOutOfRange(self.failure_rate_threshold));
        }
        if self.sliding_window_size == 0 {
            return Err(ConfigError::ZeroWindowSize);
        }
        if self.wait_duration_in_open_state.is_zero() {
            return Err(ConfigError::ZeroOpenWait);
        }

        Ok(BreakerConfig {
            failure_rate_threshold: self.failure_rate_threshold,
            sliding_window_size: self.sliding_window_size,
            wait_duration_in_open_state: self.wait_duration_in_open_state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulkhead_builder_applies_settings() {
        let config = BulkheadConfig::builder()
            .max_concurrent_calls(5)
            .max_wait(Duration::from_millis(1000))
            .build()
            .unwrap();

        assert_eq!(config.max_concurrent_calls(), 5);
        assert_eq!(config.max_wait(), Duration::from_millis(1000));
    }

    #[test]
    fn bulkhead_rejects_zero_concurrency() {
        let err = BulkheadConfig::builder()
            .max_concurrent_calls(0)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::ZeroConcurrency);
    }

    #[test]
    fn breaker_builder_applies_settings() {
        let config = BreakerConfig::builder()
            .failure_rate_threshold(20.0)
            .sliding_window_size(10)
            .wait_duration_in_open_state(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(config.failure_rate_threshold(), 20.0);
        assert_eq!(config.sliding_window_size(), 10);
        assert_eq!(config.wait_duration_in_open_state(), Duration::from_secs(5));
    }

    #[test]
    fn breaker_rejects_out_of_range_settings() {
        assert_eq!(
            BreakerConfig::builder()
                .failure_rate_threshold(0.0)
                .build()
                .unwrap_err(),
            ConfigError::ThresholdOutOfRange(0.0)
        );
        assert_eq!(
            BreakerConfig::builder()
                .failure_rate_threshold(100.5)
                .build()
                .unwrap_err(),
            ConfigError::ThresholdOutOfRange(100.5)
        );
        assert_eq!(
            BreakerConfig::builder()
                .sliding_window_size(0)
                .build()
                .unwrap_err(),
            ConfigError::ZeroWindowSize
        );
        assert_eq!(
            BreakerConfig::builder()
                .wait_duration_in_open_state(Duration::ZERO)
                .build()
                .unwrap_err(),
            ConfigError::ZeroOpenWait
        );
    }

    #[test]
    fn full_threshold_is_accepted() {
        assert!(BreakerConfig::builder()
            .failure_rate_threshold(100.0)
            .build()
            .is_ok());
    }
}
