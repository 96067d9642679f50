//! # callguard-rs
//!
//! Composable admission-control and circuit-breaker gates for protecting
//! callers from unreliable, latency-bearing downstream operations.
//!
//! Two independent gates are composed around an arbitrary operation:
//!
//! - **[`Bulkhead`]**: bounds the number of concurrent in-flight calls.
//!   Excess callers wait FIFO up to a configurable budget, then are shed
//!   without ever invoking the operation.
//! - **[`CircuitBreaker`]**: tracks the failure rate of the last N
//!   completed calls in a sliding window and temporarily stops calling an
//!   operation judged to be failing. After a cooldown, a single trial
//!   call probes for recovery.
//!
//! A [`Pipeline`] runs both gates in a fixed order (bulkhead first, then
//! breaker), invokes the operation, and reports the outcome back into the
//! breaker. Every submission is paired with a caller-supplied
//! [`CorrelationId`] so gate decisions stay traceable per request. A
//! [`GateRegistry`] hands out named, independently configured gate
//! instances, and an [`Executor`] spawns gated calls onto a tokio worker
//! pool.
//!
//! ## Basic Usage
//!
//! ```rust
//! use callguard_rs::{
//!     BreakerConfig, Bulkhead, BulkheadConfig, CircuitBreaker, GateError, Pipeline,
//! };
//! use std::fmt;
//! use std::time::Duration;
//!
//! // The downstream failure type; anything implementing `Error` works.
//! #[derive(Debug)]
//! struct PaymentError(String);
//!
//! impl fmt::Display for PaymentError {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         write!(f, "payment error: {}", self.0)
//!     }
//! }
//!
//! impl std::error::Error for PaymentError {}
//!
//! # fn main() -> Result<(), callguard_rs::ConfigError> {
//! let bulkhead = Bulkhead::new(
//!     "payments",
//!     BulkheadConfig::builder()
//!         .max_concurrent_calls(5)
//!         .max_wait(Duration::from_millis(1000))
//!         .build()?,
//! );
//! let breaker = CircuitBreaker::new(
//!     "payments",
//!     BreakerConfig::builder()
//!         .failure_rate_threshold(20.0)
//!         .sliding_window_size(10)
//!         .wait_duration_in_open_state(Duration::from_secs(5))
//!         .build()?,
//! );
//! let pipeline = Pipeline::new(bulkhead, breaker);
//!
//! let runtime = tokio::runtime::Builder::new_current_thread()
//!     .enable_time()
//!     .build()
//!     .expect("runtime");
//! runtime.block_on(async {
//!     let submission = pipeline
//!         .submit("order-42", || async { Ok::<_, PaymentError>("charged") })
//!         .await;
//!
//!     match submission.result {
//!         Ok(receipt) => println!("[{}] {}", submission.correlation, receipt),
//!         Err(GateError::BulkheadRejected) => println!("service overloaded, try later"),
//!         Err(GateError::CircuitOpen) => println!("downstream suspected failing"),
//!         Err(GateError::Operation(err)) => println!("[{}] {}", submission.correlation, err),
//!     }
//! });
//! # Ok(())
//! # }
//! ```
//!
//! ## Named instances
//!
//! Services that guard several downstreams own a [`GateRegistry`] at
//! their composition root and pull gates out of it by name; every call
//! site asking for `"payments"` shares the same permit pool and breaker
//! state. Rejections and failures are surfaced as values
//! ([`GateError`]), never panics, and retry policy is left entirely to
//! the caller.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod breaker;
mod bulkhead;
mod config;
mod error;
mod executor;
mod hook;
mod metrics;
mod pipeline;
pub mod prelude;
mod registry;
mod state;
mod window;

// Re-exports
pub use breaker::CircuitBreaker;
pub use bulkhead::{Bulkhead, BulkheadPermit};
pub use config::{BreakerConfig, BreakerConfigBuilder, BulkheadConfig, BulkheadConfigBuilder};
pub use error::{ConfigError, GateError, GateResult};
pub use executor::Executor;
pub use hook::HookRegistry;
pub use metrics::{MetricSink, NullMetricSink, RejectionKind};
pub use pipeline::{CorrelationId, Pipeline, Submission};
pub use registry::GateRegistry;
pub use state::State;
