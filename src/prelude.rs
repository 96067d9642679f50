//! Re-exports the types most call sites need.
//!
//! # Example
//! ```rust,no_run
//! use callguard_rs::prelude::*;
//! ```

pub use crate::{
    BreakerConfig, Bulkhead, BulkheadConfig, CircuitBreaker, CorrelationId, Executor, GateError,
    GateRegistry, GateResult, Pipeline, State, Submission,
};
