//! Advanced gating example
//!
//! This example demonstrates:
//! 1. Owning a registry of named gates at the composition root
//! 2. Spawning gated calls through the executor adapter
//! 3. Using hooks for monitoring breaker transitions
//! 4. Watching the bulkhead shed load under a request burst

use callguard_rs::{
    BreakerConfig, BulkheadConfig, CircuitBreaker, Executor, GateError, GateRegistry,
    HookRegistry, Pipeline,
};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// Custom error type that implements Error trait
#[derive(Debug)]
struct PaymentError(String);

impl PaymentError {
    fn new(msg: &str) -> Self {
        PaymentError(msg.to_string())
    }
}

impl fmt::Display for PaymentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "payment error: {}", self.0)
    }
}

impl Error for PaymentError {}

// A payment processor where roughly every third charge fails.
async fn charge_card(request: u32) -> Result<String, PaymentError> {
    tokio::time::sleep(Duration::from_millis(200)).await;
    if request % 3 == 0 {
        Err(PaymentError::new("card declined"))
    } else {
        Ok(format!("receipt #{request}"))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // RUST_LOG=callguard_rs=debug shows gate decisions per correlation id.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Gated payment burst ===\n");

    // 1. One registry, owned here, configures every named gate.
    let registry = GateRegistry::new(
        BulkheadConfig::builder()
            .max_concurrent_calls(5)
            .max_wait(Duration::from_millis(500))
            .build()?,
        BreakerConfig::builder()
            .failure_rate_threshold(50.0)
            .sliding_window_size(10)
            .wait_duration_in_open_state(Duration::from_secs(2))
            .build()?,
    );

    // 2. Hooks make the breaker's decisions visible.
    let hooks = Arc::new(HookRegistry::new());
    hooks.set_on_open(|| println!(">> circuit OPENED, shedding payments"));
    hooks.set_on_half_open(|| println!(">> circuit HALF-OPEN, probing recovery"));
    hooks.set_on_close(|| println!(">> circuit CLOSED, traffic restored"));

    let breaker = CircuitBreaker::with_instruments(
        "payments",
        BreakerConfig::builder()
            .failure_rate_threshold(50.0)
            .sliding_window_size(10)
            .wait_duration_in_open_state(Duration::from_secs(2))
            .build()?,
        Arc::new(callguard_rs::NullMetricSink),
        hooks,
    );
    let pipeline = Pipeline::new(registry.bulkhead("payments"), breaker);

    // 3. Fire a burst of 20 payments through the worker pool.
    let executor = Executor::try_current().expect("inside a runtime");
    let mut handles = Vec::new();
    for request in 1..=20 {
        handles.push(executor.submit(&pipeline, format!("payment-{request}"), move || {
            charge_card(request)
        }));
    }

    let mut granted = 0;
    let mut shed = 0;
    for handle in handles {
        let submission = handle.await?;
        match submission.result {
            Ok(receipt) => {
                granted += 1;
                println!("[{}] {}", submission.correlation, receipt);
            }
            Err(GateError::BulkheadRejected) => {
                shed += 1;
                println!("[{}] shed: no capacity", submission.correlation);
            }
            Err(GateError::CircuitOpen) => {
                shed += 1;
                println!("[{}] shed: circuit open", submission.correlation);
            }
            Err(GateError::Operation(err)) => {
                granted += 1;
                println!("[{}] failed: {}", submission.correlation, err);
            }
        }
    }

    println!("\nran={granted}, shed={shed}");
    println!(
        "breaker: state={}, successes={}, failures={}, rejected={}",
        pipeline.breaker().state(),
        pipeline.breaker().success_total(),
        pipeline.breaker().failure_total(),
        pipeline.breaker().rejected_total()
    );
    println!(
        "bulkhead: acquired={}, rejected={}",
        pipeline.bulkhead().acquired_total(),
        pipeline.bulkhead().rejected_total()
    );

    Ok(())
}
