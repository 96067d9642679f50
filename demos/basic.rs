use callguard_rs::{
    BreakerConfig, Bulkhead, BulkheadConfig, CircuitBreaker, GateError, Pipeline,
};
use std::error::Error;
use std::fmt;
use std::time::Duration;

// Custom error type that implements Error trait
#[derive(Debug)]
struct PaymentError(String);

impl fmt::Display for PaymentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "payment error: {}", self.0)
    }
}

impl Error for PaymentError {}

// Simulates a payment processor that degrades and then recovers.
async fn process_payment(attempt: u32) -> Result<String, PaymentError> {
    tokio::time::sleep(Duration::from_millis(50)).await;
    if (4..=9).contains(&attempt) {
        Err(PaymentError("gateway timeout".to_string()))
    } else {
        Ok(format!("charged on attempt {attempt}"))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Limit to 5 concurrent payments, waiting up to 1 second for a slot.
    let bulkhead = Bulkhead::new(
        "payments",
        BulkheadConfig::builder()
            .max_concurrent_calls(5)
            .max_wait(Duration::from_millis(1000))
            .build()?,
    );

    // Open once 20% of the last 10 payments failed; retry after 5 seconds.
    let breaker = CircuitBreaker::new(
        "payments",
        BreakerConfig::builder()
            .failure_rate_threshold(20.0)
            .sliding_window_size(10)
            .wait_duration_in_open_state(Duration::from_secs(5))
            .build()?,
    );

    let pipeline = Pipeline::new(bulkhead, breaker);

    for attempt in 1..=20 {
        let submission = pipeline
            .submit(format!("payment-{attempt}"), || process_payment(attempt))
            .await;

        match submission.result {
            Ok(receipt) => println!("[{}] {}", submission.correlation, receipt),
            Err(GateError::BulkheadRejected) => {
                println!("[{}] no capacity, try again later", submission.correlation)
            }
            Err(GateError::CircuitOpen) => {
                println!("[{}] circuit open, payment not attempted", submission.correlation);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Err(GateError::Operation(err)) => {
                println!("[{}] {}", submission.correlation, err)
            }
        }

        println!(
            "  state={}, failure_rate={:?}, free_permits={}",
            pipeline.breaker().state(),
            pipeline.breaker().failure_rate(),
            pipeline.bulkhead().available_permits()
        );
    }

    Ok(())
}
