//! Tests for retries
//!

use core::time::Duration;

use remote_store::RetryPolicy;
use shared::Context;

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        backoff: Duration::ZERO,
    }
}

#[test]
fn succeeds_after_retries() {
    let _logger = shared::test::init_test_logger();
    let context = Context::default();

    let value = policy(5)
        .run(
            &context,
            |attempt| if attempt < 3 { Err("busy") } else { Ok(attempt) },
            |_| true,
        )
        .unwrap();

    assert_eq!(value, 3);
}

#[test]
fn stops_at_max_attempts() {
    let context = Context::default();
    let mut calls = 0;

    let attempted = policy(4)
        .run(
            &context,
            |_| -> Result<(), &str> {
                calls += 1;
                Err("busy")
            },
            |_| true,
        )
        .unwrap_err();

    assert_eq!(calls, 4);
    assert_eq!(attempted.attempts, 4);
    assert_eq!(attempted.error, "busy");
}

#[test]
fn does_not_retry_rejected_errors() {
    let context = Context::default();
    let mut calls = 0;

    let attempted = policy(4)
        .run(
            &context,
            |_| -> Result<(), &str> {
                calls += 1;
                Err("denied")
            },
            |error| *error != "denied",
        )
        .unwrap_err();

    assert_eq!(calls, 1);
    assert_eq!(attempted.attempts, 1);
}

#[test]
fn zero_attempts_runs_once() {
    let context = Context::default();
    let mut calls = 0;

    let _ = policy(0).run(
        &context,
        |_| -> Result<(), &str> {
            calls += 1;
            Err("busy")
        },
        |_| true,
    );

    assert_eq!(calls, 1);
}
