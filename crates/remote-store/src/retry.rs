//! Bounded retries with a fixed backoff.
//!

use core::{fmt::Display, time::Duration};
use std::thread::sleep;

use shared::Context;
use tracing::warn;

/// How often and how patiently to retry an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// The maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// How long to sleep between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff: Duration::from_secs(2),
        }
    }
}

/// The error of the last attempt of an operation.
#[derive(Debug)]
pub struct Attempted<E> {
    /// How many attempts were made.
    pub attempts: u32,

    /// The error of the last attempt.
    pub error: E,
}

impl RetryPolicy {
    /// Runs `operation` until it succeeds, fails with an error `is_retryable` rejects, or
    /// the attempts run out. The operation receives the 1-based attempt number.
    pub fn run<T, E, Operation, Retryable>(
        &self,
        context: &Context,
        mut operation: Operation,
        is_retryable: Retryable,
    ) -> Result<T, Attempted<E>>
    where
        E: Display,
        Operation: FnMut(u32) -> Result<T, E>,
        Retryable: Fn(&E) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation(attempt) {
                Ok(value) => return Ok(value),

                Err(error) if attempt < max_attempts && is_retryable(&error) => {
                    warn!(
                        "{context}Attempt {attempt}/{max_attempts} failed, retrying in {:?}: {error}",
                        self.backoff
                    );
                    sleep(self.backoff);
                    attempt += 1;
                }

                Err(error) => {
                    return Err(Attempted {
                        attempts: attempt,
                        error,
                    });
                }
            }
        }
    }
}
