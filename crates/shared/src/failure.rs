use core::fmt::Display;

use tracing::error;

/// Extension trait for results that can only fail during start up.
pub trait Failure<T> {
    /// Unwraps the value, or logs `message` with the error and panics.
    fn or_log_and_panic(self, message: &str) -> T;
}

impl<T, E: Display> Failure<T> for Result<T, E> {
    fn or_log_and_panic(self, message: &str) -> T {
        self.unwrap_or_else(|error| {
            error!("{message}: {error}");
            panic!("{message}: {error}")
        })
    }
}
