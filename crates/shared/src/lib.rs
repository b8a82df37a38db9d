//! # Shared
//! The shared components between the remote store and the backup runner.
//!

#![warn(missing_docs)]

mod certificates;
mod context;
mod failure;
mod logger;

pub use certificates::{CertificateError, load_trust_store};
pub use context::Context;
pub use failure::Failure;
pub use logger::{LoggerError, init_logger};
