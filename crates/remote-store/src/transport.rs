//! The remote transport a store talks through.
//!

use core::time::Duration;
use std::{
    io::{self, Read},
    path::PathBuf,
};

use thiserror::Error;

use crate::RemoteStat;

pub use ftp::{FtpOptions, FtpTransport};
pub use sftp::SftpTransport;

mod ftp;
mod sftp;

/// Default timeout for every remote call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound for the timeout of every remote call.
pub const MAXIMUM_TIMEOUT: Duration = Duration::from_secs(3600);

/// How to authenticate against the remote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    /// Password authentication.
    Password(String),

    /// Public key authentication with a private key file.
    KeyFile {
        /// The private key.
        path: PathBuf,

        /// The passphrase protecting the private key.
        passphrase: Option<String>,
    },
}

/// Connection parameters, fixed for the lifetime of a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionParameters {
    /// The host to connect to.
    pub host: String,

    /// The port to connect to.
    pub port: u16,

    /// The user to log in as.
    pub user: String,

    /// The credentials for the user.
    pub credentials: Credentials,

    /// The timeout for every remote call, clamped to `MAXIMUM_TIMEOUT`.
    pub timeout: Duration,
}

impl ConnectionParameters {
    /// The timeout, clamped to `MAXIMUM_TIMEOUT`.
    pub fn timeout(&self) -> Duration {
        self.timeout.min(MAXIMUM_TIMEOUT)
    }
}

/// One raw row from a remote listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawEntry {
    /// A long format `ls -l` line.
    Line(String),

    /// A structured stat result.
    Stat {
        /// The base name of the entry.
        name: String,

        /// The stat result.
        stat: RemoteStat,
    },
}

/// A connection to a remote server.
///
/// Paths handed to a transport are absolute, the store resolves them first.
pub trait Transport {
    /// A short description of the remote, used to prefix logs.
    fn describe(&self) -> String;

    /// Authenticate and establish the session.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Tear down the session.
    fn disconnect(&mut self) -> Result<(), TransportError>;

    /// The absolute working directory, as the server reports it.
    fn pwd(&mut self) -> Result<String, TransportError>;

    /// Change the working directory.
    fn cwd(&mut self, path: &str) -> Result<(), TransportError>;

    /// List the entries of a directory.
    fn list(&mut self, path: &str) -> Result<Vec<RawEntry>, TransportError>;

    /// Create a directory.
    fn mkdir(&mut self, path: &str) -> Result<(), TransportError>;

    /// Remove an empty directory.
    fn rmdir(&mut self, path: &str) -> Result<(), TransportError>;

    /// Delete a file.
    fn delete(&mut self, path: &str) -> Result<(), TransportError>;

    /// Stat a path without following a final symbolic link. A link is reported as
    /// `EntryKind::Unknown` so it is deleted rather than walked.
    fn stat(&mut self, path: &str) -> Result<RemoteStat, TransportError>;

    /// Store the contents of `reader` at `path`, returning the bytes written.
    fn store_file(&mut self, path: &str, reader: &mut dyn Read) -> Result<u64, TransportError>;
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Temporary failure: {0}")]
    Transient(String),

    #[error("Access denied or not found: {0}")]
    Denied(String),

    #[error("{0}")]
    Permanent(String),

    #[error("Local IO failed: {0}")]
    LocalIo(#[source] io::Error),
}

impl TransportError {
    /// If the failure is temporary and the call may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
