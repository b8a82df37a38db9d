use core::time::Duration;
use std::{
    fs,
    path::{Path, PathBuf},
};

use remote_store::{
    ConnectionParameters, Credentials, FtpOptions, FtpTransport, RetryPolicy, SftpTransport,
    StoreOptions,
    transport::{DEFAULT_TIMEOUT, MAXIMUM_TIMEOUT},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{RetentionClass, RetentionPolicy};

/// The protocol to talk to the remote with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    /// FTP, optionally with explicit TLS.
    Ftp,

    /// SFTP over SSH.
    Sftp,
}

/// Where and how to connect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// The protocol to use.
    pub protocol: Protocol,

    /// The host to connect to.
    pub host: String,

    /// The port to connect to, `0` for the protocol's default.
    pub port: u16,

    /// The user to log in as.
    pub user: String,

    /// The password, or the passphrase of `key_file`.
    pub password: Option<String>,

    /// The private key for SFTP public key authentication.
    pub key_file: Option<PathBuf>,

    /// The remote root holding the backup directories.
    pub directory: String,

    /// The timeout for every remote call in seconds.
    pub timeout_seconds: u64,

    /// Use passive mode for FTP data connections.
    pub passive: bool,

    /// Upgrade FTP connections with explicit TLS.
    pub tls: bool,

    /// The root certificates to trust for FTP over TLS.
    pub tls_root_certificate_file: Option<PathBuf>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Sftp,
            host: "localhost".to_string(),
            port: 0,
            user: "backup".to_string(),
            password: None,
            key_file: None,
            directory: "/".to_string(),
            timeout_seconds: DEFAULT_TIMEOUT.as_secs(),
            passive: true,
            tls: false,
            tls_root_certificate_file: None,
        }
    }
}

impl RemoteConfig {
    /// The port, with `0` resolved to the protocol's default.
    pub fn port(&self) -> u16 {
        match (self.port, self.protocol) {
            (0, Protocol::Ftp) => FtpTransport::DEFAULT_PORT,
            (0, Protocol::Sftp) => SftpTransport::DEFAULT_PORT,
            (port, _) => port,
        }
    }

    /// The timeout, clamped to an hour.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds).min(MAXIMUM_TIMEOUT)
    }

    /// The parameters to bind into a transport.
    pub fn connection_parameters(&self) -> Result<ConnectionParameters, ConfigError> {
        let credentials = match (&self.key_file, &self.password, self.protocol) {
            (Some(path), passphrase, Protocol::Sftp) => Credentials::KeyFile {
                path: path.clone(),
                passphrase: passphrase.clone(),
            },
            (Some(_), _, Protocol::Ftp) => return Err(ConfigError::KeyFileOverFtp),
            (None, Some(password), _) => Credentials::Password(password.clone()),
            (None, None, _) => return Err(ConfigError::NoCredentials),
        };

        Ok(ConnectionParameters {
            host: self.host.clone(),
            port: self.port(),
            user: self.user.clone(),
            credentials,
            timeout: self.timeout(),
        })
    }

    /// The FTP specific options.
    pub fn ftp_options(&self) -> FtpOptions {
        FtpOptions {
            passive: self.passive,
            tls: self.tls,
            tls_root_certificate_file: self.tls_root_certificate_file.clone(),
        }
    }
}

/// Upload retries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// The maximum attempts per file, including the first.
    pub max_attempts: u32,

    /// The pause between attempts in seconds.
    pub backoff_seconds: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff_seconds: 2,
        }
    }
}

impl UploadConfig {
    /// The retry policy for uploads.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: Duration::from_secs(self.backoff_seconds),
        }
    }
}

/// The backup config
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The local directory whose files are backed up.
    pub local_directory: PathBuf,

    /// Only log what would be changed on the remote.
    pub simulate: bool,

    /// Where to write a JSON report of each run.
    pub report_file: Option<PathBuf>,

    /// The remote.
    pub remote: RemoteConfig,

    /// How many copies of each class to keep.
    pub copies: RetentionPolicy,

    /// Upload retries.
    pub upload: UploadConfig,
}

impl Config {
    /// Tries to load a config from a toml file.
    pub fn load_toml(file_path: &Path) -> Result<Self, LoadConfigError> {
        if !file_path.exists() {
            return Err(LoadConfigError::NoFile(file_path.to_path_buf()));
        }

        let contents = fs::read_to_string(file_path).map_err(LoadConfigError::Read)?;
        let config = toml::from_str(&contents)?;

        Ok(config)
    }

    /// Checks the values serde can not, returning the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for class in RetentionClass::PROTECTING {
            if self.copies.quota(class) == Some(0) {
                return Err(ConfigError::NoCopies(class));
            }
        }

        if self.upload.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }

        if self.upload.backoff_seconds == 0 {
            return Err(ConfigError::NoBackoff);
        }

        if self.remote.timeout_seconds == 0 {
            return Err(ConfigError::NoTimeout);
        }

        if self.remote.host.trim().is_empty() {
            return Err(ConfigError::NoHost);
        }

        if self.remote.protocol == Protocol::Ftp
            && self.remote.tls
            && self.remote.tls_root_certificate_file.is_none()
        {
            return Err(ConfigError::NoTlsRoot);
        }

        self.remote.connection_parameters()?;

        Ok(())
    }

    /// The options for the remote store.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            simulate: self.simulate,
            retry: self.upload.retry_policy(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_directory: PathBuf::from("/var/backup"),
            simulate: false,
            report_file: None,
            remote: RemoteConfig::default(),
            copies: RetentionPolicy::default(),
            upload: UploadConfig::default(),
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("At least one {0} copy must be kept")]
    NoCopies(RetentionClass),

    #[error("Uploads need at least one attempt")]
    NoAttempts,

    #[error("The upload backoff must be at least one second")]
    NoBackoff,

    #[error("The remote timeout must be at least one second")]
    NoTimeout,

    #[error("No remote host is configured")]
    NoHost,

    #[error("FTP over TLS needs a root certificate file")]
    NoTlsRoot,

    #[error("Key files are only supported over SFTP")]
    KeyFileOverFtp,

    #[error("Neither a password nor a key file is configured")]
    NoCredentials,
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("The file {0:?} does not exist.")]
    NoFile(PathBuf),

    #[error("Failed to read the file:\n{0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to deserialize the file:\n{0}")]
    Deserialize(#[from] toml::de::Error),
}
