//! # ftp-backup
//! Scheduled backups of a local directory into dated remote directories, with
//! yearly, monthly, weekly and daily rotation.
//!

mod config;
mod local;
mod report;
pub mod retention;
mod runner;

pub use config::{Config, ConfigError, LoadConfigError, Protocol, RemoteConfig, UploadConfig};
pub use local::{
    LocalDirectoryError, LocalFile, check_local_directory, local_files, sanitize_remote_name,
};
pub use report::{DiskUsage, FailedRemoval, ReportError, RunReport, UploadedFile, format_size};
pub use retention::{Classification, RetentionClass, RetentionPlan, RetentionPolicy};
pub use runner::{BackupRunner, RunError};
