//! # common
//!

use core::time::Duration;
use std::{fs, path::Path};

use chrono::NaiveDate;
use ftp_backup::{Config, RemoteConfig};
use remote_store::{RemoteStore, RetryPolicy, StoreOptions, test::MockTransport};
use tempfile::TempDir;

/// Friday the first of March 2024.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

/// A remote root with three days of backups, a stray directory and a stray file.
pub fn remote() -> MockTransport {
    MockTransport::new()
        .with_file("/backup/2024-02-27_00/database.sql", b"old")
        .with_file("/backup/2024-02-28_00/database.sql", b"older")
        .with_file("/backup/2024-02-29_00/database.sql", b"0123456789")
        .with_directory("/backup/notes")
        .with_file("/backup/README.txt", b"read")
}

/// A local directory with two files and a nested directory.
pub fn local_directory() -> TempDir {
    let directory = tempfile::tempdir().unwrap();

    fs::write(directory.path().join("b file.txt"), "bbb").unwrap();
    fs::write(directory.path().join("A.txt"), "aa").unwrap();
    fs::create_dir(directory.path().join("nested")).unwrap();
    fs::write(directory.path().join("nested").join("skipped.txt"), "x").unwrap();

    directory
}

pub fn config(local_directory: &Path) -> Config {
    Config {
        local_directory: local_directory.to_path_buf(),
        remote: RemoteConfig {
            directory: "/backup".to_string(),
            password: Some("secret".to_string()),
            ..RemoteConfig::default()
        },
        ..Config::default()
    }
}

pub fn store(mock: MockTransport, simulate: bool) -> RemoteStore<MockTransport> {
    RemoteStore::new(
        mock,
        StoreOptions {
            simulate,
            retry: RetryPolicy {
                max_attempts: 3,
                backoff: Duration::ZERO,
            },
        },
    )
}
