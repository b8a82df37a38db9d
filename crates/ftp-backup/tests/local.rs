//! Tests for local files
//!

use std::fs;

use ftp_backup::{LocalDirectoryError, check_local_directory, local_files, sanitize_remote_name};
use shared::Context;

mod common;

#[test]
fn whitespace_becomes_underscores() {
    assert_eq!(sanitize_remote_name("db dump\t 2024.sql"), "db_dump_2024.sql");
    assert_eq!(sanitize_remote_name("plain.tar"), "plain.tar");
}

#[test]
fn only_direct_regular_files_sorted() {
    let directory = common::local_directory();

    let files = local_files(&Context::default(), directory.path()).unwrap();
    let names: Vec<_> = files.iter().map(|file| file.remote_name.as_str()).collect();

    assert_eq!(names, ["A.txt", "b_file.txt"]);
    assert_eq!(files.first().map(|file| file.size), Some(2));
}

#[test]
fn missing_directory() {
    let directory = tempfile::tempdir().unwrap();
    let missing = directory.path().join("missing");

    assert!(matches!(
        check_local_directory(&missing),
        Err(LocalDirectoryError::Missing { .. })
    ));
}

#[test]
fn file_is_not_a_directory() {
    let directory = tempfile::tempdir().unwrap();
    let file = directory.path().join("file");
    fs::write(&file, "contents").unwrap();

    assert!(matches!(
        check_local_directory(&file),
        Err(LocalDirectoryError::NotADirectory(_))
    ));
    check_local_directory(directory.path()).unwrap();
}
