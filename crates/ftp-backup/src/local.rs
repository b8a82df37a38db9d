use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use shared::Context;
use thiserror::Error;
use tracing::{debug, warn};

use crate::retention::compare_names;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// A local file to upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalFile {
    /// The path of the file.
    pub path: PathBuf,

    /// The name to store the file under.
    pub remote_name: String,

    /// The size in bytes when it was enumerated.
    pub size: u64,
}

/// The name a local file is stored under: runs of whitespace become one underscore.
pub fn sanitize_remote_name(name: &str) -> String {
    WHITESPACE.replace_all(name, "_").into_owned()
}

/// Checks that the local directory exists, is a directory and can be read.
pub fn check_local_directory(directory: &Path) -> Result<(), LocalDirectoryError> {
    let metadata = fs::metadata(directory).map_err(|source| LocalDirectoryError::Missing {
        path: directory.to_path_buf(),
        source,
    })?;

    if !metadata.is_dir() {
        return Err(LocalDirectoryError::NotADirectory(directory.to_path_buf()));
    }

    fs::read_dir(directory).map_err(|source| LocalDirectoryError::Read {
        path: directory.to_path_buf(),
        source,
    })?;

    Ok(())
}

/// The regular files directly inside `directory`, sorted case-insensitively by name.
/// Symbolic links to regular files are included. Entries that can not be inspected are
/// skipped with a warning.
pub fn local_files(
    context: &Context,
    directory: &Path,
) -> Result<Vec<LocalFile>, LocalDirectoryError> {
    let entries = fs::read_dir(directory).map_err(|source| LocalDirectoryError::Read {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut files: Vec<LocalFile> = entries
        .filter_map(|entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    warn!("{context}Could not read entry: {error}");
                    return None;
                }
            };
            let path = entry.path();

            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(error) => {
                    warn!("{context}Could not get entry {path:?} metadata: {error}");
                    return None;
                }
            };

            if !metadata.is_file() {
                debug!("{context}Skipping {path:?}, not a regular file");
                return None;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            Some(LocalFile {
                remote_name: sanitize_remote_name(&name),
                path,
                size: metadata.len(),
            })
        })
        .collect();

    files.sort_by(|a, b| {
        let a_name = a.path.file_name().unwrap_or_default().to_string_lossy();
        let b_name = b.path.file_name().unwrap_or_default().to_string_lossy();
        compare_names(&a_name, &b_name)
    });

    Ok(files)
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum LocalDirectoryError {
    #[error("Local directory {path:?} does not exist: {source}")]
    Missing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Local path {0:?} is not a directory")]
    NotADirectory(PathBuf),

    #[error("Failed to read local directory {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
