//! A uniform, connection-state aware store on top of a transport.
//!

use std::{
    collections::HashSet,
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use shared::Context;
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use crate::{
    EntryKind, RemoteDirEntry, RetryPolicy,
    remote_path::{join, resolve},
    transport::{RawEntry, Transport, TransportError},
};

/// Behaviour of a store that is not part of the connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Log mutating calls instead of making them. Listings and traversals still run.
    pub simulate: bool,

    /// The retry policy for uploads.
    pub retry: RetryPolicy,
}

/// The entries of one remote directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Listing {
    /// The absolute path of the listed directory.
    pub directory: String,

    /// The entries, without `.` and `..`.
    pub entries: Vec<RemoteDirEntry>,

    /// How many rows could not be parsed and were skipped.
    pub unparseable: usize,
}

/// A remote store, adapting any transport to one contract.
///
/// Every operation fails fast with `StoreError::NotConnected` until `connect` succeeds.
/// The store never reconnects on its own.
pub struct RemoteStore<T: Transport> {
    transport: T,
    options: StoreOptions,
    connected: bool,
    current_directory: String,
    simulated_directories: HashSet<String>,
    context: Context,
}

impl<T: Transport> RemoteStore<T> {
    /// Create a new, unconnected store.
    pub fn new(transport: T, options: StoreOptions) -> Self {
        let context = Context::for_remote(transport.describe());

        Self {
            transport,
            options,
            connected: false,
            current_directory: "/".to_string(),
            simulated_directories: HashSet::new(),
            context,
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// If a session is established.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// If mutating calls are only logged.
    pub fn is_simulating(&self) -> bool {
        self.options.simulate
    }

    /// The absolute current remote directory.
    pub fn current_directory(&self) -> &str {
        &self.current_directory
    }

    /// Authenticate and establish the session. Does nothing if already connected.
    pub fn connect(&mut self) -> Result<(), StoreError> {
        self.context.current_context = "Connect";

        if self.connected {
            warn!("{}Already connected", self.context);
            return Ok(());
        }

        self.transport.connect().map_err(StoreError::Connect)?;

        let directory = match self.transport.pwd() {
            Ok(directory) => directory,
            Err(error) => {
                let _ = self.transport.disconnect();
                return Err(StoreError::Connect(error));
            }
        };

        self.connected = true;
        self.current_directory = directory;
        info!(
            "{}Connected, remote directory is '{}'",
            self.context, self.current_directory
        );

        Ok(())
    }

    /// Tear down the session. Does nothing if not connected.
    pub fn disconnect(&mut self) -> Result<(), StoreError> {
        self.context.current_context = "Disconnect";

        if !self.connected {
            return Ok(());
        }

        self.connected = false;
        self.simulated_directories.clear();
        self.transport.disconnect().map_err(StoreError::Disconnect)?;
        info!("{}Disconnected", self.context);

        Ok(())
    }

    /// Change the current remote directory. Relative paths are resolved against the
    /// current directory. Returns the new directory as the server reports it.
    pub fn change_directory(&mut self, path: &str) -> Result<&str, StoreError> {
        self.ensure_connected()?;
        self.context.current_context = "Change Directory";

        let target = resolve(&self.current_directory, path);

        if self.simulated_directories.contains(&target) {
            debug!("{}Changed into '{target}' (simulated)", self.context);
            self.current_directory = target;
            return Ok(&self.current_directory);
        }

        self.transport
            .cwd(&target)
            .map_err(|source| StoreError::Navigation {
                path: target.clone(),
                source,
            })?;

        self.current_directory =
            self.transport
                .pwd()
                .map_err(|source| StoreError::Navigation {
                    path: target.clone(),
                    source,
                })?;

        debug!("{}Changed into '{}'", self.context, self.current_directory);
        Ok(&self.current_directory)
    }

    /// List a directory, the current one if `path` is `None`.
    ///
    /// Blank rows are skipped silently, rows that cannot be parsed are skipped and
    /// counted in `Listing::unparseable`.
    pub fn list(&mut self, path: Option<&str>) -> Result<Listing, StoreError> {
        self.ensure_connected()?;
        self.context.current_context = "List";

        let directory = match path {
            Some(path) => resolve(&self.current_directory, path),
            None => self.current_directory.clone(),
        };

        if self.simulated_directories.contains(&directory) {
            return Ok(Listing {
                directory,
                ..Default::default()
            });
        }

        let rows = self
            .transport
            .list(&directory)
            .map_err(|source| StoreError::List {
                path: directory.clone(),
                source,
            })?;

        let mut entries = Vec::with_capacity(rows.len());
        let mut unparseable = 0;

        for row in rows {
            let entry = match row {
                RawEntry::Line(line) => {
                    let line = line.trim_end();
                    if line.trim().is_empty() || line.starts_with("total ") {
                        continue;
                    }

                    match RemoteDirEntry::parse_line(line) {
                        Ok(entry) => entry,
                        Err(error) => {
                            debug!("{}Skipping row in '{directory}': {error}", self.context);
                            unparseable += 1;
                            continue;
                        }
                    }
                }

                RawEntry::Stat { name, stat } => RemoteDirEntry::from_stat(name, stat),
            };

            if entry.is_navigation() {
                continue;
            }

            trace!("{}{} {:>12} {}", self.context, entry.permissions, entry.size, entry.name);
            entries.push(entry);
        }

        if unparseable > 0 {
            debug!(
                "{}Skipped {unparseable} unparseable rows in '{directory}'",
                self.context
            );
        }

        Ok(Listing {
            directory,
            entries,
            unparseable,
        })
    }

    /// Create a directory.
    pub fn make_directory(&mut self, path: &str) -> Result<(), StoreError> {
        self.ensure_connected()?;
        self.context.current_context = "Make Directory";

        let target = resolve(&self.current_directory, path);

        if self.options.simulate {
            info!("{}Creating directory '{target}' (simulated)", self.context);
            self.simulated_directories.insert(target);
            return Ok(());
        }

        info!("{}Creating directory '{target}'", self.context);
        self.transport
            .mkdir(&target)
            .map_err(|source| StoreError::MakeDirectory {
                path: target,
                source,
            })
    }

    /// Delete a file.
    pub fn remove(&mut self, path: &str) -> Result<(), StoreError> {
        self.ensure_connected()?;
        self.context.current_context = "Remove";

        let target = resolve(&self.current_directory, path);
        self.delete_file(&target)
    }

    /// Delete a file, or a directory and everything below it, depth first.
    ///
    /// A failing node does not stop its siblings from being removed; the first failure
    /// is returned once the walk is done.
    pub fn remove_recursive(&mut self, path: &str) -> Result<(), StoreError> {
        self.ensure_connected()?;
        self.context.current_context = "Remove";

        let target = resolve(&self.current_directory, path);
        self.remove_tree(&target)
    }

    /// Upload a local regular file into the current remote directory, under
    /// `remote_name` or the local file name. Returns the bytes transferred.
    ///
    /// Transient transfer failures are retried according to the store's retry policy.
    pub fn upload_file(
        &mut self,
        local_path: &Path,
        remote_name: Option<&str>,
    ) -> Result<u64, StoreError> {
        let metadata = fs::metadata(local_path).map_err(|source| StoreError::OpenLocal {
            path: local_path.to_path_buf(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(StoreError::NotAFile(local_path.to_path_buf()));
        }

        let remote_name = match remote_name {
            Some(name) => name.to_string(),
            None => local_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| StoreError::NotAFile(local_path.to_path_buf()))?,
        };

        self.ensure_connected()?;
        self.context.current_context = "Upload";

        let remote_path = join(&self.current_directory, &remote_name);

        if self.options.simulate {
            info!(
                "{}Uploading {local_path:?} to '{remote_path}' (simulated)",
                self.context
            );
            return Ok(metadata.len());
        }

        info!("{}Uploading {local_path:?} to '{remote_path}'", self.context);

        let transport = &mut self.transport;
        let bytes = self
            .options
            .retry
            .run(
                &self.context,
                |attempt| {
                    if attempt > 1 {
                        debug!("Attempt {attempt} for '{remote_path}'");
                    }

                    let mut file = File::open(local_path).map_err(TransportError::LocalIo)?;
                    transport.store_file(&remote_path, &mut file)
                },
                TransportError::is_transient,
            )
            .map_err(|attempted| StoreError::Put {
                path: remote_path.clone(),
                attempts: attempted.attempts,
                source: attempted.error,
            })?;

        info!("{}Uploaded '{remote_path}' ({bytes} bytes)", self.context);
        Ok(bytes)
    }

    /// The total size of an entry of `directory` (the current directory if `None`).
    ///
    /// Files report their own size. Directories are listed recursively, one round trip
    /// per directory, with no caching between calls.
    pub fn disk_usage(
        &mut self,
        entry: &RemoteDirEntry,
        directory: Option<&str>,
    ) -> Result<u64, StoreError> {
        self.ensure_connected()?;
        self.context.current_context = "Disk Usage";

        if !entry.is_dir() {
            return Ok(entry.size);
        }

        let parent = match directory {
            Some(directory) => resolve(&self.current_directory, directory),
            None => self.current_directory.clone(),
        };

        self.tree_size(&join(&parent, &entry.name))
    }

    fn tree_size(&mut self, path: &str) -> Result<u64, StoreError> {
        let listing = self.list(Some(path))?;

        let mut total: u64 = 0;
        for entry in &listing.entries {
            let size = if entry.is_dir() {
                self.tree_size(&join(path, &entry.name))?
            } else {
                entry.size
            };
            total = total.saturating_add(size);
        }

        Ok(total)
    }

    fn remove_tree(&mut self, path: &str) -> Result<(), StoreError> {
        let kind = match self.transport.stat(path) {
            Ok(stat) => stat.kind,
            Err(error) => {
                debug!("{}Could not stat '{path}': {error}", self.context);
                EntryKind::Unknown
            }
        };

        match kind {
            EntryKind::Directory => {
                let listing = self.list(Some(path))?;
                self.context.current_context = "Remove";

                let mut first_error = None;
                for entry in listing.entries {
                    let child = join(path, &entry.name);
                    if let Err(error) = self.remove_tree(&child) {
                        error!("{}{error}", self.context);
                        first_error.get_or_insert(error);
                    }
                }

                if let Some(error) = first_error {
                    return Err(error);
                }

                self.remove_empty_directory(path)
            }

            EntryKind::File | EntryKind::Unknown => self.delete_file(path),
        }
    }

    fn remove_empty_directory(&mut self, path: &str) -> Result<(), StoreError> {
        if self.options.simulate {
            info!("{}Removing directory '{path}' (simulated)", self.context);
            return Ok(());
        }

        info!("{}Removing directory '{path}'", self.context);
        self.transport
            .rmdir(path)
            .map_err(|source| StoreError::Remove {
                path: path.to_string(),
                source,
            })
    }

    fn delete_file(&mut self, path: &str) -> Result<(), StoreError> {
        if self.options.simulate {
            info!("{}Removing file '{path}' (simulated)", self.context);
            return Ok(());
        }

        info!("{}Removing file '{path}'", self.context);
        self.transport
            .delete(path)
            .map_err(|source| StoreError::Remove {
                path: path.to_string(),
                source,
            })
    }

    fn ensure_connected(&self) -> Result<(), StoreError> {
        if self.connected {
            Ok(())
        } else {
            Err(StoreError::NotConnected)
        }
    }
}

impl<T: Transport> Drop for RemoteStore<T> {
    fn drop(&mut self) {
        if let Err(error) = self.disconnect() {
            warn!("{}{error}", self.context);
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not connected to the remote")]
    NotConnected,

    #[error("Failed to connect: {0}")]
    Connect(#[source] TransportError),

    #[error("Failed to disconnect: {0}")]
    Disconnect(#[source] TransportError),

    #[error("Error changing to remote directory '{path}': {source}")]
    Navigation {
        path: String,
        #[source]
        source: TransportError,
    },

    #[error("Failed to list '{path}': {source}")]
    List {
        path: String,
        #[source]
        source: TransportError,
    },

    #[error("Failed to create directory '{path}': {source}")]
    MakeDirectory {
        path: String,
        #[source]
        source: TransportError,
    },

    #[error("Error removing '{path}': {source}")]
    Remove {
        path: String,
        #[source]
        source: TransportError,
    },

    #[error("{0:?} is not a regular file")]
    NotAFile(PathBuf),

    #[error("Failed to read local file {path:?}: {source}")]
    OpenLocal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not put file '{path}' after {attempts} attempt(s): {source}")]
    Put {
        path: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },
}
