use std::path::PathBuf;

use chrono::NaiveDate;
use remote_store::{RemoteStore, StoreError, Transport};
use shared::Context;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    Config, ConfigError, DiskUsage, FailedRemoval, LocalDirectoryError, ReportError, RetentionPlan,
    RunReport, UploadedFile, check_local_directory, format_size, local_files,
};

/// Runs one backup: rotate the remote root, upload into a new dated directory and
/// report the remote disk usage.
pub struct BackupRunner {
    config: Config,
    context: Context,
}

impl BackupRunner {
    /// Create a runner for a validated config.
    pub fn new(config: Config) -> Result<Self, RunError> {
        config.validate()?;

        Ok(Self {
            config,
            context: Context::default(),
        })
    }

    /// The config the runner was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a backup through `store` as of `today`.
    ///
    /// The local directory is checked before connecting. Once connected, the store is
    /// always disconnected again, whatever happens in between.
    pub fn run<T: Transport>(
        &mut self,
        store: &mut RemoteStore<T>,
        today: NaiveDate,
    ) -> Result<RunReport, RunError> {
        self.context = Context::for_remote(store.transport().describe());
        self.context.current_context = "Run";

        check_local_directory(&self.config.local_directory)?;

        store.connect().map_err(RunError::Connect)?;

        let result = self.run_connected(store, today);

        if let Err(error) = store.disconnect() {
            warn!("{}{error}", self.context);
        }

        let report = result?;
        if let Some(path) = &self.config.report_file {
            report.save(path)?;
            info!("{}Wrote the report to {path:?}", self.context);
        }

        Ok(report)
    }

    fn run_connected<T: Transport>(
        &mut self,
        store: &mut RemoteStore<T>,
        today: NaiveDate,
    ) -> Result<RunReport, RunError> {
        let root = store
            .change_directory(&self.config.remote.directory)?
            .to_string();

        // Plan
        let listing = store.list(None)?;
        let directories: Vec<&str> = listing
            .entries
            .iter()
            .filter(|entry| entry.is_dir())
            .map(|entry| entry.name.as_str())
            .collect();
        let other_names: Vec<&str> = listing
            .entries
            .iter()
            .filter(|entry| !entry.is_dir())
            .map(|entry| entry.name.as_str())
            .collect();

        let plan = RetentionPlan::compute(&directories, &other_names, today, &self.config.copies);

        self.context.current_context = "Plan";
        info!("{}New backup directory: '{}'", self.context, plan.new_directory);
        for name in &plan.to_delete {
            info!("{}Directory to remove: '{name}'", self.context);
        }

        let mut report = RunReport::new(store.is_simulating(), root, plan);

        // Rotate
        self.remove_directories(store, &mut report);

        // Upload
        store.make_directory(&report.plan.new_directory)?;
        store.change_directory(&report.plan.new_directory)?;

        let uploaded = self.upload_files(store, &mut report);
        let returned = store.change_directory("..").map(|_| ());
        uploaded?;
        returned?;

        // Report
        self.report_usage(store, &mut report)?;

        Ok(report)
    }

    fn remove_directories<T: Transport>(
        &mut self,
        store: &mut RemoteStore<T>,
        report: &mut RunReport,
    ) {
        self.context.current_context = "Rotate";

        for name in report.plan.to_delete.clone() {
            match store.remove_recursive(&name) {
                Ok(()) => {
                    info!("{}Removed '{name}'", self.context);
                    report.removed.push(name);
                }
                Err(error) => {
                    error!("{}Could not remove '{name}': {error}", self.context);
                    report.failed_removals.push(FailedRemoval {
                        name,
                        error: error.to_string(),
                    });
                }
            }
        }
    }

    fn upload_files<T: Transport>(
        &mut self,
        store: &mut RemoteStore<T>,
        report: &mut RunReport,
    ) -> Result<(), RunError> {
        self.context.current_context = "Upload";

        let files = local_files(&self.context, &self.config.local_directory)?;
        if files.is_empty() {
            warn!(
                "{}No files to back up in {:?}",
                self.context, self.config.local_directory
            );
        }

        for file in files {
            let bytes = store
                .upload_file(&file.path, Some(&file.remote_name))
                .map_err(|source| RunError::Upload {
                    file: file.path.clone(),
                    source,
                })?;

            info!(
                "{}Transferred {:?} as '{}' ({})",
                self.context,
                file.path,
                file.remote_name,
                format_size(bytes)
            );
            report.uploaded.push(UploadedFile {
                local_path: file.path,
                remote_name: file.remote_name,
                bytes,
            });
        }

        Ok(())
    }

    fn report_usage<T: Transport>(
        &mut self,
        store: &mut RemoteStore<T>,
        report: &mut RunReport,
    ) -> Result<(), RunError> {
        self.context.current_context = "Usage";

        let listing = store.list(None)?;
        for entry in &listing.entries {
            match store.disk_usage(entry, None) {
                Ok(bytes) => {
                    report.total_bytes = report.total_bytes.saturating_add(bytes);
                    report.usage.push(DiskUsage {
                        name: entry.name.clone(),
                        is_directory: entry.is_dir(),
                        bytes,
                    });
                }
                Err(error) => {
                    warn!(
                        "{}Could not get the usage of '{}': {error}",
                        self.context, entry.name
                    );
                }
            }
        }

        for row in report.usage_table() {
            info!("{}{row}", self.context);
        }

        Ok(())
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    LocalDirectory(#[from] LocalDirectoryError),

    #[error("Could not establish the remote session: {0}")]
    Connect(#[source] StoreError),

    #[error("Failed to upload {file:?}: {source}")]
    Upload {
        file: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Remote(#[from] StoreError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

impl RunError {
    /// The process exit code for the error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 3,
            Self::LocalDirectory(_) => 5,
            Self::Connect(_) => 6,
            Self::Upload { .. } => 7,
            Self::Remote(_) | Self::Report(_) => 1,
        }
    }
}
