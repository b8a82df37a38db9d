use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Serialize;
use thiserror::Error;

use crate::RetentionPlan;

const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

/// Renders a byte count with binary units and two decimals, e.g. `1.50 KiB`.
pub fn format_size(bytes: u64) -> String {
    let mut unit_size: u64 = 1;
    let mut unit = "B";
    for name in UNITS {
        if bytes / unit_size < 1024 {
            break;
        }
        unit_size *= 1024;
        unit = name;
    }

    if unit_size == 1 {
        return format!("{bytes} {unit}");
    }

    let whole = bytes / unit_size;
    let hundredths = (bytes % unit_size).saturating_mul(100) / unit_size;
    format!("{whole}.{hundredths:02} {unit}")
}

/// A file uploaded in a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    /// The local path.
    pub local_path: PathBuf,

    /// The name on the remote.
    pub remote_name: String,

    /// The bytes transferred.
    pub bytes: u64,
}

/// A directory that could not be removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailedRemoval {
    /// The directory name.
    pub name: String,

    /// Why it failed.
    pub error: String,
}

/// The disk usage of one entry of the remote root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiskUsage {
    /// The entry name.
    pub name: String,

    /// If the entry is a directory.
    pub is_directory: bool,

    /// The total size of the entry.
    pub bytes: u64,
}

/// What a run did, or would have done when simulating.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// If nothing was changed on the remote.
    pub simulate: bool,

    /// The absolute remote root.
    pub remote_directory: String,

    /// The retention decisions.
    pub plan: RetentionPlan,

    /// Directories removed.
    pub removed: Vec<String>,

    /// Directories that could not be removed.
    pub failed_removals: Vec<FailedRemoval>,

    /// Files uploaded, in order.
    pub uploaded: Vec<UploadedFile>,

    /// The usage of every entry of the remote root after the run.
    pub usage: Vec<DiskUsage>,

    /// The sum of `usage`.
    pub total_bytes: u64,
}

impl RunReport {
    /// An empty report for a plan.
    pub fn new(simulate: bool, remote_directory: String, plan: RetentionPlan) -> Self {
        Self {
            simulate,
            remote_directory,
            plan,
            removed: Vec::new(),
            failed_removals: Vec::new(),
            uploaded: Vec::new(),
            usage: Vec::new(),
            total_bytes: 0,
        }
    }

    /// The usage as table rows, one per entry, then the total.
    pub fn usage_table(&self) -> Vec<String> {
        let width = self
            .usage
            .iter()
            .map(|usage| usage.name.len())
            .max()
            .unwrap_or(0)
            .max("Total".len());

        let mut rows: Vec<String> = self
            .usage
            .iter()
            .map(|usage| {
                let suffix = if usage.is_directory { "/" } else { "" };
                format!(
                    "{:<width$} {:>12}",
                    format!("{}{suffix}", usage.name),
                    format_size(usage.bytes),
                    width = width + 1
                )
            })
            .collect();

        rows.push(format!(
            "{:<width$} {:>12}",
            "Total",
            format_size(self.total_bytes),
            width = width + 1
        ));

        rows
    }

    /// Write the report as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), ReportError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents).map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to serialize the report:\n{0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write the report to {path:?}:\n{source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.00 KiB");
        assert_eq!(format_size(1536), "1.50 KiB");
        assert_eq!(format_size(5 * 1024 * 1024 + 1024 * 1024 / 4), "5.25 MiB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GiB");
        assert_eq!(format_size(2048 * 1024 * 1024 * 1024 * 1024), "2048.00 TiB");
    }
}
