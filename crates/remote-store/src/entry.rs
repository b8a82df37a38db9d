//! Remote directory listing entries.
//!

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use thiserror::Error;

use crate::{Permissions, PermissionsError, permissions::MODE_DIRECTORY};

// `drwxr-xr-x 2 user group 4096 Mar 01 12:34 name`
static LISTING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\S{10})[+@.]?\s+(\d+)\s+(\S+)\s+(\S+)\s+(\d+)\s+([A-Za-z]{3})\s+(\d{1,2})\s+(\d{4}|\d{1,2}:\d{2})\s+(.+?)\s*$",
    )
    .expect("listing line pattern is valid")
});

/// What kind of entry a path is, as reported by a single stat call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A directory.
    Directory,

    /// A regular file, or anything that can be deleted like one.
    File,

    /// The remote could not tell.
    Unknown,
}

/// The result of a stat call on the remote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteStat {
    /// The kind of entry.
    pub kind: EntryKind,

    /// The size in bytes.
    pub size: u64,

    /// The permission bits, if the remote reported them.
    pub permissions: Option<Permissions>,

    /// The owner, if the remote reported one.
    pub owner: Option<String>,

    /// The group, if the remote reported one.
    pub group: Option<String>,

    /// The modification time in UTC, if the remote reported one.
    pub modified: Option<NaiveDateTime>,
}

impl RemoteStat {
    /// A stat result carrying only a kind and size.
    pub fn new(kind: EntryKind, size: u64) -> Self {
        Self {
            kind,
            size,
            permissions: None,
            owner: None,
            group: None,
            modified: None,
        }
    }
}

/// One row of a remote directory listing.
///
/// Entries are built fresh on every listing and never cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteDirEntry {
    /// The base name of the entry.
    pub name: String,

    /// The permission bits, including the directory flag.
    pub permissions: Permissions,

    /// The owner.
    pub owner: String,

    /// The group.
    pub group: String,

    /// The size in bytes. For directories this is what the listing reported, not the
    /// size of the tree, see `RemoteStore::disk_usage`.
    pub size: u64,

    /// The modification time in UTC.
    pub modified: Option<NaiveDateTime>,
}

impl RemoteDirEntry {
    /// If the entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.permissions.is_dir()
    }

    /// If the entry is `.` or `..`.
    pub fn is_navigation(&self) -> bool {
        is_navigation_name(&self.name)
    }

    /// Parses one line of a long format listing, assuming the current UTC year for
    /// timestamps that carry a time of day instead of a year.
    pub fn parse_line(line: &str) -> Result<Self, ListingParseError> {
        Self::parse_line_in_year(line, Utc::now().year())
    }

    /// Parses one line of a long format listing.
    ///
    /// Timestamps are tried as `Mon DD YYYY` first, then as `Mon DD HH:MM` in
    /// `current_year`. Listings show the time of day for entries younger than about six
    /// months, so entries from late last year can be misattributed to this year.
    pub fn parse_line_in_year(line: &str, current_year: i32) -> Result<Self, ListingParseError> {
        let captures = LISTING_LINE
            .captures(line)
            .ok_or_else(|| ListingParseError::Shape(line.to_string()))?;
        let field = |index: usize| captures.get(index).map_or("", |capture| capture.as_str());

        let permissions: Permissions = field(1)
            .parse()
            .map_err(|source| ListingParseError::Permissions {
                line: line.to_string(),
                source,
            })?;

        let size = field(5)
            .parse()
            .map_err(|_| ListingParseError::Size(line.to_string()))?;

        let modified = parse_timestamp(field(6), field(7), field(8), current_year)
            .ok_or_else(|| ListingParseError::Timestamp(line.to_string()))?;

        Ok(Self {
            name: field(9).to_string(),
            permissions,
            owner: field(3).to_string(),
            group: field(4).to_string(),
            size,
            modified: Some(modified),
        })
    }

    /// Builds an entry from a stat result.
    pub fn from_stat(name: impl Into<String>, stat: RemoteStat) -> Self {
        let permissions = match (stat.permissions, stat.kind) {
            (Some(permissions), _) => permissions,
            (None, EntryKind::Directory) => Permissions::from_mode(MODE_DIRECTORY | 0o755),
            (None, _) => Permissions::from_mode(0o644),
        };

        Self {
            name: name.into(),
            permissions,
            owner: stat.owner.unwrap_or_default(),
            group: stat.group.unwrap_or_default(),
            size: stat.size,
            modified: stat.modified,
        }
    }
}

/// If a name is `.` or `..`.
pub fn is_navigation_name(name: &str) -> bool {
    name == "." || name == ".."
}

fn parse_timestamp(
    month: &str,
    day: &str,
    year_or_time: &str,
    current_year: i32,
) -> Option<NaiveDateTime> {
    let with_year = format!("{month} {day:0>2} {year_or_time}");
    if let Ok(date) = NaiveDate::parse_from_str(&with_year, "%b %d %Y") {
        return date.and_hms_opt(0, 0, 0);
    }

    let with_time = format!("{current_year} {month} {day:0>2} {year_or_time:0>5}");
    NaiveDateTime::parse_from_str(&with_time, "%Y %b %d %H:%M").ok()
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ListingParseError {
    #[error("Listing line does not have the expected shape: '{0}'")]
    Shape(String),

    #[error("Listing line '{line}' has invalid permissions: {source}")]
    Permissions {
        line: String,
        #[source]
        source: PermissionsError,
    },

    #[error("Listing line has an invalid size: '{0}'")]
    Size(String),

    #[error("Listing line has an invalid timestamp: '{0}'")]
    Timestamp(String),
}
