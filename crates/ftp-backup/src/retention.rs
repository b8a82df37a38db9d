//! Grandfather-father-son rotation of dated backup directories.
//!
//! Backup directories are named `YYYY-MM-DD_NN`. The names sort chronologically, so "the
//! most recent N" of a class are simply the N greatest names.
//!

use core::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

mod classify;
mod name;
mod prune;

pub use classify::{Classification, classes_of, classify};
pub use name::{directory_date, next_directory_name};
pub use prune::{RetentionPlan, enforce_quotas};

/// A retention bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionClass {
    /// Dated the first of January.
    Yearly,

    /// Dated the first of a month.
    Monthly,

    /// Dated a Sunday.
    Weekly,

    /// Every dated directory.
    Daily,

    /// Not a dated directory. Never protected.
    Other,
}

impl RetentionClass {
    /// The classes that protect their members, up to a quota.
    pub const PROTECTING: [Self; 4] = [Self::Yearly, Self::Monthly, Self::Weekly, Self::Daily];
}

impl fmt::Display for RetentionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Yearly => "yearly",
            Self::Monthly => "monthly",
            Self::Weekly => "weekly",
            Self::Daily => "daily",
            Self::Other => "other",
        };

        write!(f, "{name}")
    }
}

/// How many of the most recent directories of each class to keep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    #[allow(missing_docs)]
    pub yearly: usize,
    #[allow(missing_docs)]
    pub monthly: usize,
    #[allow(missing_docs)]
    pub weekly: usize,
    #[allow(missing_docs)]
    pub daily: usize,
}

impl RetentionPolicy {
    /// The quota of a class, `None` for `Other`.
    pub fn quota(&self, class: RetentionClass) -> Option<usize> {
        match class {
            RetentionClass::Yearly => Some(self.yearly),
            RetentionClass::Monthly => Some(self.monthly),
            RetentionClass::Weekly => Some(self.weekly),
            RetentionClass::Daily => Some(self.daily),
            RetentionClass::Other => None,
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            yearly: 2,
            monthly: 2,
            weekly: 2,
            daily: 2,
        }
    }
}

/// Orders directory names case-insensitively, falling back to the exact name so the
/// order is total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    folded(a).cmp(folded(b)).then_with(|| a.cmp(b))
}

fn folded(name: &str) -> impl Iterator<Item = char> + '_ {
    name.chars().flat_map(char::to_lowercase)
}
