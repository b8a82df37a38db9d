use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use super::{
    Classification, RetentionClass, RetentionPolicy, classify, compare_names, next_directory_name,
};

/// Shrinks every protecting class to its quota by evicting its oldest members. Returns
/// the evicted names per class. Nothing is deleted here.
pub fn enforce_quotas(
    classification: &mut Classification,
    policy: &RetentionPolicy,
) -> Vec<(RetentionClass, String)> {
    let mut evicted = Vec::new();

    for class in RetentionClass::PROTECTING {
        let Some(quota) = policy.quota(class) else {
            continue;
        };

        let members = classification.members_mut(class);
        let excess = members.len().saturating_sub(quota);
        evicted.extend(members.drain(..excess).map(|name| (class, name)));
    }

    evicted
}

/// The outcome of one retention pass over a remote root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RetentionPlan {
    /// The directory this run creates.
    pub new_directory: String,

    /// Every directory considered, including the new one, sorted.
    pub candidates: Vec<String>,

    /// The members of each class that survive their quota.
    pub kept: Classification,

    /// The candidates no class protects, sorted.
    pub to_delete: Vec<String>,
}

impl RetentionPlan {
    /// Plans a run on `today`.
    ///
    /// `directories` are the existing backup directories of the remote root, the only
    /// names that may be deleted. `other_names` are the remaining entries of the root,
    /// which only take part in choosing a free name for the new directory.
    pub fn compute(
        directories: &[&str],
        other_names: &[&str],
        today: NaiveDate,
        policy: &RetentionPolicy,
    ) -> Self {
        let new_directory = next_directory_name(
            directories.iter().chain(other_names).copied(),
            today,
        );

        let mut candidates: Vec<String> = directories
            .iter()
            .copied()
            .chain([new_directory.as_str()])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        candidates.sort_by(|a, b| compare_names(a, b));

        let mut kept = classify(candidates.iter().map(String::as_str));
        enforce_quotas(&mut kept, policy);

        // The new directory is always kept, even when other names outrank it.
        if !kept.daily.contains(&new_directory) {
            kept.daily.push(new_directory.clone());
            kept.daily.sort_by(|a, b| compare_names(a, b));
        }

        let protected = kept.protected();
        let to_delete = candidates
            .iter()
            .filter(|name| !protected.contains(name.as_str()))
            .cloned()
            .collect();

        Self {
            new_directory,
            candidates,
            kept,
            to_delete,
        }
    }

    /// If the plan keeps a name.
    pub fn keeps(&self, name: &str) -> bool {
        self.kept.protected().contains(name)
    }
}
