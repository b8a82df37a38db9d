use std::collections::BTreeSet;

use chrono::{Datelike, Weekday};
use serde::Serialize;

use super::{RetentionClass, compare_names, directory_date};

/// The members of every retention class, each sorted oldest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    #[allow(missing_docs)]
    pub yearly: Vec<String>,
    #[allow(missing_docs)]
    pub monthly: Vec<String>,
    #[allow(missing_docs)]
    pub weekly: Vec<String>,
    #[allow(missing_docs)]
    pub daily: Vec<String>,
    #[allow(missing_docs)]
    pub other: Vec<String>,
}

impl Classification {
    /// The members of a class, oldest first.
    pub fn members(&self, class: RetentionClass) -> &[String] {
        match class {
            RetentionClass::Yearly => &self.yearly,
            RetentionClass::Monthly => &self.monthly,
            RetentionClass::Weekly => &self.weekly,
            RetentionClass::Daily => &self.daily,
            RetentionClass::Other => &self.other,
        }
    }

    pub(super) fn members_mut(&mut self, class: RetentionClass) -> &mut Vec<String> {
        match class {
            RetentionClass::Yearly => &mut self.yearly,
            RetentionClass::Monthly => &mut self.monthly,
            RetentionClass::Weekly => &mut self.weekly,
            RetentionClass::Daily => &mut self.daily,
            RetentionClass::Other => &mut self.other,
        }
    }

    /// Every name held by a protecting class.
    pub fn protected(&self) -> BTreeSet<&str> {
        RetentionClass::PROTECTING
            .into_iter()
            .flat_map(|class| self.members(class))
            .map(String::as_str)
            .collect()
    }
}

/// The classes a single name belongs to.
///
/// A name without a valid leading date is only `Other`. A dated name is always `Daily`,
/// and additionally `Yearly`, `Monthly` or `Weekly` depending on its date.
pub fn classes_of(name: &str) -> Vec<RetentionClass> {
    let Some(date) = directory_date(name) else {
        return vec![RetentionClass::Other];
    };

    let mut classes = Vec::with_capacity(4);
    if date.month() == 1 && date.day() == 1 {
        classes.push(RetentionClass::Yearly);
    }
    if date.day() == 1 {
        classes.push(RetentionClass::Monthly);
    }
    if date.weekday() == Weekday::Sun {
        classes.push(RetentionClass::Weekly);
    }
    classes.push(RetentionClass::Daily);

    classes
}

/// Sorts names into their retention classes. Duplicates are ignored and the result does
/// not depend on the order of `names`.
pub fn classify<'a>(names: impl IntoIterator<Item = &'a str>) -> Classification {
    let mut classification = Classification::default();

    let names: BTreeSet<&str> = names.into_iter().collect();
    for name in names {
        for class in classes_of(name) {
            classification.members_mut(class).push(name.to_string());
        }
    }

    for class in RetentionClass::PROTECTING
        .into_iter()
        .chain([RetentionClass::Other])
    {
        classification
            .members_mut(class)
            .sort_by(|a, b| compare_names(a, b));
    }

    classification
}
