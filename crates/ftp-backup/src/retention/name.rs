use std::{collections::HashSet, sync::LazyLock};

use chrono::NaiveDate;
use regex::Regex;

static DATE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})[-_](\d{2})[-_](\d{2})").expect("date prefix pattern is valid")
});

/// The date a directory name starts with, if it starts with a valid calendar date.
pub fn directory_date(name: &str) -> Option<NaiveDate> {
    let captures = DATE_PREFIX.captures(name)?;

    let year = captures.get(1)?.as_str().parse().ok()?;
    let month = captures.get(2)?.as_str().parse().ok()?;
    let day = captures.get(3)?.as_str().parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// The name for a new backup directory on `today`: `YYYY-MM-DD_NN` with the smallest
/// sequence number not taken by `existing`.
pub fn next_directory_name<'a>(
    existing: impl IntoIterator<Item = &'a str>,
    today: NaiveDate,
) -> String {
    let existing: HashSet<&str> = existing.into_iter().collect();
    let template = today.format("%Y-%m-%d_").to_string();

    let mut sequence: u64 = 0;
    loop {
        let candidate = format!("{template}{sequence:02}");
        if !existing.contains(candidate.as_str()) {
            return candidate;
        }
        sequence += 1;
    }
}
