//! POSIX path helpers for remote paths. Remote paths always use `/`, whatever the
//! local platform.
//!

/// Joins `path` onto `base`. An absolute `path` replaces `base` outright.
pub fn join(base: &str, path: &str) -> String {
    if path.starts_with('/') {
        return path.to_string();
    }

    if base.is_empty() {
        return path.to_string();
    }

    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Lexically resolves `.`, `..` and repeated separators. The root has no parent.
pub fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            segment => segments.push(segment),
        }
    }

    let joined = segments.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Resolves `path` against `current`, see `join` and `normalize`.
pub fn resolve(current: &str, path: &str) -> String {
    normalize(&join(current, path))
}

/// The last segment of a path.
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_path_replaces_base() {
        assert_eq!(join("/backup", "/other"), "/other");
        assert_eq!(resolve("/backup", "/other/./x"), "/other/x");
    }

    #[test]
    fn relative_path_is_resolved() {
        assert_eq!(resolve("/backup/2024-01-01_00", ".."), "/backup");
        assert_eq!(resolve("/backup/", "2024-01-01_00"), "/backup/2024-01-01_00");
        assert_eq!(resolve("/", ".."), "/");
    }

    #[test]
    fn relative_base_keeps_leading_parents() {
        assert_eq!(normalize("../a//b/."), "../a/b");
        assert_eq!(normalize("a/.."), ".");
    }

    #[test]
    fn last_segment() {
        assert_eq!(file_name("/backup/2024-01-01_00/"), "2024-01-01_00");
        assert_eq!(file_name("file.tar"), "file.tar");
    }
}
