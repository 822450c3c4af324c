//! Lookups over reconstructed build history.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::reconstruct::CompletedCompile;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("found no compilations matching {pattern}")]
    NotFound { pattern: String },
}

/// Completed builds of a single package, in log order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageHistory<'a> {
    /// Full package name the query resolved to.
    pub package: String,
    pub compiles: Vec<&'a CompletedCompile>,
}

/// Compiles that started at or after `since` (all of them for `None`).
pub fn history_since(
    compiles: &[CompletedCompile],
    since: Option<DateTime<Utc>>,
) -> Vec<&CompletedCompile> {
    compiles
        .iter()
        .filter(|compile| since.is_none_or(|since| compile.start >= since))
        .collect()
}

/// Returns true if `pattern` names `package` fully (`app-shells/bash`) or by
/// its bare name (`bash`).
pub fn package_matches(package: &str, pattern: &str) -> bool {
    if package == pattern {
        return true;
    }
    matches!(package.split_once('/'), Some((_, name)) if !name.contains('/') && name == pattern)
}

/// Finds the build history of the package named by `pattern`.
///
/// The first compile matching `pattern` fixes the full package name. After
/// that only exact full-name matches count, so `bash` never mixes
/// `app-shells/bash` with a later `dev-util/bash`.
pub fn find_package<'a>(
    compiles: &'a [CompletedCompile],
    pattern: &str,
) -> Result<PackageHistory<'a>, QueryError> {
    let not_found = || QueryError::NotFound {
        pattern: pattern.to_string(),
    };
    let first = compiles
        .iter()
        .find(|compile| package_matches(&compile.package, pattern))
        .ok_or_else(not_found)?;

    let package = first.package.clone();
    let compiles = compiles
        .iter()
        .filter(|compile| compile.package == package)
        .collect();
    Ok(PackageHistory { package, compiles })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn compile(package: &str, start: i64, secs: i64) -> CompletedCompile {
        let start = DateTime::from_timestamp(start, 0).unwrap();
        CompletedCompile {
            package: package.to_string(),
            version: "1.0".to_string(),
            start,
            end: start + Duration::seconds(secs),
            duration: Duration::seconds(secs),
        }
    }

    #[test]
    fn test_package_matches_full_and_bare_names() {
        assert!(package_matches("app-shells/bash", "app-shells/bash"));
        assert!(package_matches("app-shells/bash", "bash"));
        assert!(!package_matches("app-shells/bash", "ba"));
        assert!(!package_matches("app-shells/bash", "shells/bash"));
        assert!(!package_matches("a/b/c", "c"));
    }

    #[test]
    fn test_find_package_pins_first_match() {
        let compiles = vec![
            compile("app-shells/bash", 10, 50),
            compile("dev-util/bash", 20, 5),
            compile("app-shells/zsh", 30, 40),
            compile("app-shells/bash", 40, 70),
        ];

        let history = find_package(&compiles, "bash").unwrap();
        assert_eq!(history.package, "app-shells/bash");
        let starts: Vec<i64> = history
            .compiles
            .iter()
            .map(|c| c.start.timestamp())
            .collect();
        assert_eq!(starts, [10, 40]);
    }

    #[test]
    fn test_find_package_reports_not_found() {
        let compiles = vec![compile("app-shells/bash", 10, 50)];

        let err = find_package(&compiles, "zsh").unwrap_err();
        assert_eq!(
            err,
            QueryError::NotFound {
                pattern: "zsh".to_string()
            }
        );
        assert_eq!(err.to_string(), "found no compilations matching zsh");
        assert!(find_package(&[], "bash").is_err());
    }

    #[test]
    fn test_history_since_filters_by_start() {
        let compiles = vec![
            compile("a/x", 10, 1),
            compile("a/y", 20, 1),
            compile("a/z", 30, 1),
        ];

        assert_eq!(history_since(&compiles, None).len(), 3);
        let since = DateTime::from_timestamp(20, 0);
        let packages: Vec<&str> = history_since(&compiles, since)
            .iter()
            .map(|c| c.package.as_str())
            .collect();
        assert_eq!(packages, ["a/y", "a/z"]);
    }
}
