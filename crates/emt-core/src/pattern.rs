//! Line classification for emerge log messages.
//!
//! Each message (the log line with its timestamp token removed) belongs to at
//! most one category. The categories start with distinct literal prefixes, so
//! a line can never match two of them.

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

/// Package atom: category/name path characters.
const PACKAGE: &str = r"(?P<package>[A-Za-z0-9/_-]+)";

/// Version: a digit followed by any run of non-space characters.
const VERSION: &str = r"(?P<version>\d[^ ]*)";

static BUILD_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r">>> emerge \((?P<index>\d+) of (?P<total>\d+)\) {PACKAGE}-{VERSION} to /"
    ))
    .unwrap()
});

static BUILD_COMPLETE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"::: completed emerge \((?P<index>\d+) of (?P<total>\d+)\) {PACKAGE}-{VERSION} to /"
    ))
    .unwrap()
});

static REMOVAL_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"=== Unmerging\.\.\. \({PACKAGE}-(?P<version>\d.*)\)"
    ))
    .unwrap()
});

/// Portage restarting from a clean state (e.g. `--keep-going` recovery).
static RESTART_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">>> emerge \(1 of ").unwrap());

static SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{PACKAGE}-{VERSION}$")).unwrap());

/// Messages emitted when an emerge run ends.
const RUN_END_MESSAGES: &[&str] = &["*** exiting successfully.", "*** terminating."];

/// A package name paired with one of its versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PackageVersion {
    /// Full package name, e.g. `app-shells/bash`.
    pub package: String,
    /// Version string, e.g. `4.4_p12`.
    pub version: String,
}

impl PackageVersion {
    pub fn new(package: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            version: version.into(),
        }
    }

    /// The composite key `"{package}-{version}"` correlating start and end lines.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }

    fn from_captures(caps: &Captures<'_>) -> Self {
        Self::new(&caps["package"], &caps["version"])
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.package, self.version)
    }
}

/// Fields of a `>>> emerge` or `::: completed emerge` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLineFields {
    /// Position of this package in the merge list (1-based).
    pub index: u32,
    /// Length of the merge list.
    pub total: u32,
    pub target: PackageVersion,
}

impl BuildLineFields {
    fn from_captures(caps: &Captures<'_>) -> Option<Self> {
        Some(Self {
            index: caps["index"].parse().ok()?,
            total: caps["total"].parse().ok()?,
            target: PackageVersion::from_captures(caps),
        })
    }
}

/// Category of a log message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    BuildStart(BuildLineFields),
    BuildComplete(BuildLineFields),
    RemovalStart(PackageVersion),
    Unrecognized,
}

/// Classifies a log message.
pub fn classify(message: &str) -> LineKind {
    if let Some(caps) = BUILD_START_RE.captures(message) {
        return BuildLineFields::from_captures(&caps)
            .map_or(LineKind::Unrecognized, LineKind::BuildStart);
    }
    if let Some(caps) = BUILD_COMPLETE_RE.captures(message) {
        return BuildLineFields::from_captures(&caps)
            .map_or(LineKind::Unrecognized, LineKind::BuildComplete);
    }
    if let Some(caps) = REMOVAL_START_RE.captures(message) {
        return LineKind::RemovalStart(PackageVersion::from_captures(&caps));
    }
    LineKind::Unrecognized
}

/// Returns true if the message marks the start or end of an emerge run.
pub fn is_restart_marker(message: &str) -> bool {
    RUN_END_MESSAGES.contains(&message) || RESTART_RE.is_match(message)
}

/// Splits a composite key such as `app-shells/bash-4.4_p12` into its parts.
///
/// The version begins at the last `-<digit>` boundary that still leaves a
/// valid package name in front of it, the same split the build line
/// patterns produce.
pub fn split_package_version(key: &str) -> Option<PackageVersion> {
    SPLIT_RE
        .captures(key)
        .map(|caps| PackageVersion::from_captures(&caps))
}
