//! Snapshot of running emerge build processes.
//!
//! Portage renames its sandboxed build workers so that `argv[0]` reads
//! `[category/package-version] sandbox`. The final argument is the ebuild
//! helper command line, whose last word is the current phase (`compile`,
//! `install`, ...).

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Suffix identifying a build worker from its first argument.
pub const SANDBOX_MARKER: &str = "sandbox";

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("could not list processes in {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One process from the process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub pid: u32,
    pub argv: Vec<String>,
}

/// Reads `<proc_root>/<pid>/cmdline` for every numeric entry.
///
/// Processes that exit while the table is being read, or whose command line
/// cannot be read, are skipped.
pub fn snapshot(proc_root: &Path) -> Result<Vec<ProcessRecord>, ProcessError> {
    let entries = fs::read_dir(proc_root).map_err(|source| ProcessError::ReadDir {
        path: proc_root.to_path_buf(),
        source,
    })?;

    let mut records = Vec::new();
    for entry in entries.flatten() {
        let Some(pid) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<u32>().ok())
        else {
            continue;
        };
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        match fs::read(path.join("cmdline")) {
            Ok(data) => records.push(ProcessRecord {
                pid,
                argv: split_cmdline(&data),
            }),
            Err(e) => {
                tracing::debug!(pid, error = %e, "skipping process with unreadable cmdline");
            }
        }
    }

    records.sort_by_key(|record| record.pid);
    Ok(records)
}

/// Splits a NUL-separated command line, dropping empty items.
fn split_cmdline(data: &[u8]) -> Vec<String> {
    data.split(|&b| b == 0)
        .filter(|arg| !arg.is_empty())
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect()
}

/// A build worker currently executing an ebuild phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunningBuild {
    /// `category/package-version`, the same form as a composite key.
    pub package_identifier: String,
    pub phase: String,
}

impl RunningBuild {
    /// Recognizes a sandboxed build worker from its argument vector.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let [first, .., last] = argv else {
            return None;
        };
        let bracketed = first.strip_prefix('[')?;
        if !first.ends_with(SANDBOX_MARKER) {
            return None;
        }
        let package_identifier = bracketed.split(']').next().unwrap_or_default();
        let phase = last.split(' ').next_back().unwrap_or_default();
        Some(Self {
            package_identifier: package_identifier.to_string(),
            phase: phase.to_string(),
        })
    }
}

/// Build workers among the given processes, in process order.
pub fn running_builds(records: &[ProcessRecord]) -> Vec<RunningBuild> {
    records
        .iter()
        .filter_map(|record| RunningBuild::from_argv(&record.argv))
        .collect()
}

/// Composite keys of running builds, for [`Reconstruction::still_running`].
///
/// [`Reconstruction::still_running`]: crate::Reconstruction::still_running
pub fn running_keys(builds: &[RunningBuild]) -> HashSet<String> {
    builds
        .iter()
        .map(|build| build.package_identifier.clone())
        .collect()
}
