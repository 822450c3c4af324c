//! Elapsed time and ETA for builds that are running right now.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::pattern::split_package_version;
use crate::process::RunningBuild;
use crate::stats::{DurationHistory, Statistic};

/// A running build joined with the log's most recent start of its package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningCompile {
    pub package_identifier: String,
    /// Bare package name (`identifier` without its version).
    pub package: String,
    pub start: DateTime<Utc>,
    pub phase: String,
}

/// Remaining time estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eta {
    /// No completed build of this package in the log.
    Unknown,
    /// Elapsed time already exceeds the expected duration.
    Imminent,
    Remaining(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveEstimate {
    pub compile: RunningCompile,
    pub elapsed: Duration,
    pub expected: Option<Duration>,
    pub eta: Eta,
}

/// Joins running builds with `latest_start`.
///
/// Builds whose identifier does not split into package and version, or whose
/// package has no start line in the log, are dropped. The result is ordered
/// by identifier, then phase, with exact duplicates removed.
pub fn join_running(
    running: &[RunningBuild],
    latest_start: &HashMap<String, DateTime<Utc>>,
) -> Vec<RunningCompile> {
    let mut compiles: Vec<RunningCompile> = running
        .iter()
        .filter_map(|build| {
            let Some(target) = split_package_version(&build.package_identifier) else {
                tracing::debug!(identifier = %build.package_identifier, "unrecognized build identifier");
                return None;
            };
            let Some(&start) = latest_start.get(&target.package) else {
                tracing::debug!(package = %target.package, "no start line for running build");
                return None;
            };
            Some(RunningCompile {
                package_identifier: build.package_identifier.clone(),
                package: target.package,
                start,
                phase: build.phase.clone(),
            })
        })
        .collect();

    compiles.sort_by(|a, b| {
        a.package_identifier
            .cmp(&b.package_identifier)
            .then_with(|| a.phase.cmp(&b.phase))
    });
    compiles.dedup();
    compiles
}

/// Computes elapsed time and ETA for one running compile.
pub fn estimate(
    compile: RunningCompile,
    history: &DurationHistory,
    statistic: Statistic,
    now: DateTime<Utc>,
) -> LiveEstimate {
    let elapsed = now - compile.start;
    let expected = history.estimate(&compile.package, statistic);
    let eta = match expected {
        None => Eta::Unknown,
        Some(expected) if expected < elapsed => Eta::Imminent,
        Some(expected) => Eta::Remaining(expected - elapsed),
    };
    LiveEstimate {
        compile,
        elapsed,
        expected,
        eta,
    }
}

/// Live status of every running build, ordered by package identifier.
pub fn correlate(
    running: &[RunningBuild],
    latest_start: &HashMap<String, DateTime<Utc>>,
    history: &DurationHistory,
    statistic: Statistic,
    now: DateTime<Utc>,
) -> Vec<LiveEstimate> {
    join_running(running, latest_start)
        .into_iter()
        .map(|compile| estimate(compile, history, statistic, now))
        .collect()
}
