//! Per-package duration statistics.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatsError {
    #[error("no durations recorded")]
    Empty,
}

/// Central tendency used to estimate a package's build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    /// Middle sample; stable under the occasional outlier build.
    #[default]
    Median,
    /// Integer mean of all samples.
    Average,
}

impl Statistic {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Median => "median",
            Self::Average => "average",
        }
    }

    /// Capitalized name for report lines ("Median duration: ...").
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Median => "Median",
            Self::Average => "Average",
        }
    }

    pub fn compute(&self, durations: &[Duration]) -> Result<Duration, StatsError> {
        match self {
            Self::Median => median(durations),
            Self::Average => average(durations),
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for unknown statistic names.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown statistic: {0} (expected median or average)")]
pub struct UnknownStatistic(String);

impl FromStr for Statistic {
    type Err = UnknownStatistic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "median" => Ok(Self::Median),
            "average" | "mean" => Ok(Self::Average),
            _ => Err(UnknownStatistic(s.to_string())),
        }
    }
}

/// Median of the samples.
///
/// With an even number of samples this does not average the two middle
/// values. It averages their *indices* with integer division, which always
/// selects the lower of the two: `[1s, 3s]` yields `1s`.
pub fn median(durations: &[Duration]) -> Result<Duration, StatsError> {
    if durations.is_empty() {
        return Err(StatsError::Empty);
    }
    let mut sorted = durations.to_vec();
    sorted.sort_unstable();

    let len = sorted.len();
    if len % 2 != 0 {
        return Ok(sorted[len / 2]);
    }
    let upper = len / 2;
    let lower = upper - 1;
    Ok(sorted[(lower + upper) / 2])
}

/// Integer mean of the samples, truncated to whole milliseconds.
pub fn average(durations: &[Duration]) -> Result<Duration, StatsError> {
    if durations.is_empty() {
        return Err(StatsError::Empty);
    }
    let total: i64 = durations.iter().map(Duration::num_milliseconds).sum();
    let count = i64::try_from(durations.len()).unwrap_or(i64::MAX);
    Ok(Duration::milliseconds(total / count))
}

/// Build durations grouped by package name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DurationHistory {
    samples: HashMap<String, Vec<Duration>>,
}

impl DurationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, package: &str, duration: Duration) {
        self.samples
            .entry(package.to_string())
            .or_default()
            .push(duration);
    }

    /// Samples recorded for a package, or `None` if it was never built.
    pub fn samples(&self, package: &str) -> Option<&[Duration]> {
        self.samples.get(package).map(Vec::as_slice)
    }

    /// Expected build time of a package, if any history exists.
    pub fn estimate(&self, package: &str, statistic: Statistic) -> Option<Duration> {
        self.samples(package)
            .and_then(|durations| statistic.compute(durations).ok())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
