//! Reconstruction of build sessions from an emerge log.
//!
//! The log is folded line by line in a single pass. Build-start lines open a
//! session keyed by `"{package}-{version}"`, build-complete lines close it
//! and record its duration. Sessions still open when the log ends are kept
//! apart so the caller can check them against live processes.
//!
//! # Limitations
//!
//! A second start line for the same key replaces the first. Concurrent emerge
//! invocations building the same package version, or a restarted run whose
//! start lines repeat, are therefore not told apart.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::num::ParseIntError;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::pattern::{self, LineKind, PackageVersion};
use crate::stats::DurationHistory;

/// Buffer size for `BufReader` (64KB; emerge logs grow to hundreds of MB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Why a single log line was skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("timestamp {token:?} has no trailing delimiter")]
    MissingDelimiter { token: String },
    #[error("invalid timestamp {token:?}: {source}")]
    InvalidTimestamp {
        token: String,
        source: ParseIntError,
    },
    #[error("timestamp {0} is out of range")]
    OutOfRange(i64),
}

/// Failure that aborts a whole scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("could not open log file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read log: {0}")]
    Io(#[from] std::io::Error),
}

/// A skipped line, reported with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiagnostic {
    pub line: usize,
    pub error: LineError,
}

/// A log line split into its timestamp and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    /// Remaining tokens joined by single spaces.
    pub message: String,
}

impl LogLine {
    /// Parses a raw line such as `1507220303:  >>> emerge (1 of 1) ...`.
    ///
    /// Returns `Ok(None)` for lines with fewer than two tokens.
    pub fn parse(line: &str) -> Result<Option<Self>, LineError> {
        let mut tokens = line.split_whitespace();
        let Some(stamp) = tokens.next() else {
            return Ok(None);
        };
        let message = tokens.collect::<Vec<_>>().join(" ");
        if message.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            timestamp: parse_timestamp(stamp)?,
            message,
        }))
    }
}

/// Parses epoch seconds followed by one non-digit delimiter (usually `:`).
fn parse_timestamp(token: &str) -> Result<DateTime<Utc>, LineError> {
    let digits = match token.chars().next_back() {
        Some(delimiter) if !delimiter.is_ascii_digit() => {
            &token[..token.len() - delimiter.len_utf8()]
        }
        _ => {
            return Err(LineError::MissingDelimiter {
                token: token.to_string(),
            });
        }
    };
    let seconds: i64 = digits
        .parse()
        .map_err(|source| LineError::InvalidTimestamp {
            token: token.to_string(),
            source,
        })?;
    DateTime::from_timestamp(seconds, 0).ok_or(LineError::OutOfRange(seconds))
}

/// A build (or removal) that has started but not yet completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildSession {
    pub package: String,
    pub version: String,
    pub start: DateTime<Utc>,
}

impl BuildSession {
    fn new(target: PackageVersion, start: DateTime<Utc>) -> Self {
        Self {
            package: target.package,
            version: target.version,
            start,
        }
    }

    /// The composite key `"{package}-{version}"`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}-{}", self.package, self.version)
    }

    fn complete(self, end: DateTime<Utc>) -> CompletedCompile {
        CompletedCompile {
            duration: end - self.start,
            package: self.package,
            version: self.version,
            start: self.start,
            end,
        }
    }
}

/// A build whose start and completion lines were both seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedCompile {
    pub package: String,
    pub version: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Always `end - start`.
    pub duration: Duration,
}

/// Options for [`Reconstructor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructConfig {
    /// Drop every in-flight build when a new emerge run starts
    /// (`>>> emerge (1 of ...`) or a run ends (`*** exiting successfully.`,
    /// `*** terminating.`). Default: off.
    pub discard_on_restart: bool,
}

/// Everything recovered from one pass over a log.
#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    /// Completed builds in log order.
    pub compiles: Vec<CompletedCompile>,
    /// Builds with no completion line, keyed by composite key.
    pub in_flight: HashMap<String, BuildSession>,
    pub durations: DurationHistory,
    /// Timestamp of the most recent build start per package name.
    pub latest_start: HashMap<String, DateTime<Utc>>,
    pub diagnostics: Vec<LineDiagnostic>,
}

impl Reconstruction {
    /// In-flight sessions whose key is in `running`, ordered by key.
    ///
    /// Sessions missing from `running` died without logging a completion
    /// (interrupted or failed builds) and are left out.
    pub fn still_running(&self, running: &HashSet<String>) -> Vec<BuildSession> {
        let mut sessions: Vec<BuildSession> = self
            .in_flight
            .iter()
            .filter(|(key, _)| running.contains(key.as_str()))
            .map(|(_, session)| session.clone())
            .collect();
        sessions.sort_by_key(BuildSession::key);
        sessions
    }
}

/// Single-pass state machine over log lines.
#[derive(Debug, Default)]
pub struct Reconstructor {
    config: ReconstructConfig,
    compiles: Vec<CompletedCompile>,
    in_flight: HashMap<String, BuildSession>,
    removals: HashMap<String, BuildSession>,
    durations: DurationHistory,
    latest_start: HashMap<String, DateTime<Utc>>,
    diagnostics: Vec<LineDiagnostic>,
}

impl Reconstructor {
    pub fn new(config: ReconstructConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Feeds one raw line. `line_number` is 1-based and only used for
    /// diagnostics.
    pub fn feed(&mut self, line_number: usize, line: &str) {
        match LogLine::parse(line) {
            Ok(Some(entry)) => self.apply(&entry),
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(line = line_number, %error, "skipping unparsable log line");
                self.diagnostics.push(LineDiagnostic {
                    line: line_number,
                    error,
                });
            }
        }
    }

    /// Applies an already parsed line.
    pub fn apply(&mut self, entry: &LogLine) {
        if self.config.discard_on_restart
            && !self.in_flight.is_empty()
            && pattern::is_restart_marker(&entry.message)
        {
            tracing::debug!(
                discarded = self.in_flight.len(),
                "emerge run boundary, discarding in-flight builds"
            );
            self.in_flight.clear();
        }

        match pattern::classify(&entry.message) {
            LineKind::BuildStart(fields) => {
                let session = BuildSession::new(fields.target, entry.timestamp);
                self.latest_start
                    .insert(session.package.clone(), entry.timestamp);
                self.in_flight.insert(session.key(), session);
            }
            LineKind::RemovalStart(target) => {
                let session = BuildSession::new(target, entry.timestamp);
                self.removals.insert(session.key(), session);
            }
            LineKind::BuildComplete(fields) => self.complete(&fields.target, entry.timestamp),
            LineKind::Unrecognized => {}
        }
    }

    fn complete(&mut self, target: &PackageVersion, end: DateTime<Utc>) {
        let key = target.key();
        if let Some(session) = self.in_flight.remove(&key) {
            let compile = session.complete(end);
            self.durations.record(&compile.package, compile.duration);
            self.compiles.push(compile);
        } else if self.removals.remove(&key).is_some() {
            tracing::trace!(%key, "completion matched a removal");
        }
    }

    pub fn finish(self) -> Reconstruction {
        Reconstruction {
            compiles: self.compiles,
            in_flight: self.in_flight,
            durations: self.durations,
            latest_start: self.latest_start,
            diagnostics: self.diagnostics,
        }
    }
}

/// Scans a whole log stream.
///
/// Invalid UTF-8 is replaced rather than rejected; only a read error aborts
/// the scan.
pub fn scan<R: BufRead>(
    mut reader: R,
    config: ReconstructConfig,
) -> Result<Reconstruction, ScanError> {
    let mut reconstructor = Reconstructor::new(config);
    let mut buf = Vec::new();
    let mut line_number = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_number += 1;
        reconstructor.feed(line_number, &String::from_utf8_lossy(&buf));
    }
    Ok(reconstructor.finish())
}

/// Opens and scans a log file.
pub fn scan_file(path: &Path, config: ReconstructConfig) -> Result<Reconstruction, ScanError> {
    let file = File::open(path).map_err(|source| ScanError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reconstruction = scan(BufReader::with_capacity(BUFFER_SIZE, file), config)?;
    tracing::debug!(
        path = %path.display(),
        compiles = reconstruction.compiles.len(),
        in_flight = reconstruction.in_flight.len(),
        skipped = reconstruction.diagnostics.len(),
        "scanned emerge log"
    );
    Ok(reconstruction)
}
