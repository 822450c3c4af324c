//! Core logic for emerge build timing.
//!
//! This crate contains:
//! - Pattern matching: classifying emerge log messages
//! - Reconstruction: pairing build start/complete lines into timed compiles
//! - Statistics: median and average build durations per package
//! - Live correlation: elapsed time and ETA for running build workers

pub mod live;
pub mod pattern;
pub mod process;
pub mod query;
pub mod reconstruct;
pub mod stats;

pub use live::{Eta, LiveEstimate, RunningCompile, correlate};
pub use pattern::{LineKind, PackageVersion, split_package_version};
pub use process::{ProcessError, ProcessRecord, RunningBuild, running_builds, running_keys};
pub use query::{PackageHistory, QueryError, find_package, history_since};
pub use reconstruct::{
    BuildSession, CompletedCompile, LineDiagnostic, LineError, ReconstructConfig, Reconstruction,
    Reconstructor, ScanError, scan, scan_file,
};
pub use stats::{DurationHistory, Statistic, StatsError};
