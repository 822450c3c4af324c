//! Current command: running compilations with elapsed time and ETA.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use emt_core::{
    BuildSession, Eta, LiveEstimate, Reconstruction, RunningBuild, Statistic, correlate,
    running_keys,
};
use serde::Serialize;

use super::util::{format_duration, format_eta};

#[derive(Debug, Serialize)]
struct RunningRecord<'a> {
    package: &'a str,
    phase: &'a str,
    start: DateTime<Utc>,
    elapsed_secs: i64,
    expected_secs: Option<i64>,
    eta_secs: Option<i64>,
    eta: &'static str,
}

impl<'a> From<&'a LiveEstimate> for RunningRecord<'a> {
    fn from(live: &'a LiveEstimate) -> Self {
        let (eta, eta_secs) = match live.eta {
            Eta::Unknown => ("unknown", None),
            Eta::Imminent => ("imminent", Some(0)),
            Eta::Remaining(d) => ("remaining", Some(d.num_seconds())),
        };
        Self {
            package: &live.compile.package_identifier,
            phase: &live.compile.phase,
            start: live.compile.start,
            elapsed_secs: live.elapsed.num_seconds(),
            expected_secs: live.expected.map(|d| d.num_seconds()),
            eta_secs,
            eta,
        }
    }
}

#[derive(Debug, Serialize)]
struct CurrentOutput<'a> {
    running: Vec<RunningRecord<'a>>,
    /// Unfinished log sessions confirmed by a live build process.
    in_flight: Vec<BuildSession>,
}

pub fn run<W: Write>(
    writer: &mut W,
    reconstruction: &Reconstruction,
    builds: &[RunningBuild],
    statistic: Statistic,
    now: DateTime<Utc>,
    json: bool,
) -> Result<()> {
    let in_flight = reconstruction.still_running(&running_keys(builds));
    for session in &in_flight {
        tracing::debug!(key = %session.key(), start = %session.start, "build still running");
    }

    let estimates = correlate(
        builds,
        &reconstruction.latest_start,
        &reconstruction.durations,
        statistic,
        now,
    );

    if json {
        let output = CurrentOutput {
            running: estimates.iter().map(RunningRecord::from).collect(),
            in_flight,
        };
        let json = serde_json::to_string_pretty(&output).context("failed to serialize status")?;
        writeln!(writer, "{json}")?;
        return Ok(());
    }

    if estimates.is_empty() {
        writeln!(writer, "No compilations currently running.")?;
        return Ok(());
    }
    write_table(writer, &estimates)
}

fn write_table<W: Write>(writer: &mut W, estimates: &[LiveEstimate]) -> Result<()> {
    let width = estimates
        .iter()
        .map(|live| live.compile.package_identifier.len())
        .max()
        .unwrap_or(0)
        .max("Package".len());

    writeln!(
        writer,
        "{:<width$} {:>10} {:>10} ETA",
        "Package", "Phase", "Elapsed"
    )?;
    for live in estimates {
        writeln!(
            writer,
            "{:<width$} {:>10} {:>10} {}",
            live.compile.package_identifier,
            live.compile.phase,
            format_duration(live.elapsed),
            format_eta(live.eta)
        )?;
    }
    Ok(())
}
