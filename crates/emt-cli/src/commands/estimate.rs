//! Estimate command: one package's history and expected duration.

use std::io::Write;

use anyhow::{Context, Result};
use emt_core::{Reconstruction, Statistic, find_package};
use serde::Serialize;

use super::history::write_history;
use super::util::{CompileRecord, format_duration};

#[derive(Debug, Serialize)]
struct EstimateOutput<'a> {
    package: &'a str,
    statistic: Statistic,
    expected_secs: i64,
    compiles: Vec<CompileRecord<'a>>,
}

/// Prints the history of the package matching `pattern`.
///
/// Returns [`emt_core::QueryError::NotFound`] when no compile matches.
pub fn run<W: Write>(
    writer: &mut W,
    reconstruction: &Reconstruction,
    pattern: &str,
    statistic: Statistic,
    json: bool,
) -> Result<()> {
    let history = find_package(&reconstruction.compiles, pattern)?;
    let samples = reconstruction
        .durations
        .samples(&history.package)
        .unwrap_or_default();
    let expected = statistic
        .compute(samples)
        .with_context(|| format!("no durations recorded for {}", history.package))?;

    if json {
        let output = EstimateOutput {
            package: &history.package,
            statistic,
            expected_secs: expected.num_seconds(),
            compiles: history
                .compiles
                .iter()
                .copied()
                .map(CompileRecord::from)
                .collect(),
        };
        let json = serde_json::to_string_pretty(&output).context("failed to serialize estimate")?;
        writeln!(writer, "{json}")?;
        return Ok(());
    }

    write_history(writer, &history.compiles)?;
    writeln!(
        writer,
        "{} duration: {}",
        statistic.label(),
        format_duration(expected)
    )?;
    Ok(())
}
