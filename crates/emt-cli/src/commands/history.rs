//! History command: completed compilations in log order.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use emt_core::{CompletedCompile, Reconstruction, history_since};
use serde::Serialize;

use super::util::{CompileRecord, format_compile};

#[derive(Debug, Serialize)]
struct HistoryOutput<'a> {
    compiles: Vec<CompileRecord<'a>>,
    total: usize,
}

pub fn run<W: Write>(
    writer: &mut W,
    reconstruction: &Reconstruction,
    since: Option<DateTime<Utc>>,
    json: bool,
) -> Result<()> {
    let compiles = history_since(&reconstruction.compiles, since);
    if json {
        let output = HistoryOutput {
            total: compiles.len(),
            compiles: compiles.into_iter().map(CompileRecord::from).collect(),
        };
        let json = serde_json::to_string_pretty(&output).context("failed to serialize history")?;
        writeln!(writer, "{json}")?;
        return Ok(());
    }
    write_history(writer, &compiles)
}

/// Writes one line per compile followed by the total.
pub fn write_history<W: Write>(writer: &mut W, compiles: &[&CompletedCompile]) -> Result<()> {
    for compile in compiles {
        writeln!(writer, "{}", format_compile(compile))?;
    }
    writeln!(writer, "Total number of compilations: {}", compiles.len())?;
    Ok(())
}
