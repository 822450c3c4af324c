//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use emt_core::Statistic;

/// Emerge build timing.
///
/// Reconstructs compile history from the emerge log and estimates how long
/// running builds have left.
#[derive(Debug, Parser)]
#[command(name = "emt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Emerge log to parse [default: /var/log/emerge.log].
    #[arg(short, long, global = true)]
    pub log: Option<PathBuf>,

    /// Statistic used for expected durations (median or average).
    #[arg(short, long, global = true)]
    pub statistic: Option<Statistic>,

    /// Discard unfinished builds whenever a new emerge run starts.
    ///
    /// A bare flag enables it; `--restart-heuristic=false` disables it even
    /// when the config file turns it on.
    #[arg(
        long,
        global = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "BOOL",
    )]
    pub restart_heuristic: Option<bool>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List completed compilations (the default).
    History {
        /// Only show compilations started at or after this time
        /// (ISO 8601 or e.g. "2 days ago").
        #[arg(long)]
        since: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show running compilations with elapsed time and ETA.
    Current {
        /// Root of the proc filesystem [default: /proc].
        #[arg(short = 'd', long)]
        proc_dir: Option<PathBuf>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the history and expected duration of one package.
    Estimate {
        /// Package name, with or without category (e.g. `bash` or `app-shells/bash`).
        package: String,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}
