use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use emt_cli::commands::{current, estimate, history, util};
use emt_cli::{Cli, Commands, Config};
use emt_core::{QueryError, Reconstruction, process};

/// Exit code when a queried package has no recorded compilations.
const EXIT_NOT_FOUND: u8 = 2;

/// Load config, apply command-line overrides and scan the emerge log.
fn load(cli: &Cli) -> Result<(Reconstruction, Config)> {
    let config = Config::load_from(cli.config.as_deref())
        .context("failed to load configuration")?
        .with_cli_overrides(cli);
    tracing::debug!(?config, "loaded configuration");

    let reconstruction = emt_core::scan_file(&config.log_path, config.reconstruct_config())?;
    Ok((reconstruction, config))
}

fn run(cli: &Cli) -> Result<()> {
    let (reconstruction, config) = load(cli)?;
    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Some(Commands::History { since, json }) => {
            let since = since
                .as_deref()
                .map(|s| util::parse_datetime(s, Utc::now()))
                .transpose()?;
            history::run(&mut stdout, &reconstruction, since, *json)?;
        }
        Some(Commands::Current { proc_dir, json }) => {
            let proc_dir = proc_dir.as_deref().unwrap_or(config.proc_dir.as_path());
            let records = process::snapshot(proc_dir)?;
            let builds = process::running_builds(&records);
            current::run(
                &mut stdout,
                &reconstruction,
                &builds,
                config.statistic,
                Utc::now(),
                *json,
            )?;
        }
        Some(Commands::Estimate { package, json }) => {
            estimate::run(
                &mut stdout,
                &reconstruction,
                package,
                config.statistic,
                *json,
            )?;
        }
        None => {
            // No subcommand: show the full history
            history::run(&mut stdout, &reconstruction, None, false)?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support; diagnostics go to stderr
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.downcast_ref::<QueryError>().is_some() => {
            eprintln!("{err}");
            ExitCode::from(EXIT_NOT_FOUND)
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
