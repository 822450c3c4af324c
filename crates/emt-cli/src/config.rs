//! Configuration loading and management.

use std::path::{Path, PathBuf};

use emt_core::{ReconstructConfig, Statistic};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::Cli;

/// Default location of the emerge log.
pub const DEFAULT_LOG_PATH: &str = "/var/log/emerge.log";

/// Default root of the proc filesystem.
pub const DEFAULT_PROC_DIR: &str = "/proc";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Emerge log to parse.
    pub log_path: PathBuf,

    /// Root of the proc filesystem used to find running builds.
    pub proc_dir: PathBuf,

    /// Statistic used for expected durations.
    pub statistic: Statistic,

    /// Discard unfinished builds when a new emerge run starts.
    pub discard_on_restart: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            proc_dir: PathBuf::from(DEFAULT_PROC_DIR),
            statistic: Statistic::default(),
            discard_on_restart: false,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (EMT_*)
        figment = figment.merge(Env::prefixed("EMT_"));

        figment.extract()
    }

    /// Applies command-line overrides on top of the loaded configuration.
    #[must_use]
    pub fn with_cli_overrides(mut self, cli: &Cli) -> Self {
        if let Some(log) = &cli.log {
            self.log_path.clone_from(log);
        }
        if let Some(statistic) = cli.statistic {
            self.statistic = statistic;
        }
        if let Some(discard) = cli.restart_heuristic {
            self.discard_on_restart = discard;
        }
        self
    }

    pub const fn reconstruct_config(&self) -> ReconstructConfig {
        ReconstructConfig {
            discard_on_restart: self.discard_on_restart,
        }
    }
}

/// Returns the platform-specific config directory for emt.
///
/// On Linux: `~/.config/emt`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("emt"))
}
