//! Command-line interface for selfswap.
//!
//! Each subcommand exposes one stage of the update pipeline, and `apply` chains them:
//!
//! - `compare` - Compare two version strings
//! - `check` - Probe the remote version marker and report whether an update exists
//! - `fetch` - Download and unpack an archive into a directory
//! - `plan` - Print the operation plan for an already staged update
//! - `apply` - Probe, compare, fetch, plan and hand the plan to a detached agent
//! - `backups` - List retained backup directories, newest first
//! - `agent` (hidden) - Run a JSON plan; started by `apply --agent native`
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: errors only
//! - `--config` / `-c`: config file path (also `SELFSWAP_CONFIG`)
//! - `--no-progress`: hide download progress bars (also `SELFSWAP_NO_PROGRESS`)
//!
//! # Example
//!
//! ```bash
//! selfswap check --current 1.0.3 --url https://example.com/downloads.html
//! selfswap apply --root /opt/app --current 1.0.3 --restart app --dry-run
//! ```

mod agent;
mod apply;
mod backups;
mod check;
mod compare;
mod fetch;
mod plan;


use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::UpdaterConfig;

/// Runtime settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// `RUST_LOG`-style default filter, overridden by `RUST_LOG` itself.
    pub log_level: String,

    /// Hide progress bars.
    pub no_progress: bool,

    /// Explicit config file path.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Install the global tracing subscriber writing to stderr.
    ///
    /// Safe to call more than once; later calls are ignored.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init();
    }

    /// Load the config file named by `--config`, `SELFSWAP_CONFIG` or the default path.
    pub async fn load_config(&self) -> Result<UpdaterConfig> {
        UpdaterConfig::load_with_optional(self.config_path.clone()).await.context("Failed to load configuration")
    }

    /// Whether progress bars may be drawn.
    #[must_use]
    pub const fn show_progress(&self) -> bool {
        !self.no_progress
    }
}

/// Top-level CLI.
#[derive(Parser)]
#[command(
    name = "selfswap",
    about = "Check for, stage and apply in-place updates of an installed application",
    version,
    long_about = "selfswap probes a remote version marker, downloads the newest archive into a staging \
                  directory and swaps the installation through a detached agent after the running \
                  process has exited."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress everything but errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a current and a remote version string
    Compare(compare::CompareCommand),

    /// Check whether a newer version is published
    Check(check::CheckCommand),

    /// Download and unpack an update archive
    Fetch(fetch::FetchCommand),

    /// Show the operation plan for a staged update
    Plan(plan::PlanCommand),

    /// Stage the newest version and hand the swap to a detached agent
    Apply(apply::ApplyCommand),

    /// List retained backup directories
    Backups(backups::BackupsCommand),

    /// Run a serialized plan (native agent entry point)
    #[command(hide = true)]
    Agent(agent::AgentCommand),
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Derive runtime settings from the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "selfswap=debug"
        } else if self.quiet {
            "error"
        } else {
            "selfswap=warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress || std::env::var_os(crate::constants::NO_PROGRESS_ENV_VAR).is_some(),
            config_path: self.config.clone(),
        }
    }

    /// Execute with explicit settings, used by tests.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Compare(cmd) => cmd.execute(),
            Commands::Check(cmd) => cmd.execute(&config).await,
            Commands::Fetch(cmd) => cmd.execute(&config).await,
            Commands::Plan(cmd) => cmd.execute(&config).await,
            Commands::Apply(cmd) => cmd.execute(&config).await,
            Commands::Backups(cmd) => cmd.execute(&config).await,
            Commands::Agent(cmd) => cmd.execute().await,
        }
    }
}

/// The install root as an absolute path: `root` if given, else the directory of the
/// running executable.
pub(crate) fn resolve_install_root(root: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(root) = root {
        return std::path::absolute(&root)
            .with_context(|| format!("Failed to resolve install root {}", root.display()));
    }
    let exe = std::env::current_exe().context("Failed to get current executable path")?;
    exe.parent()
        .map(std::path::Path::to_path_buf)
        .context("Current executable has no parent directory; pass --root")
}
