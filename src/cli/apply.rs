//! `selfswap apply`: the full update pipeline.
//!
//! ```text
//! probe → compare → fetch into <root>/<staging> → plan → commit → exit
//! ```
//!
//! With `--dry-run` the pipeline stops after printing the plan; the staging directory is
//! kept so a later `selfswap plan` or `apply` can inspect it.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use super::{CliConfig, compare::describe, plan::print_plan, resolve_install_root};
use crate::upgrade::{AgentKind, ArchiveFetcher, DeferredExecutor, RemoteVersionProbe, UpdatePlanner};
use crate::version::compare;

#[derive(Args, Debug)]
pub struct ApplyCommand {
    /// Install root (defaults to the directory of the selfswap executable)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Version of the running installation (defaults to `update.current_version`)
    #[arg(long)]
    current: Option<String>,

    /// Document carrying the version marker (defaults to `update.version_url`)
    #[arg(long)]
    url: Option<String>,

    /// `id` attribute of the marker element (defaults to `update.element_id`)
    #[arg(long)]
    element_id: Option<String>,

    /// Archive URL or path (defaults to `update.archive_url`)
    #[arg(long)]
    archive: Option<String>,

    /// Staging directory, relative to the root unless absolute (defaults to `update.staging_dir`)
    #[arg(long)]
    staging: Option<PathBuf>,

    /// Executable in the archive to relaunch after the swap
    #[arg(long, value_name = "EXE")]
    restart: Option<String>,

    /// Do not back up the current installation
    #[arg(long)]
    no_backup: bool,

    /// Apply even if the remote version is not newer
    #[arg(short, long)]
    force: bool,

    /// Agent carrying out the swap (defaults to `update.agent`)
    #[arg(long, value_enum)]
    agent: Option<AgentKind>,

    /// Seconds the agent waits before touching the installation (defaults to `update.agent_delay_secs`)
    #[arg(long, value_name = "SECONDS")]
    delay: Option<u64>,

    /// Stage and plan, but do not start the agent
    #[arg(long)]
    dry_run: bool,
}

impl ApplyCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load_config().await?.update;
        let root = resolve_install_root(self.root)?;

        let current = self
            .current
            .or(config.current_version)
            .context("No current version given; pass --current or set update.current_version")?;
        let url = self.url.or(config.version_url).context("No version URL given; pass --url or set update.version_url")?;
        let archive = self
            .archive
            .or(config.archive_url)
            .context("No archive given; pass --archive or set update.archive_url")?;
        let element_id = self.element_id.unwrap_or(config.element_id);

        eprintln!("{}", "Checking for updates...".cyan());
        let remote = RemoteVersionProbe::new()?
            .fetch(&url, &element_id)
            .await
            .context("Failed to determine the remote version")?;
        let result = compare(&current, &remote)?;
        println!("{}", describe(&current, &remote, result));

        if !result.is_update() && !self.force {
            println!("{}", format!("Already on the latest version ({current})").green());
            return Ok(());
        }

        let staging = root.join(self.staging.unwrap_or_else(|| PathBuf::from(&config.staging_dir)));
        println!("{}", format!("Downloading {remote}...").cyan());
        ArchiveFetcher::new()?
            .with_progress(cli.show_progress())
            .fetch_and_stage(&archive, &staging)
            .await
            .with_context(|| format!("Failed to stage update into {}", staging.display()))?;

        let kind = self.agent.unwrap_or_else(|| config.agent.resolve());
        let restart = self.restart.or(config.restart_executable);
        let planner = UpdatePlanner::new(&root)
            .with_helper_name(kind.helper_file_name())
            .with_backup_prefix(&config.backup_prefix);
        let plan = planner
            .plan(&staging, restart.as_deref(), config.backup && !self.no_backup)
            .context("Failed to plan update")?;

        let delay = Duration::from_secs(self.delay.unwrap_or(config.agent_delay_secs));
        let executor = DeferredExecutor::new(kind).with_delay(delay);
        print_plan(&executor.prepare(&plan));

        if self.dry_run {
            println!(
                "{}",
                format!("Dry run: nothing committed, staged files remain in {}", staging.display()).yellow()
            );
            return Ok(());
        }

        let receipt = executor.commit(&plan)?;
        debug!("Agent program {}", receipt.program.display());
        println!(
            "{}",
            format!(
                "Update agent started (pid {}). The swap begins in {}s once this process exits.",
                receipt.pid,
                delay.as_secs()
            )
            .green()
        );
        Ok(())
    }
}
