//! `selfswap plan`: show the operation plan for a staged update.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;

use super::{CliConfig, resolve_install_root};
use crate::upgrade::{AgentKind, OperationPlan, UpdatePlanner};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PlanFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug)]
pub struct PlanCommand {
    /// Install root (defaults to the directory of the selfswap executable)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Staging directory, relative to the root unless absolute (defaults to `update.staging_dir`)
    #[arg(long)]
    staging: Option<PathBuf>,

    /// Executable in the staging directory to relaunch after the swap
    #[arg(long, value_name = "EXE")]
    restart: Option<String>,

    /// Do not back up the current installation
    #[arg(long)]
    no_backup: bool,

    /// Agent whose helper artifact the plan removes last
    #[arg(long, value_enum)]
    agent: Option<AgentKind>,

    /// Output format
    #[arg(long, value_enum, default_value_t = PlanFormat::Text)]
    format: PlanFormat,
}

impl PlanCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load_config().await?.update;
        let root = resolve_install_root(self.root)?;
        let staging = self.staging.unwrap_or_else(|| PathBuf::from(&config.staging_dir));
        let kind = self.agent.unwrap_or_else(|| config.agent.resolve());

        let planner = UpdatePlanner::new(&root)
            .with_helper_name(kind.helper_file_name())
            .with_backup_prefix(&config.backup_prefix);
        let plan = planner
            .plan(&staging, self.restart.as_deref().or(config.restart_executable.as_deref()), config.backup && !self.no_backup)
            .context("Failed to plan update")?;

        match self.format {
            PlanFormat::Text => print_plan(&plan),
            PlanFormat::Json => println!("{}", plan.to_json()?),
        }
        Ok(())
    }
}

/// Print a plan in the human-readable form shared by `plan` and `apply`.
pub(crate) fn print_plan(plan: &OperationPlan) {
    println!("{} {}", "Update plan for".bold(), plan.install_root.display());
    if let Some(backup) = &plan.backup_dir {
        println!("  backup: {}", backup.display());
    }
    print!("{plan}");
}
