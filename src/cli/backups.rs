//! `selfswap backups`: list retained backups.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::{CliConfig, resolve_install_root};
use crate::upgrade::list_backups;

#[derive(Args, Debug)]
pub struct BackupsCommand {
    /// Install root (defaults to the directory of the selfswap executable)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Backup name prefix (defaults to `update.backup_prefix`)
    #[arg(long)]
    prefix: Option<String>,
}

impl BackupsCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load_config().await?.update;
        let root = resolve_install_root(self.root)?;
        let prefix = self.prefix.unwrap_or(config.backup_prefix);

        let backups = list_backups(&root, &prefix)?;
        if backups.is_empty() {
            println!("No backups in {}", root.display());
            return Ok(());
        }

        for backup in backups {
            let created = backup
                .created
                .map_or_else(|| "unknown".to_string(), |time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string());
            println!("{}  {}", backup.name.bold(), created.dimmed());
        }
        Ok(())
    }
}
