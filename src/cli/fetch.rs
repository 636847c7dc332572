//! `selfswap fetch`: download and unpack an archive.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::CliConfig;
use crate::upgrade::ArchiveFetcher;

#[derive(Args, Debug)]
pub struct FetchCommand {
    /// Archive URL or local path
    archive: String,

    /// Directory to unpack into (created if missing)
    destination: PathBuf,
}

impl FetchCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let summary = ArchiveFetcher::new()?
            .with_progress(cli.show_progress())
            .fetch_and_stage(&self.archive, &self.destination)
            .await
            .with_context(|| format!("Failed to stage {} into {}", self.archive, self.destination.display()))?;

        println!(
            "{}",
            format!(
                "Unpacked {} files and {} directories into {}",
                summary.files,
                summary.directories,
                self.destination.display()
            )
            .green()
        );
        Ok(())
    }
}
