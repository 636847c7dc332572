//! `selfswap check`: is a newer version published?

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::CliConfig;
use crate::upgrade::RemoteVersionProbe;
use crate::version::compare;

#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Version of the running installation (defaults to `update.current_version`)
    #[arg(long)]
    current: Option<String>,

    /// Document carrying the version marker (defaults to `update.version_url`)
    #[arg(long)]
    url: Option<String>,

    /// `id` attribute of the marker element (defaults to `update.element_id`)
    #[arg(long)]
    element_id: Option<String>,
}

impl CheckCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load_config().await?.update;

        let current = self
            .current
            .or(config.current_version)
            .context("No current version given; pass --current or set update.current_version")?;
        let url = self.url.or(config.version_url).context("No version URL given; pass --url or set update.version_url")?;
        let element_id = self.element_id.unwrap_or(config.element_id);

        eprintln!("{}", "Checking for updates...".cyan());
        let remote = RemoteVersionProbe::new()?.fetch(&url, &element_id).await?;
        let result = compare(&current, &remote)?;

        if result.is_update() {
            println!("{}", format!("Update available: {current} -> {remote}").green());
            println!("Run `selfswap apply --current {current}` to install it");
        } else {
            println!("{}", format!("You are on the latest version ({current}, remote {remote})").green());
        }
        Ok(())
    }
}
