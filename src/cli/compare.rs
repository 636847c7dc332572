//! `selfswap compare`: compare two version strings.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::version::{VersionComparison, compare};

#[derive(Args, Debug)]
pub struct CompareCommand {
    /// Version of the running installation
    current: String,

    /// Published version
    remote: String,
}

impl CompareCommand {
    pub fn execute(self) -> Result<()> {
        let result = compare(&self.current, &self.remote)?;
        println!("{}", describe(&self.current, &self.remote, result));
        Ok(())
    }
}

pub(crate) fn describe(current: &str, remote: &str, result: VersionComparison) -> String {
    match result {
        VersionComparison::Higher => {
            format!("remote version {remote} is higher than current version {current}").green().to_string()
        }
        VersionComparison::Equal => format!("remote version {remote} equals current version {current}"),
        VersionComparison::Lower => {
            format!("remote version {remote} is lower than current version {current}").yellow().to_string()
        }
    }
}
