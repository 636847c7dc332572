//! `selfswap agent <plan.json>`: the native agent.
//!
//! Started detached by the native [`DeferredExecutor`](crate::upgrade::DeferredExecutor)
//! from a temporary copy of the selfswap binary. Its stdio is discarded, so the exit code
//! is the only outcome it reports.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::upgrade::executor::AGENT_COPY_PREFIX;
use crate::upgrade::{OperationPlan, PlanRunner};

#[derive(Args, Debug)]
pub struct AgentCommand {
    /// Serialized operation plan
    plan: PathBuf,
}

impl AgentCommand {
    pub async fn execute(self) -> Result<()> {
        let json = tokio::fs::read_to_string(&self.plan)
            .await
            .with_context(|| format!("Failed to read plan {}", self.plan.display()))?;
        let plan = OperationPlan::from_json(&json).with_context(|| format!("Invalid plan {}", self.plan.display()))?;

        let outcome = tokio::task::spawn_blocking(move || PlanRunner::new(&plan).run().map(|_| ()))
            .await
            .context("Plan runner panicked")?;

        remove_own_copy();
        outcome.map_err(anyhow::Error::new)
    }
}

/// Delete this binary when it is a temporary agent copy (Unix only; Windows locks it).
fn remove_own_copy() {
    if cfg!(windows) {
        return;
    }
    let Ok(exe) = std::env::current_exe() else {
        return;
    };
    let is_copy = exe.starts_with(std::env::temp_dir())
        && exe.file_name().is_some_and(|name| name.to_string_lossy().starts_with(AGENT_COPY_PREFIX));
    if is_copy {
        let _ = std::fs::remove_file(exe);
    }
}
