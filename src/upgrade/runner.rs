//! In-process execution of an operation plan.
//!
//! [`PlanRunner`] is what the native agent runs after it has been started detached by
//! [`DeferredExecutor`](super::executor::DeferredExecutor). The invoking selfswap process
//! never runs a plan against its own installation.
//!
//! Execution stops at the first failing step and reports which step failed. Nothing is
//! rolled back; the backup directory is the recovery path.

use std::process::Command;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::UpdateError;
use crate::upgrade::plan::{OperationPlan, Step};
use crate::utils::fs::{copy_dir, copy_entry, remove_dir_all, remove_file};
use crate::utils::platform::spawn_detached;

/// Result of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub steps_run: usize,
    /// Process id of the relaunched application, if the plan launched one.
    pub launched_pid: Option<u32>,
}

/// A step failed; everything before it has been applied.
#[derive(Debug)]
pub struct StepFailure {
    /// Zero-based index of the failing step.
    pub index: usize,
    pub step: Step,
    pub error: UpdateError,
}

impl std::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "step {} ({}) failed: {}", self.index + 1, self.step, self.error)
    }
}

impl std::error::Error for StepFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Executes the steps of an [`OperationPlan`] in order.
pub struct PlanRunner<'a> {
    plan: &'a OperationPlan,
}

impl<'a> PlanRunner<'a> {
    #[must_use]
    pub const fn new(plan: &'a OperationPlan) -> Self {
        Self {
            plan,
        }
    }

    /// Run every step, stopping at the first failure.
    pub fn run(&self) -> Result<RunReport, StepFailure> {
        let mut report = RunReport {
            steps_run: 0,
            launched_pid: None,
        };

        for (index, step) in self.plan.steps.iter().enumerate() {
            debug!("Running step {}: {}", index + 1, step);
            match run_step(step) {
                Ok(pid) => {
                    if pid.is_some() {
                        report.launched_pid = pid;
                    }
                    report.steps_run += 1;
                }
                Err(error) => {
                    warn!("Update step {} failed: {}", index + 1, error);
                    return Err(StepFailure {
                        index,
                        step: step.clone(),
                        error,
                    });
                }
            }
        }

        info!("Applied update to {} ({} steps)", self.plan.install_root.display(), report.steps_run);
        Ok(report)
    }
}

/// Apply a single step. Returns the pid of a launched process.
fn run_step(step: &Step) -> Result<Option<u32>, UpdateError> {
    match step {
        Step::Wait {
            seconds,
        } => std::thread::sleep(Duration::from_secs(*seconds)),
        Step::Backup {
            source,
            destination,
            kind,
        } => copy_entry(source, destination, kind.is_dir())?,
        Step::Delete {
            path,
            kind,
        } => {
            if kind.is_dir() {
                remove_dir_all(path)?;
            } else {
                remove_file(path)?;
            }
        }
        Step::CopyContents {
            from,
            into,
        } => copy_dir(from, into)?,
        Step::RemoveStaging {
            path,
        } => remove_dir_all(path)?,
        Step::Launch {
            executable,
            working_dir,
        } => {
            let pid = spawn_detached(Command::new(executable).current_dir(working_dir))
                .map_err(|e| UpdateError::io("launch", executable, e))?;
            info!("Launched {} (pid {})", executable.display(), pid);
            return Ok(Some(pid));
        }
        Step::RemoveHelper {
            path,
        } => remove_file(path)?,
    }
    Ok(None)
}
