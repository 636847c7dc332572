//! Hand-off of an operation plan to a detached agent process.
//!
//! The process running selfswap usually belongs to the installation being replaced, and
//! on Windows a running executable cannot be deleted or overwritten. The executor
//! therefore never touches the installation itself. It writes the plan as a helper
//! artifact into the install root, starts an agent detached from the current process
//! and returns. The caller is expected to exit right after [`DeferredExecutor::commit`].
//!
//! # Timing
//!
//! The first step of every committed plan is a wait (5 seconds by default) giving the
//! invoking process time to exit and release its file handles. This is a heuristic, not
//! synchronization: a caller that keeps running past the delay races the agent.
//!
//! # Limitations
//!
//! - The agent's outcome is not observable. There is no completion signal and no
//!   automatic rollback; a failed agent leaves its helper artifact and the backup behind.
//! - Nothing prevents two updaters from committing plans against the same install root.
//!   Callers must serialize update attempts themselves.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info};

use crate::constants::DEFAULT_AGENT_DELAY;
use crate::core::UpdateError;
use crate::upgrade::plan::OperationPlan;
use crate::upgrade::script::AgentKind;
use crate::utils::fs::set_mode;
use crate::utils::platform::spawn_detached;

/// What [`DeferredExecutor::commit`] started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub kind: AgentKind,
    /// The helper artifact the agent executes.
    pub helper_path: PathBuf,
    /// Program started as the agent.
    pub program: PathBuf,
    pub pid: u32,
}

/// Schedules an [`OperationPlan`] to run in a detached agent after a delay.
///
/// # Examples
///
/// ```rust,no_run
/// use selfswap::upgrade::{AgentKind, DeferredExecutor, UpdatePlanner};
/// use std::path::Path;
///
/// # fn example() -> Result<(), selfswap::core::UpdateError> {
/// let plan = UpdatePlanner::new("/opt/app").plan(Path::new("update-staging"), Some("app"), true)?;
/// let receipt = DeferredExecutor::new(AgentKind::platform_default()).commit(&plan)?;
/// println!("agent started with pid {}", receipt.pid);
/// std::process::exit(0);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DeferredExecutor {
    kind: AgentKind,
    delay: Duration,
    agent_binary: Option<PathBuf>,
}

impl DeferredExecutor {
    #[must_use]
    pub const fn new(kind: AgentKind) -> Self {
        Self {
            kind,
            delay: DEFAULT_AGENT_DELAY,
            agent_binary: None,
        }
    }

    /// Delay before the agent starts touching the installation (whole seconds).
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Binary copied to run a native agent. Defaults to the running executable.
    #[must_use]
    pub fn with_agent_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.agent_binary = Some(binary.into());
        self
    }

    #[must_use]
    pub const fn kind(&self) -> AgentKind {
        self.kind
    }

    /// The plan as the agent will run it: leading wait, cleanup aimed at this agent's helper.
    #[must_use]
    pub fn prepare(&self, plan: &OperationPlan) -> OperationPlan {
        let helper_path = plan.install_root.join(self.kind.helper_file_name());
        plan.clone().with_helper_path(helper_path).with_delay(self.delay.as_secs())
    }

    /// Write the helper artifact for `plan` and return the prepared plan.
    ///
    /// # Errors
    ///
    /// [`UpdateError::Commit`] if the plan's install root is relative, or the plan cannot be
    /// encoded or written. The agent runs from another directory, so relative paths would
    /// point elsewhere.
    pub fn write_helper(&self, plan: &OperationPlan) -> Result<OperationPlan, UpdateError> {
        if !plan.install_root.is_absolute() {
            return Err(UpdateError::Commit {
                reason: format!("install root {} is not an absolute path", plan.install_root.display()),
            });
        }
        let prepared = self.prepare(plan);
        let content = self.kind.render(&prepared)?;

        std::fs::write(&prepared.helper_path, content).map_err(|e| UpdateError::Commit {
            reason: format!("failed to write {}: {e}", prepared.helper_path.display()),
        })?;
        if self.kind == AgentKind::Shell {
            set_mode(&prepared.helper_path, 0o755).map_err(|e| UpdateError::Commit {
                reason: e.to_string(),
            })?;
        }

        debug!("Wrote {} helper to {}", self.kind, prepared.helper_path.display());
        Ok(prepared)
    }

    /// Write the helper artifact and start the agent detached.
    ///
    /// Returns as soon as the agent process exists. The installation is untouched at this
    /// point; the agent begins after the configured delay.
    ///
    /// # Errors
    ///
    /// [`UpdateError::Commit`] if the helper cannot be written or the agent cannot be
    /// started. A helper written before a failed launch is left in place.
    pub fn commit(&self, plan: &OperationPlan) -> Result<CommitReceipt, UpdateError> {
        let prepared = self.write_helper(plan)?;
        let helper = prepared.helper_path.clone();

        let program = match self.kind {
            AgentKind::Shell => PathBuf::from("sh"),
            AgentKind::Batch => PathBuf::from("cmd"),
            AgentKind::Native => self.stage_agent_binary()?,
        };

        let mut command = Command::new(&program);
        match self.kind {
            AgentKind::Shell => command.arg(&helper),
            AgentKind::Batch => command.arg("/C").arg(&helper),
            AgentKind::Native => command.arg("agent").arg(&helper),
        };
        // Keep the agent's working directory out of the tree it is about to rewrite.
        command.current_dir(std::env::temp_dir());

        let pid = spawn_detached(&mut command).map_err(|e| UpdateError::Commit {
            reason: format!("failed to start {}: {e}", program.display()),
        })?;

        info!("Started {} agent (pid {}) for {}", self.kind, pid, prepared.install_root.display());
        Ok(CommitReceipt {
            kind: self.kind,
            helper_path: helper,
            program,
            pid,
        })
    }

    /// Copy the agent binary to the temp directory so the installation can replace it.
    fn stage_agent_binary(&self) -> Result<PathBuf, UpdateError> {
        let source = match &self.agent_binary {
            Some(binary) => binary.clone(),
            None => std::env::current_exe().map_err(|e| UpdateError::Commit {
                reason: format!("failed to locate the running executable: {e}"),
            })?,
        };

        let target = agent_copy_path(&std::env::temp_dir());
        std::fs::copy(&source, &target).map_err(|e| UpdateError::Commit {
            reason: format!("failed to copy {} to {}: {e}", source.display(), target.display()),
        })?;
        debug!("Staged agent binary at {}", target.display());
        Ok(target)
    }
}

/// File name prefix of temporary native agent binaries.
pub const AGENT_COPY_PREFIX: &str = "selfswap-agent-";

fn agent_copy_path(dir: &Path) -> PathBuf {
    let mut name = format!("{AGENT_COPY_PREFIX}{}", uuid::Uuid::new_v4());
    if cfg!(windows) {
        name.push_str(".exe");
    }
    dir.join(name)
}
