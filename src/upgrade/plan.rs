//! The operation plan handed from the planner to the deferred agent.
//!
//! An [`OperationPlan`] is plain data: it is computed once by
//! [`UpdatePlanner`](super::planner::UpdatePlanner), serialized into a helper artifact by
//! [`DeferredExecutor`](super::executor::DeferredExecutor) and executed once by an
//! out-of-process agent. Step order is significant:
//!
//! ```text
//! [wait] → backup* → delete* → copy-in → remove-staging → [launch] → remove-helper
//! ```
//!
//! Every backup of an entry precedes its deletion, every deletion precedes the copy-in and
//! the helper artifact is always removed last.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Whether an installation entry is a regular file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    #[must_use]
    pub const fn is_dir(self) -> bool {
        matches!(self, Self::Directory)
    }
}

/// One atomic step of an [`OperationPlan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Sleep so the invoking process can exit and release its file handles.
    Wait {
        seconds: u64,
    },
    /// Copy `source` to `destination`, recursively for directories.
    Backup {
        source: PathBuf,
        destination: PathBuf,
        kind: EntryKind,
    },
    /// Delete an installation entry.
    Delete {
        path: PathBuf,
        kind: EntryKind,
    },
    /// Merge every entry of `from` into `into`, overwriting existing files.
    CopyContents {
        from: PathBuf,
        into: PathBuf,
    },
    /// Delete the staging directory.
    RemoveStaging {
        path: PathBuf,
    },
    /// Start the new executable detached, with `working_dir` as its current directory.
    Launch {
        executable: PathBuf,
        working_dir: PathBuf,
    },
    /// Delete the helper artifact carrying out the plan.
    RemoveHelper {
        path: PathBuf,
    },
}

impl Step {
    /// Short machine-friendly name of the step type.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Wait { .. } => "wait",
            Self::Backup { .. } => "backup",
            Self::Delete { .. } => "delete",
            Self::CopyContents { .. } => "copy_contents",
            Self::RemoveStaging { .. } => "remove_staging",
            Self::Launch { .. } => "launch",
            Self::RemoveHelper { .. } => "remove_helper",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wait { seconds } => write!(f, "wait {seconds}s"),
            Self::Backup {
                source,
                destination,
                ..
            } => write!(f, "backup {} -> {}", source.display(), destination.display()),
            Self::Delete { path, kind } => match kind {
                EntryKind::File => write!(f, "delete file {}", path.display()),
                EntryKind::Directory => write!(f, "delete directory {}", path.display()),
            },
            Self::CopyContents { from, into } => {
                write!(f, "copy contents of {} into {}", from.display(), into.display())
            }
            Self::RemoveStaging { path } => write!(f, "remove staging {}", path.display()),
            Self::Launch { executable, .. } => write!(f, "launch {}", executable.display()),
            Self::RemoveHelper { path } => write!(f, "remove helper {}", path.display()),
        }
    }
}

/// An ordered list of file-system steps swapping an installation for a staged version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationPlan {
    pub install_root: PathBuf,
    pub staging_dir: PathBuf,
    /// The helper artifact removed by the final step.
    pub helper_path: PathBuf,
    /// Allocated backup directory, `None` when no backup was requested.
    pub backup_dir: Option<PathBuf>,
    pub steps: Vec<Step>,
}

impl OperationPlan {
    /// Returns the plan with a leading wait step of `seconds`.
    ///
    /// An existing leading wait is replaced, so applying a delay twice never stacks.
    /// A zero delay removes the wait step entirely.
    #[must_use]
    pub fn with_delay(mut self, seconds: u64) -> Self {
        if matches!(self.steps.first(), Some(Step::Wait { .. })) {
            self.steps.remove(0);
        }
        if seconds > 0 {
            self.steps.insert(0, Step::Wait { seconds });
        }
        self
    }

    /// Point the final cleanup step at a different helper artifact.
    #[must_use]
    pub fn with_helper_path(mut self, helper_path: impl Into<PathBuf>) -> Self {
        let helper_path = helper_path.into();
        for step in &mut self.steps {
            if let Step::RemoveHelper { path } = step {
                path.clone_from(&helper_path);
            }
        }
        self.helper_path = helper_path;
        self
    }

    /// Step labels in order, independent of paths and backup names.
    ///
    /// Two plans computed from the same inputs always have the same shape.
    #[must_use]
    pub fn shape(&self) -> Vec<&'static str> {
        self.steps.iter().map(Step::label).collect()
    }

    /// The executable relaunched after the swap, if any.
    #[must_use]
    pub fn launch_target(&self) -> Option<&Path> {
        self.steps.iter().find_map(|step| match step {
            Step::Launch { executable, .. } => Some(executable.as_path()),
            _ => None,
        })
    }

    /// Number of installation entries deleted by the plan.
    #[must_use]
    pub fn deleted_entries(&self) -> usize {
        self.steps.iter().filter(|step| matches!(step, Step::Delete { .. })).count()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl fmt::Display for OperationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, step) in self.steps.iter().enumerate() {
            writeln!(f, "{:>3}. {step}", index + 1)?;
        }
        Ok(())
    }
}
