//! Encodings of an [`OperationPlan`] for the out-of-process agent.
//!
//! | Agent  | Helper artifact        | Interpreter                      |
//! |--------|------------------------|----------------------------------|
//! | shell  | `selfswap-agent.sh`    | `sh`                             |
//! | batch  | `selfswap-agent.bat`   | `cmd /C`                         |
//! | native | `selfswap-plan.json`   | a temporary copy of `selfswap`   |
//!
//! All encodings stop at the first failing step. The helper artifact is only removed by
//! the final step, so a failed run leaves it behind next to the backup directory.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::{BATCH_HELPER_NAME, NATIVE_HELPER_NAME, SHELL_HELPER_NAME};
use crate::core::UpdateError;
use crate::upgrade::plan::{EntryKind, OperationPlan, Step};
use crate::utils::platform::{cmd_quote, sh_quote};

/// Which kind of agent carries out a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// POSIX shell script run by `sh`.
    Shell,
    /// Batch file run by `cmd.exe`.
    Batch,
    /// JSON plan run by a copy of the selfswap binary.
    Native,
}

impl AgentKind {
    /// `Batch` on Windows, `Shell` everywhere else.
    #[must_use]
    pub const fn platform_default() -> Self {
        if cfg!(windows) { Self::Batch } else { Self::Shell }
    }

    #[must_use]
    pub const fn helper_file_name(self) -> &'static str {
        match self {
            Self::Shell => SHELL_HELPER_NAME,
            Self::Batch => BATCH_HELPER_NAME,
            Self::Native => NATIVE_HELPER_NAME,
        }
    }

    /// Encode `plan` as the content of this agent's helper artifact.
    pub fn render(self, plan: &OperationPlan) -> Result<String, UpdateError> {
        match self {
            Self::Shell => Ok(render_shell(plan)),
            Self::Batch => Ok(render_batch(plan)),
            Self::Native => plan.to_json().map_err(|e| UpdateError::Commit {
                reason: format!("failed to serialize plan: {e}"),
            }),
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Shell => "shell",
            Self::Batch => "batch",
            Self::Native => "native",
        })
    }
}

fn sh(path: &Path) -> String {
    sh_quote(&path.to_string_lossy())
}

fn cmd(path: &Path) -> String {
    cmd_quote(&path.to_string_lossy())
}

/// Parent directories that must exist before the backup copies run, in first-use order.
fn backup_parents(plan: &OperationPlan) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    plan.steps
        .iter()
        .filter_map(|step| match step {
            Step::Backup {
                destination,
                ..
            } => destination.parent().map(Path::to_path_buf),
            _ => None,
        })
        .filter(|parent| seen.insert(parent.clone()))
        .collect()
}

/// Encode `plan` as a POSIX shell script.
///
/// # Examples
///
/// ```rust,no_run
/// use selfswap::upgrade::{UpdatePlanner, script::render_shell};
/// use std::path::Path;
///
/// # fn example() -> Result<(), selfswap::core::UpdateError> {
/// let plan = UpdatePlanner::new("/opt/app").plan(Path::new("update-staging"), Some("app"), true)?;
/// std::fs::write("/opt/app/selfswap-agent.sh", render_shell(&plan.with_delay(5)))
///     .expect("write helper");
/// # Ok(())
/// # }
/// ```
#[must_use]
pub fn render_shell(plan: &OperationPlan) -> String {
    let mut script = String::new();
    let _ = writeln!(script, "#!/bin/sh");
    let _ = writeln!(script, "# selfswap update agent for {}", plan.install_root.display());
    let _ = writeln!(script, "set -e");

    let parents = backup_parents(plan);
    let mut parents_created = false;

    for step in &plan.steps {
        match step {
            Step::Wait {
                seconds,
            } => {
                let _ = writeln!(script, "sleep {seconds}");
            }
            Step::Backup {
                source,
                destination,
                ..
            } => {
                if !parents_created {
                    for parent in &parents {
                        let _ = writeln!(script, "mkdir -p {}", sh(parent));
                    }
                    parents_created = true;
                }
                let _ = writeln!(script, "cp -pR {} {}", sh(source), sh(destination));
            }
            Step::Delete {
                path,
                kind,
            } => {
                let flag = if kind.is_dir() { "-rf" } else { "-f" };
                let _ = writeln!(script, "rm {flag} {}", sh(path));
            }
            Step::CopyContents {
                from,
                into,
            } => {
                let _ = writeln!(
                    script,
                    "cp -pR {} {}",
                    sh_quote(&format!("{}/.", from.to_string_lossy())),
                    sh_quote(&format!("{}/", into.to_string_lossy()))
                );
            }
            Step::RemoveStaging {
                path,
            } => {
                let _ = writeln!(script, "rm -rf {}", sh(path));
            }
            Step::Launch {
                executable,
                working_dir,
            } => {
                let _ = writeln!(
                    script,
                    "cd {} && nohup {} >/dev/null 2>&1 &",
                    sh(working_dir),
                    sh(executable)
                );
            }
            Step::RemoveHelper {
                path,
            } => {
                let _ = writeln!(script, "rm -f {}", sh(path));
            }
        }
    }

    script
}

/// Encode `plan` as a Windows batch file (CRLF line endings).
#[must_use]
pub fn render_batch(plan: &OperationPlan) -> String {
    const ABORT: &str = "if errorlevel 1 exit /b 1";

    let mut lines: Vec<String> = vec![
        "@echo off".to_string(),
        format!("rem selfswap update agent for {}", plan.install_root.display()),
    ];

    let parents = backup_parents(plan);
    let mut parents_created = false;

    for step in &plan.steps {
        match step {
            Step::Wait {
                seconds,
            } => {
                lines.push(format!("powershell -NoProfile -Command \"Start-Sleep -Seconds {seconds}\""));
            }
            Step::Backup {
                source,
                destination,
                kind,
            } => {
                if !parents_created {
                    for parent in &parents {
                        lines.push(format!("if not exist {0} mkdir {0}", cmd(parent)));
                        lines.push(ABORT.to_string());
                    }
                    parents_created = true;
                }
                match kind {
                    EntryKind::File => {
                        lines.push(format!("copy /Y {} {} >nul", cmd(source), cmd(destination)));
                    }
                    EntryKind::Directory => {
                        lines.push(format!(
                            "xcopy {} {} /E /I /Y /Q /H >nul",
                            cmd(source),
                            cmd_quote(&format!("{}\\", destination.to_string_lossy()))
                        ));
                    }
                }
                lines.push(ABORT.to_string());
            }
            Step::Delete {
                path,
                kind,
            } => {
                match kind {
                    EntryKind::File => lines.push(format!("del /F /Q {}", cmd(path))),
                    EntryKind::Directory => lines.push(format!("rmdir /S /Q {}", cmd(path))),
                }
                lines.push(format!("if exist {} exit /b 1", cmd(path)));
            }
            Step::CopyContents {
                from,
                into,
            } => {
                lines.push(format!(
                    "xcopy {} {} /E /Y /Q /I /H >nul",
                    cmd_quote(&format!("{}\\*", from.to_string_lossy())),
                    cmd_quote(&format!("{}\\", into.to_string_lossy()))
                ));
                lines.push(ABORT.to_string());
            }
            Step::RemoveStaging {
                path,
            } => {
                lines.push(format!("rmdir /S /Q {}", cmd(path)));
            }
            Step::Launch {
                executable,
                working_dir,
            } => {
                lines.push(format!("cd /d {}", cmd(working_dir)));
                lines.push(format!("start \"\" /I /MIN {}", cmd(executable)));
            }
            Step::RemoveHelper {
                path,
            } => {
                // Deleting a running batch file: leave the script context first.
                lines.push(format!("(goto) 2>nul & del /F /Q {}", cmd(path)));
            }
        }
    }

    let mut script = lines.join("\r\n");
    script.push_str("\r\n");
    script
}
