//! Planning of the in-place swap.
//!
//! [`UpdatePlanner`] turns an install root and a staging directory into an
//! [`OperationPlan`]. Planning only reads the file system. It validates its
//! preconditions, captures an [`InstallationSnapshot`] once and derives every step from
//! that snapshot, so files written into the install root afterwards (the helper
//! artifact, for one) never leak into the plan.
//!
//! # Preconditions
//!
//! Each violated precondition fails with [`UpdateError::Validation`] naming it:
//!
//! 1. the staging directory exists, is a directory and is non-empty
//! 2. the restart executable, when requested, is a regular executable file in staging
//! 3. the install root is readable and holds at least one entry besides update machinery
//! 4. every install entry is a regular file or a directory (no symlinks, no devices)
//! 5. the staging directory is not nested inside an install entry
//!
//! # Update Machinery
//!
//! The snapshot never contains the staging directory, helper artifacts of any agent kind,
//! or backup directories from earlier runs.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::{BATCH_HELPER_NAME, DEFAULT_BACKUP_PREFIX, NATIVE_HELPER_NAME, SHELL_HELPER_NAME};
use crate::core::{Precondition, UpdateError};
use crate::upgrade::backup::{allocate_backup_name, is_backup_name};
use crate::upgrade::plan::{EntryKind, OperationPlan, Step};
use crate::upgrade::script::AgentKind;
use crate::utils::fs::is_executable;
use crate::utils::path_validation::validate_no_traversal;

/// One entry directly under the install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub name: OsString,
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// The installation entries captured at planning time, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationSnapshot {
    pub root: PathBuf,
    pub entries: Vec<SnapshotEntry>,
}

impl InstallationSnapshot {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry names as lossy UTF-8, in snapshot order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.to_string_lossy().into_owned()).collect()
    }
}

/// Computes the operation plan swapping an installation for a staged version.
///
/// # Examples
///
/// ```rust,no_run
/// use selfswap::upgrade::UpdatePlanner;
/// use std::path::Path;
///
/// # fn example() -> Result<(), selfswap::core::UpdateError> {
/// let planner = UpdatePlanner::new("/opt/app");
/// let plan = planner.plan(Path::new("update-staging"), Some("app"), true)?;
/// for step in &plan.steps {
///     println!("{step}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct UpdatePlanner {
    install_root: PathBuf,
    helper_name: String,
    backup_prefix: String,
}

impl UpdatePlanner {
    /// Planner for `install_root`, using the platform's default helper artifact name.
    ///
    /// A relative root is resolved against the current directory now, so the plan stays
    /// valid for an agent running elsewhere.
    pub fn new(install_root: impl Into<PathBuf>) -> Self {
        let install_root = install_root.into();
        Self {
            install_root: std::path::absolute(&install_root).unwrap_or(install_root),
            helper_name: AgentKind::platform_default().helper_file_name().to_string(),
            backup_prefix: DEFAULT_BACKUP_PREFIX.to_string(),
        }
    }

    /// Name of the helper artifact the final step removes.
    #[must_use]
    pub fn with_helper_name(mut self, name: impl Into<String>) -> Self {
        self.helper_name = name.into();
        self
    }

    #[must_use]
    pub fn with_backup_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.backup_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    #[must_use]
    pub fn backup_prefix(&self) -> &str {
        &self.backup_prefix
    }

    /// Where the helper artifact lives: directly inside the install root.
    #[must_use]
    pub fn helper_path(&self) -> PathBuf {
        self.install_root.join(&self.helper_name)
    }

    /// Resolve a staging path; relative paths are taken relative to the install root.
    #[must_use]
    pub fn resolve_staging(&self, staging: &Path) -> PathBuf {
        if staging.is_absolute() {
            staging.to_path_buf()
        } else {
            self.install_root.join(staging)
        }
    }

    /// Check the staging directory and the restart executable.
    pub fn validate_staging(&self, staging: &Path, new_executable: Option<&str>) -> Result<(), UpdateError> {
        let staging = self.resolve_staging(staging);

        let metadata = match fs::metadata(&staging) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UpdateError::validation(Precondition::StagingMissing, staging));
            }
            Err(e) => return Err(UpdateError::io("inspect", &staging, e)),
        };
        if !metadata.is_dir() {
            return Err(UpdateError::validation(Precondition::StagingNotDirectory, staging));
        }

        let mut entries = fs::read_dir(&staging).map_err(|e| UpdateError::io("read directory", &staging, e))?;
        if entries.next().is_none() {
            return Err(UpdateError::validation(Precondition::StagingEmpty, staging));
        }

        if let Some(executable) = new_executable {
            let relative = Path::new(executable);
            let path = staging.join(relative);
            if executable.is_empty() || validate_no_traversal(relative).is_err() {
                return Err(UpdateError::validation(Precondition::ExecutableMissing, path));
            }

            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(UpdateError::validation(Precondition::ExecutableMissing, path));
                }
                Err(e) => return Err(UpdateError::io("inspect", &path, e)),
            };
            if !metadata.is_file() {
                return Err(UpdateError::validation(Precondition::ExecutableNotFile, path));
            }
            if !is_executable(&metadata) {
                return Err(UpdateError::validation(Precondition::ExecutableNotExecutable, path));
            }
        }

        Ok(())
    }

    fn is_machinery(&self, name: &str) -> bool {
        name == self.helper_name
            || [SHELL_HELPER_NAME, BATCH_HELPER_NAME, NATIVE_HELPER_NAME].contains(&name)
            || is_backup_name(name, &self.backup_prefix)
    }

    /// Enumerate the installation, excluding `staging` and update machinery.
    ///
    /// # Errors
    ///
    /// - [`Precondition::InstallRootUnreadable`] if the root cannot be listed
    /// - [`Precondition::UnsupportedEntry`] for symlinks and special files
    /// - [`Precondition::StagingInsideInstallEntry`] if an entry contains the staging directory
    /// - [`Precondition::InstallRootEmpty`] if nothing is left after exclusions
    pub fn snapshot(&self, staging: &Path) -> Result<InstallationSnapshot, UpdateError> {
        let staging = self.resolve_staging(staging);
        let canonical_staging = staging.canonicalize().ok();

        let Ok(read_dir) = fs::read_dir(&self.install_root) else {
            return Err(UpdateError::validation(Precondition::InstallRootUnreadable, &self.install_root));
        };

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| UpdateError::io("read directory", &self.install_root, e))?;
            let name = entry.file_name();
            let path = entry.path();

            if self.is_machinery(&name.to_string_lossy()) {
                debug!("Excluding update machinery from snapshot: {}", path.display());
                continue;
            }

            let canonical = path.canonicalize().ok();
            if canonical.is_some() && canonical == canonical_staging {
                debug!("Excluding staging directory from snapshot: {}", path.display());
                continue;
            }

            let metadata = fs::symlink_metadata(&path).map_err(|e| UpdateError::io("inspect", &path, e))?;
            let kind = if metadata.is_dir() {
                EntryKind::Directory
            } else if metadata.is_file() {
                EntryKind::File
            } else {
                return Err(UpdateError::validation(Precondition::UnsupportedEntry, path));
            };

            // An entry containing staging must never get a Delete step.
            if let (Some(staged), Some(installed)) = (&canonical_staging, &canonical) {
                if kind.is_dir() && staged.starts_with(installed) {
                    return Err(UpdateError::validation(Precondition::StagingInsideInstallEntry, staged));
                }
            }

            entries.push(SnapshotEntry {
                name,
                path,
                kind,
            });
        }

        if entries.is_empty() {
            return Err(UpdateError::validation(Precondition::InstallRootEmpty, &self.install_root));
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(InstallationSnapshot {
            root: self.install_root.clone(),
            entries,
        })
    }

    /// Compute the plan replacing the installation with the content of `staging`.
    ///
    /// `new_executable` is the name, relative to the staging directory, of the executable
    /// to relaunch after the swap. With `backup` set, every snapshot entry is copied into a
    /// freshly named backup directory before anything is deleted.
    pub fn plan(
        &self,
        staging: &Path,
        new_executable: Option<&str>,
        backup: bool,
    ) -> Result<OperationPlan, UpdateError> {
        self.validate_staging(staging, new_executable)?;
        let staging = self.resolve_staging(staging);
        let snapshot = self.snapshot(&staging)?;
        Ok(self.plan_from_snapshot(&snapshot, &staging, new_executable, backup))
    }

    /// Derive the steps from an already captured snapshot.
    #[must_use]
    pub fn plan_from_snapshot(
        &self,
        snapshot: &InstallationSnapshot,
        staging: &Path,
        new_executable: Option<&str>,
        backup: bool,
    ) -> OperationPlan {
        let mut steps = Vec::with_capacity(snapshot.len() * 2 + 4);

        let backup_dir = backup.then(|| self.install_root.join(allocate_backup_name(&self.install_root, &self.backup_prefix)));
        if let Some(backup_dir) = &backup_dir {
            for entry in &snapshot.entries {
                steps.push(Step::Backup {
                    source: entry.path.clone(),
                    destination: backup_dir.join(&entry.name),
                    kind: entry.kind,
                });
            }
        }

        for entry in &snapshot.entries {
            steps.push(Step::Delete {
                path: entry.path.clone(),
                kind: entry.kind,
            });
        }

        steps.push(Step::CopyContents {
            from: staging.to_path_buf(),
            into: self.install_root.clone(),
        });
        steps.push(Step::RemoveStaging {
            path: staging.to_path_buf(),
        });

        if let Some(executable) = new_executable {
            steps.push(Step::Launch {
                executable: self.install_root.join(executable),
                working_dir: self.install_root.clone(),
            });
        }

        let helper_path = self.helper_path();
        steps.push(Step::RemoveHelper {
            path: helper_path.clone(),
        });

        info!(
            "Planned update of {} ({} entries, backup: {})",
            self.install_root.display(),
            snapshot.len(),
            backup_dir.as_ref().map_or_else(|| "none".to_string(), |dir| dir.display().to_string())
        );

        OperationPlan {
            install_root: self.install_root.clone(),
            staging_dir: staging.to_path_buf(),
            helper_path,
            backup_dir,
            steps,
        }
    }
}
