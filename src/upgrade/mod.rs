//! In-place self-replacement of an installed application.
//!
//! This module finds out whether a newer version is published, stages it next to the
//! running installation and swaps the two once the running process has exited.
//!
//! # Architecture Overview
//!
//! ## Core Components
//!
//! - **[`RemoteVersionProbe`]**: Reads the remote version marker from a text document
//! - **[`ArchiveFetcher`]**: Downloads a zip archive and unpacks it into a staging directory
//! - **[`UpdatePlanner`]**: Validates inputs and computes the [`OperationPlan`]
//! - **[`DeferredExecutor`]**: Hands the plan to a detached agent process
//! - **[`PlanRunner`]**: Executes a plan inside the native agent
//!
//! ## Update Process Flow
//!
//! ```text
//! 1. Probe
//!    ├── Fetch the version document (HTTP(S) or local file)
//!    └── Extract the marker token, compare with the running version
//!
//! 2. Stage
//!    └── Download the archive and unpack it into <root>/update-staging
//!
//! 3. Plan (read-only)
//!    ├── Validate staging, restart executable and install root
//!    ├── Snapshot the install root, minus update machinery
//!    └── backup* → delete* → copy-in → remove staging → [launch] → remove helper
//!
//! 4. Commit
//!    ├── Write the helper artifact (sh, bat or JSON plan)
//!    ├── Start the agent detached, prefixed by a wait step
//!    └── Caller exits; the agent swaps the files and relaunches
//! ```
//!
//! # Safety Mechanisms
//!
//! - Nothing is deleted before it has been copied into the backup directory
//! - Planning never writes to disk; the first write is the helper artifact
//! - Every encoding of a plan stops at the first failing step
//! - Archive entries escaping the staging directory are rejected
//!
//! # Usage Patterns
//!
//! ```bash
//! selfswap check --current 1.0.3             # Is a newer version published?
//! selfswap apply --current 1.0.3 --dry-run   # Stage and show the plan
//! selfswap apply --current 1.0.3 --restart app
//! selfswap backups --root /opt/app           # Retained backups, newest first
//! ```
//!
//! # Error Handling
//!
//! All library functions return [`UpdateError`](crate::core::UpdateError):
//!
//! ```rust,no_run
//! use selfswap::upgrade::UpdatePlanner;
//! use selfswap::core::UpdateError;
//! use std::path::Path;
//!
//! match UpdatePlanner::new("/opt/app").plan(Path::new("update-staging"), None, true) {
//!     Ok(plan) => print!("{plan}"),
//!     Err(UpdateError::Validation { precondition, path }) => {
//!         eprintln!("cannot update: {precondition} ({})", path.display());
//!     }
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

/// Zip download and extraction into a staging directory.
pub mod archive;
/// Backup directory naming and discovery.
///
/// Backups are named `<prefix>_<20 digit timestamp>` and are never removed automatically.
pub mod backup;
/// Detached hand-off of a plan to an agent process.
pub mod executor;
/// Local and remote document locations.
pub mod location;
/// The operation plan data model.
pub mod plan;
/// Validation, snapshotting and step ordering.
pub mod planner;
/// Remote version marker discovery.
pub mod probe;
/// In-process plan execution for the native agent.
pub mod runner;
/// Shell and batch encodings of a plan.
pub mod script;


pub use archive::{ArchiveFetcher, ExtractSummary, extract_archive};
pub use backup::{BackupEntry, allocate_backup_name, list_backups};
pub use executor::{CommitReceipt, DeferredExecutor};
pub use plan::{EntryKind, OperationPlan, Step};
pub use planner::{InstallationSnapshot, UpdatePlanner};
pub use probe::{RemoteVersionProbe, extract_marker, read_document};
pub use runner::{PlanRunner, RunReport, StepFailure};
pub use script::{AgentKind, render_batch, render_shell};
