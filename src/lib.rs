//! selfswap - in-place self-update for locally installed applications
//!
//! selfswap answers two questions for an installed application: is a newer version
//! published, and how can the installation be replaced while one of its own programs is
//! still running? The first is a version marker probe plus a dotted-numeric comparison.
//! The second is a two-stage protocol: a read-only planner computes an ordered list of
//! file operations, and a detached agent executes it after the invoking process exits.
//!
//! # Architecture Overview
//!
//! ```text
//! RemoteVersionProbe ─► compare ─► ArchiveFetcher ─► UpdatePlanner ─► DeferredExecutor
//!   (version marker)   (version)   (staging dir)     (OperationPlan)   (detached agent)
//! ```
//!
//! # Core Modules
//!
//! - [`version`] - Dotted-numeric version parsing and comparison
//! - [`upgrade`] - Probe, archive staging, planning, backups and the deferred agent
//! - [`config`] - The optional `~/.selfswap/config.toml`
//! - [`core`] - Error taxonomy and user-facing error reporting
//! - [`cli`] - Command-line interface
//! - [`utils`] - File system, platform and progress helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use selfswap::upgrade::{AgentKind, ArchiveFetcher, DeferredExecutor, RemoteVersionProbe, UpdatePlanner};
//! use selfswap::version::compare;
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let root = Path::new("/opt/app");
//! let remote = RemoteVersionProbe::new()?.fetch("https://example.com/downloads.html", "version").await?;
//!
//! if compare("1.0.3", &remote)?.is_update() {
//!     let staging = root.join("update-staging");
//!     ArchiveFetcher::new()?.fetch_and_stage("https://example.com/app.zip", &staging).await?;
//!
//!     let plan = UpdatePlanner::new(root).plan(&staging, Some("app"), true)?;
//!     DeferredExecutor::new(AgentKind::platform_default()).commit(&plan)?;
//!     std::process::exit(0);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod upgrade;
pub mod utils;
pub mod version;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
