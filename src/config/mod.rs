//! Configuration management for selfswap
//!
//! selfswap reads one optional TOML file holding the defaults of the update pipeline:
//! where to probe for the remote version, where to download the archive from, and how to
//! stage, back up and restart. Command-line flags always override file values.
//!
//! # Modules
//!
//! - `global` - The [`UpdaterConfig`] file, its `[update]` section and its location
//!
//! # Configuration Files
//!
//! **Location:**
//! - Unix/macOS: `~/.selfswap/config.toml`
//! - Windows: `%LOCALAPPDATA%\selfswap\config.toml`
//!
//! See [`global`] for the full list of settings.

pub mod global;

pub use global::{AgentSetting, UpdateSection, UpdaterConfig};
