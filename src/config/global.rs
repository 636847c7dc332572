//! User configuration for selfswap.
//!
//! The configuration lives in a single TOML file:
//!
//! - Unix/macOS: `~/.selfswap/config.toml`
//! - Windows: `%LOCALAPPDATA%\selfswap\config.toml`
//! - Override: `--config <path>` or the `SELFSWAP_CONFIG` environment variable
//!
//! A missing file is not an error; every setting has a default.
//!
//! ```toml
//! [update]
//! version_url = "https://example.com/downloads.html"
//! element_id = "version"
//! archive_url = "https://example.com/app-latest.zip"
//! staging_dir = "update-staging"
//! backup = true
//! backup_prefix = "UpdaterBackup"
//! restart_executable = "app"
//! agent_delay_secs = 5
//! agent = "auto"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::constants::{
    CONFIG_ENV_VAR, DEFAULT_AGENT_DELAY, DEFAULT_BACKUP_PREFIX, DEFAULT_ELEMENT_ID, DEFAULT_STAGING_DIR,
};
use crate::upgrade::AgentKind;

/// Agent selection in the config file; `auto` picks the platform default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentSetting {
    #[default]
    Auto,
    Shell,
    Batch,
    Native,
}

impl AgentSetting {
    #[must_use]
    pub const fn resolve(self) -> AgentKind {
        match self {
            Self::Auto => AgentKind::platform_default(),
            Self::Shell => AgentKind::Shell,
            Self::Batch => AgentKind::Batch,
            Self::Native => AgentKind::Native,
        }
    }
}

fn default_element_id() -> String {
    DEFAULT_ELEMENT_ID.to_string()
}

fn default_staging_dir() -> String {
    DEFAULT_STAGING_DIR.to_string()
}

const fn default_backup() -> bool {
    true
}

fn default_backup_prefix() -> String {
    DEFAULT_BACKUP_PREFIX.to_string()
}

const fn default_agent_delay_secs() -> u64 {
    DEFAULT_AGENT_DELAY.as_secs()
}

/// The `[update]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSection {
    /// Document carrying the remote version marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_url: Option<String>,

    /// `id` attribute of the marker element.
    #[serde(default = "default_element_id")]
    pub element_id: String,

    /// Zip archive of the newest version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_url: Option<String>,

    /// Staging directory, relative to the install root unless absolute.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: String,

    #[serde(default = "default_backup")]
    pub backup: bool,

    #[serde(default = "default_backup_prefix")]
    pub backup_prefix: String,

    /// Executable (relative to the staging directory) relaunched after the swap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_executable: Option<String>,

    #[serde(default = "default_agent_delay_secs")]
    pub agent_delay_secs: u64,

    #[serde(default)]
    pub agent: AgentSetting,

    /// Version of the running installation, for launchers that cannot pass `--current`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,
}

impl Default for UpdateSection {
    fn default() -> Self {
        Self {
            version_url: None,
            element_id: default_element_id(),
            archive_url: None,
            staging_dir: default_staging_dir(),
            backup: default_backup(),
            backup_prefix: default_backup_prefix(),
            restart_executable: None,
            agent_delay_secs: default_agent_delay_secs(),
            agent: AgentSetting::default(),
            current_version: None,
        }
    }
}

impl UpdateSection {
    #[must_use]
    pub const fn agent_delay(&self) -> Duration {
        Duration::from_secs(self.agent_delay_secs)
    }
}

/// The selfswap configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    #[serde(default)]
    pub update: UpdateSection,
}

impl UpdaterConfig {
    /// Load from the default location, or return defaults when there is no file.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use selfswap::config::UpdaterConfig;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let config = UpdaterConfig::load().await?;
    /// println!("staging into {}", config.update.staging_dir);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path`, else from `SELFSWAP_CONFIG`, else from the default location.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => match std::env::var_os(CONFIG_ENV_VAR) {
                Some(path) => PathBuf::from(path),
                None => Self::default_path()?,
            },
        };

        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    ///
    /// # Errors
    ///
    /// - The file cannot be read (permissions, not found, etc.)
    /// - The file contains invalid TOML syntax or unexpected value types
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content).with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Write as pretty TOML, creating parent directories as needed.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Platform-specific default path of the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory (local data directory on Windows) cannot be
    /// determined.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("selfswap")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".selfswap")
        };

        Ok(config_dir.join("config.toml"))
    }
}
