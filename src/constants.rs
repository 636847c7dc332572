//! Global constants used throughout the selfswap codebase.
//!
//! Default names and durations shared by the planner, the executor, the config layer
//! and the CLI. Defining them centrally keeps the config defaults and the library
//! defaults from drifting apart.

use std::time::Duration;

/// Default delay before the deferred agent touches the install directory (5 seconds).
///
/// The invoking process must have exited and released its file handles by then. This is
/// a heuristic wait, not a synchronization primitive.
pub const DEFAULT_AGENT_DELAY: Duration = Duration::from_secs(5);

/// Default prefix of backup directory names (`UpdaterBackup_<timestamp>`).
pub const DEFAULT_BACKUP_PREFIX: &str = "UpdaterBackup";

/// Default `id` attribute of the remote version marker element.
pub const DEFAULT_ELEMENT_ID: &str = "version";

/// Default name of the staging directory created inside the install root.
pub const DEFAULT_STAGING_DIR: &str = "update-staging";

/// Helper artifact executed by `sh` on Unix-like systems.
pub const SHELL_HELPER_NAME: &str = "selfswap-agent.sh";

/// Helper artifact executed by `cmd` on Windows.
pub const BATCH_HELPER_NAME: &str = "selfswap-agent.bat";

/// Helper artifact read by the native agent.
pub const NATIVE_HELPER_NAME: &str = "selfswap-plan.json";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "SELFSWAP_CONFIG";

/// Environment variable disabling progress bars.
pub const NO_PROGRESS_ENV_VAR: &str = "SELFSWAP_NO_PROGRESS";

/// Timeout for fetching the version marker document (30 seconds).
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);
