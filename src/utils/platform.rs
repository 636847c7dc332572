//! Platform-specific helpers: process detachment and shell quoting.
//!
//! The deferred agent and the relaunched application must outlive the process that
//! started them, and must not hold on to its stdio handles. [`spawn_detached`] takes
//! care of both on Unix (new process group) and Windows (detached console process).

use std::process::{Command, Stdio};

/// Windows `DETACHED_PROCESS` creation flag.
#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x0000_0008;

/// Windows `CREATE_NEW_PROCESS_GROUP` creation flag.
#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// Checks if the current platform is Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Spawn `command` detached from the current process, with all stdio discarded.
///
/// Returns the child's process id. The child is never waited on.
pub fn spawn_detached(command: &mut Command) -> std::io::Result<u32> {
    command.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
    }

    let child = command.spawn()?;
    Ok(child.id())
}

/// Quote `value` for a POSIX shell using single quotes.
#[must_use]
pub fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Quote `value` for `cmd.exe` using double quotes.
///
/// Double quotes cannot appear in Windows file names, so they are dropped.
#[must_use]
pub fn cmd_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', ""))
}
