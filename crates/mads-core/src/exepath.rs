//! Executable path discovery (C7): resolve the running binary's path and
//! derive the installation prefix as the parent of its containing directory.

use std::path::PathBuf;

use crate::error::{MadsError, Result};

pub fn current_exe() -> Result<PathBuf> {
    std::env::current_exe().map_err(MadsError::Io)
}

/// The installation prefix: parent of the directory containing the binary
/// (e.g. `/usr/local/bin/mads-agent` -> `/usr/local`).
pub fn install_prefix() -> Result<PathBuf> {
    let exe = current_exe()?;
    let bin_dir = exe
        .parent()
        .ok_or_else(|| MadsError::Config("executable has no parent directory".into()))?;
    let prefix = bin_dir
        .parent()
        .ok_or_else(|| MadsError::Config("bin directory has no parent".into()))?;
    Ok(prefix.to_path_buf())
}

/// Name derived from the invoked binary, stripping a known prefix (e.g.
/// `mads-agent-echo` with prefix `mads-agent-` -> `echo`).
pub fn derive_name(exe_name: &str, strip_prefix: &str) -> String {
    exe_name
        .strip_prefix(strip_prefix)
        .unwrap_or(exe_name)
        .to_string()
}

/// Re-exec the current process with the same argv. Shared by the broker's
/// `x` reload path (C4) and the agent runtime's restart path (§4.5.5):
/// restart is "implemented by re-executing the same binary with the same
/// argv; this sidesteps needing a hot-reload path through the agent's own
/// state" (Design Notes).
pub fn reexec_self() -> Result<std::convert::Infallible> {
    let exe = current_exe()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    reexec(&exe, &args)
}

#[cfg(unix)]
fn reexec(exe: &std::path::Path, args: &[String]) -> Result<std::convert::Infallible> {
    use std::os::unix::process::CommandExt;
    let err = std::process::Command::new(exe).args(args).exec();
    Err(MadsError::Lifecycle(format!("re-exec failed: {err}")))
}

#[cfg(not(unix))]
fn reexec(exe: &std::path::Path, args: &[String]) -> Result<std::convert::Infallible> {
    let status = std::process::Command::new(exe)
        .args(args)
        .status()
        .map_err(MadsError::Io)?;
    std::process::exit(status.code().unwrap_or(1));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_name_strips_known_prefix() {
        assert_eq!(derive_name("mads-agent-echo", "mads-agent-"), "echo");
    }

    #[test]
    fn derive_name_passes_through_unknown_prefix() {
        assert_eq!(derive_name("echo", "mads-agent-"), "echo");
    }

    #[test]
    fn install_prefix_resolves() {
        assert!(install_prefix().is_ok());
    }
}
