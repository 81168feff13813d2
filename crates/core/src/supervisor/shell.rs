//! Command shell resolution.
//!
//! The configured start command is a single shell line (`npm run start`),
//! so it runs under whatever shell the host provides rather than being
//! split into argv by hand.

use std::path::PathBuf;

/// Locate an available command shell and the flag that makes it run a
/// command string.
///
/// Prefers `sh`, then `bash`. When neither resolves, the bare name is
/// returned so the spawn error carries a sensible message.
#[cfg(unix)]
pub fn resolve_shell() -> (PathBuf, &'static str) {
    for candidate in ["sh", "bash"] {
        if let Ok(path) = which::which(candidate) {
            return (path, "-c");
        }
    }
    (PathBuf::from("sh"), "-c")
}

/// Locate the Windows command interpreter.
#[cfg(windows)]
pub fn resolve_shell() -> (PathBuf, &'static str) {
    let path = which::which("cmd.exe").unwrap_or_else(|_| PathBuf::from("cmd.exe"));
    (path, "/C")
}
