//! Error types for process supervision.

use thiserror::Error;

/// Errors that can occur when starting the supervised process.
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// A process is already active; it is left untouched.
    #[error("Application process is already running")]
    AlreadyRunning,

    /// The command or working directory has not been configured yet.
    #[error("Cannot start: {what} is not configured")]
    ConfigMissing { what: &'static str },

    /// The shell process could not be spawned.
    #[error("Failed to spawn command {command:?}: {source}")]
    SpawnFailed {
        command: String,
        source: std::io::Error,
    },
}

/// Type alias for Result with SupervisorError.
pub type SupervisorResult<T> = Result<T, SupervisorError>;
