//! Error types for persistent-folder relocation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while validating folder specs or relocating
/// folders between a deployment and the persistent store.
#[derive(Error, Debug)]
pub enum PersistError {
    /// A folder spec failed validation.
    #[error("Invalid folder path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// A rename failed for a reason other than crossing filesystems.
    #[error("Failed to move {from:?} to {to:?}: {source}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    /// An auxiliary filesystem operation (removal, directory creation,
    /// copy during the cross-device fallback) failed.
    #[error("Failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Type alias for Result with PersistError.
pub type PersistResult<T> = Result<T, PersistError>;
