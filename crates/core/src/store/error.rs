//! Error types for the deployment store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while managing deployment directories.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No retained deployment has the requested name.
    #[error("Deployment version not found: {name}")]
    VersionNotFound { name: String },

    /// Failed to create a deployment directory.
    #[error("Failed to create deployment directory {path:?}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to enumerate the deployments root.
    #[error("Failed to list deployments under {path:?}: {source}")]
    DirectoryList {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to delete a rotated deployment.
    #[error("Failed to delete deployment {path:?}: {source}")]
    DirectoryDelete {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Type alias for Result with StoreError.
pub type StoreResult<T> = Result<T, StoreError>;
