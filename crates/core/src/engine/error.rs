//! Error type for deployment pipelines.

use crate::archive::ArchiveError;
use crate::config::ConfigError;
use crate::envs::EnvsError;
use crate::persist::PersistError;
use crate::store::StoreError;
use crate::supervisor::SupervisorError;
use std::path::PathBuf;
use thiserror::Error;

/// Aggregated error surfaced by the deployment pipelines.
///
/// Each variant carries the failing component's own error; the pipeline
/// does not undo stages completed before the failure.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Envs(#[from] EnvsError),

    /// The agent data directory could not be initialized.
    #[error("Failed to prepare data directory {path:?}: {source}")]
    DataDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Type alias for Result with DeployError.
pub type DeployResult<T> = Result<T, DeployError>;
