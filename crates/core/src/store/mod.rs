//! Versioned deployment store.
//!
//! Every upload lands in a fresh directory under one deployments root. The
//! directory name is the upload timestamp with `:` and `.` replaced by `-`
//! (e.g. `2025-06-17T13-53-57-029Z`), so sorting names descending sorts
//! deployments newest first. Old deployments are pruned by rotation;
//! retained ones stay available as rollback targets.

pub mod error;

pub use error::StoreError;
pub use error::StoreResult;

use chrono::DateTime;
use chrono::Utc;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing::info;

/// Number of deployments retained after rotation.
pub const RETAIN_DEPLOYMENTS: usize = 5;

/// One versioned, extracted copy of an uploaded application bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    /// Timestamp-derived directory name; lexicographic order is
    /// chronological order.
    pub name: String,
    /// Absolute path of the deployment directory.
    pub path: PathBuf,
}

/// Manages timestamp-named deployment directories under one root.
pub struct DeploymentStore {
    root: PathBuf,
}

impl DeploymentStore {
    /// Create a store over the given deployments root. The root itself is
    /// created lazily on the first `create` call.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The deployments root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a new empty deployment slot named after the current time.
    ///
    /// The caller extracts the uploaded bundle into the returned path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DirectoryCreate` when the directory cannot be
    /// created.
    pub async fn create(&self) -> StoreResult<Deployment> {
        let mut name = timestamp_name(Utc::now());
        // Two uploads in the same millisecond would collide; retake the
        // clock until the slot name is free.
        while self.root.join(&name).exists() {
            tokio::time::sleep(Duration::from_millis(2)).await;
            name = timestamp_name(Utc::now());
        }

        let path = self.root.join(&name);
        fs::create_dir_all(&path).map_err(|source| StoreError::DirectoryCreate {
            path: path.clone(),
            source,
        })?;
        info!(name = %name, "created deployment slot");

        Ok(Deployment { name, path })
    }

    /// List retained deployment names, newest first.
    ///
    /// A missing root reads as an empty store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DirectoryList` when the root cannot be read.
    pub async fn list(&self) -> StoreResult<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.root).map_err(|source| StoreError::DirectoryList {
            path: self.root.clone(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::DirectoryList {
                path: self.root.clone(),
                source,
            })?;
            let is_dir = entry
                .file_type()
                .map_err(|source| StoreError::DirectoryList {
                    path: entry.path(),
                    source,
                })?
                .is_dir();
            if !is_dir {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        names.sort_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// Delete every deployment beyond the `retain` most recent ones.
    ///
    /// The deployment named by `current` is never deleted, even when it
    /// falls outside the retention window. Returns the names that were
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DirectoryDelete` when a removal fails; earlier
    /// removals in the same call stay deleted.
    pub async fn rotate(&self, retain: usize, current: Option<&str>) -> StoreResult<Vec<String>> {
        let names = self.list().await?;
        let mut deleted = Vec::new();

        for name in names.iter().skip(retain) {
            if current == Some(name.as_str()) {
                debug!(name = %name, "keeping current deployment during rotation");
                continue;
            }
            let path = self.root.join(name);
            fs::remove_dir_all(&path).map_err(|source| StoreError::DirectoryDelete {
                path: path.clone(),
                source,
            })?;
            info!(name = %name, "deleted rotated deployment");
            deleted.push(name.clone());
        }

        Ok(deleted)
    }

    /// Resolve a deployment name to its directory path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::VersionNotFound` when no directory with that
    /// exact name exists under the root. Names carrying path separators or
    /// dot segments never resolve.
    pub async fn resolve(&self, name: &str) -> StoreResult<PathBuf> {
        let not_found = || StoreError::VersionNotFound {
            name: name.to_string(),
        };

        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(not_found());
        }

        let path = self.root.join(name);
        if path.is_dir() {
            Ok(path)
        } else {
            Err(not_found())
        }
    }
}

/// Render a timestamp as a deployment name: ISO-8601 with `:` and `.`
/// replaced by `-`.
fn timestamp_name(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}
