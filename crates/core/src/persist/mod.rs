//! Persistent-folder relocation between deployments and the durable store.
//!
//! Configured folders (uploaded user files, caches) must survive version
//! switches. Before a new version goes live they are moved out of the
//! outgoing deployment into the persistent store (`backup_folders`), and
//! moved back into the incoming deployment afterwards (`restore_folders`).
//!
//! Relocation transfers ownership: after a backup the deployment no longer
//! contains the folder, and after a restore the store no longer does. A
//! folder is never duplicated between the two sides.

pub mod error;
pub mod paths;

pub use error::PersistError;
pub use error::PersistResult;
pub use paths::parse_folder_specs;
pub use paths::validate_folder_path;

use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Move the configured folders out of a deployment into the persistent
/// store.
///
/// For each spec: any stale copy at `store_root/spec` is removed first,
/// then `deployment_path/spec` is moved into its place. Specs whose source
/// folder does not exist are skipped silently (a first-ever deploy has
/// nothing to back up). The whole call is a no-op when `specs` is empty or
/// the deployment path does not exist.
///
/// # Errors
///
/// Returns `PersistError::InvalidPath` for a malformed spec, or
/// `PersistError::MoveFailed`/`PersistError::Io` when the filesystem
/// refuses a relocation step.
pub async fn backup_folders(
    deployment_path: &Path,
    store_root: &Path,
    specs: &[String],
) -> PersistResult<()> {
    if specs.is_empty() {
        debug!("no persistent folders configured, skipping backup");
        return Ok(());
    }
    if !deployment_path.exists() {
        debug!(
            deployment = %deployment_path.display(),
            "no deployment to back up persistent folders from"
        );
        return Ok(());
    }

    ensure_dir(store_root)?;

    for spec in specs {
        let canonical = paths::validate_folder_path(spec)?;
        debug!(folder = %canonical, "backing up persistent folder");
        relocate(
            &deployment_path.join(&canonical),
            &store_root.join(&canonical),
        )?;
    }

    Ok(())
}

/// Move previously backed-up folders from the persistent store into a
/// deployment.
///
/// Mirror of [`backup_folders`]: any pre-existing `deployment_path/spec`
/// (e.g. an empty folder created by extraction) is removed before
/// `store_root/spec` is moved into its place. Specs with no backed-up copy
/// are skipped silently. No-op when `specs` is empty or the deployment
/// path does not exist.
///
/// # Errors
///
/// Same failure modes as [`backup_folders`].
pub async fn restore_folders(
    deployment_path: &Path,
    store_root: &Path,
    specs: &[String],
) -> PersistResult<()> {
    if specs.is_empty() {
        debug!("no persistent folders configured, skipping restore");
        return Ok(());
    }
    if !deployment_path.exists() {
        debug!(
            deployment = %deployment_path.display(),
            "no deployment to restore persistent folders to"
        );
        return Ok(());
    }

    for spec in specs {
        let canonical = paths::validate_folder_path(spec)?;
        debug!(folder = %canonical, "restoring persistent folder");
        relocate(
            &store_root.join(&canonical),
            &deployment_path.join(&canonical),
        )?;
    }

    Ok(())
}

/// Move one folder from `source` to `target`, replacing any stale copy at
/// the target and skipping silently when the source does not exist.
fn relocate(source: &Path, target: &Path) -> PersistResult<()> {
    if target.exists() {
        debug!(target = %target.display(), "removing stale copy");
        fs::remove_dir_all(target).map_err(|e| PersistError::Io {
            path: target.to_path_buf(),
            source: e,
        })?;
    }

    if !source.exists() {
        debug!(source = %source.display(), "nothing to relocate");
        return Ok(());
    }

    move_dir(source, target)
}

/// Move a directory tree, preferring an atomic rename.
///
/// When the rename fails because source and target live on different
/// filesystems, fall back to a recursive copy followed by removal of the
/// source. Parent directories of the target are created first so nested
/// specs like `frontend/node_modules` place correctly.
fn move_dir(from: &Path, to: &Path) -> PersistResult<()> {
    if let Some(parent) = to.parent() {
        ensure_dir(parent)?;
    }

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(
                from = %from.display(),
                to = %to.display(),
                "rename crossed filesystems, falling back to copy"
            );
            copy_dir_all(from, to)?;
            fs::remove_dir_all(from).map_err(|e| PersistError::Io {
                path: from.to_path_buf(),
                source: e,
            })
        }
        Err(e) => Err(PersistError::MoveFailed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: e,
        }),
    }
}

fn copy_dir_all(from: &Path, to: &Path) -> PersistResult<()> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| PersistError::Io {
            path: from.to_path_buf(),
            source: e
                .into_io_error()
                .unwrap_or_else(|| io::Error::other("directory walk failed")),
        })?;

        let relative = entry.path().strip_prefix(from).map_err(|e| PersistError::Io {
            path: entry.path().to_path_buf(),
            source: io::Error::other(e),
        })?;
        let dest = to.join(relative);

        if entry.file_type().is_dir() {
            ensure_dir(&dest)?;
        } else {
            fs::copy(entry.path(), &dest).map_err(|e| PersistError::Io {
                path: dest.clone(),
                source: e,
            })?;
        }
    }
    Ok(())
}

fn ensure_dir(path: &Path) -> PersistResult<()> {
    fs::create_dir_all(path).map_err(|e| PersistError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
