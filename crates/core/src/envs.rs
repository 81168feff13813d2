//! Environment-file store.
//!
//! Environment files live in the data directory as `.env.<name>` and hold
//! `KEY=VALUE` pairs. The selected file's pairs are applied on top of the
//! host environment when the application starts; lookup and parsing happen
//! here, the supervisor only consumes the merged mapping.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while managing environment files.
#[derive(Error, Debug)]
pub enum EnvsError {
    /// The name contains characters outside `[A-Za-z0-9_-]`.
    #[error("Invalid environment name: {name:?}")]
    InvalidName { name: String },

    /// No environment file with that name exists.
    #[error("Environment not found: {name}")]
    NotFound { name: String },

    /// Failed to read an environment file.
    #[error("Failed to read environment file {path:?}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write an environment file.
    #[error("Failed to write environment file {path:?}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to delete an environment file.
    #[error("Failed to delete environment file {path:?}: {source}")]
    FileDelete {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to enumerate the envs directory.
    #[error("Failed to list environment files under {path:?}: {source}")]
    DirectoryList {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The environment file is not parseable as KEY=VALUE lines.
    #[error("Failed to parse environment file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: dotenvy::Error,
    },
}

/// Type alias for Result with EnvsError.
pub type EnvsResult<T> = Result<T, EnvsError>;

const ENV_FILE_PREFIX: &str = ".env.";

/// List environment names, i.e. the `<name>` part of every `.env.<name>`
/// file. A missing directory reads as an empty list.
///
/// # Errors
///
/// Returns `EnvsError::DirectoryList` when the directory cannot be read.
pub async fn list_envs(envs_dir: &Path) -> EnvsResult<Vec<String>> {
    if !envs_dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(envs_dir).map_err(|source| EnvsError::DirectoryList {
        path: envs_dir.to_path_buf(),
        source,
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| EnvsError::DirectoryList {
            path: envs_dir.to_path_buf(),
            source,
        })?;
        let file_name = entry.file_name();
        if let Some(name) = file_name
            .to_str()
            .and_then(|f| f.strip_prefix(ENV_FILE_PREFIX))
        {
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }
    }

    names.sort();
    Ok(names)
}

/// Read the raw content of the named environment file.
///
/// # Errors
///
/// `EnvsError::InvalidName` for a malformed name, `EnvsError::NotFound`
/// when the file does not exist.
pub async fn read_env(envs_dir: &Path, name: &str) -> EnvsResult<String> {
    let path = env_file_path(envs_dir, name)?;
    if !path.exists() {
        return Err(EnvsError::NotFound {
            name: name.to_string(),
        });
    }
    fs::read_to_string(&path).map_err(|source| EnvsError::FileRead { path, source })
}

/// Create or replace the named environment file.
///
/// # Errors
///
/// `EnvsError::InvalidName` for a malformed name, `EnvsError::FileWrite`
/// when the file cannot be written.
pub async fn write_env(envs_dir: &Path, name: &str, content: &str) -> EnvsResult<()> {
    let path = env_file_path(envs_dir, name)?;
    fs::create_dir_all(envs_dir).map_err(|source| EnvsError::FileWrite {
        path: envs_dir.to_path_buf(),
        source,
    })?;
    debug!(env = name, "saving environment file");
    fs::write(&path, content).map_err(|source| EnvsError::FileWrite { path, source })
}

/// Delete the named environment file.
///
/// # Errors
///
/// `EnvsError::InvalidName` for a malformed name, `EnvsError::NotFound`
/// when the file does not exist.
pub async fn delete_env(envs_dir: &Path, name: &str) -> EnvsResult<()> {
    let path = env_file_path(envs_dir, name)?;
    if !path.exists() {
        return Err(EnvsError::NotFound {
            name: name.to_string(),
        });
    }
    debug!(env = name, "deleting environment file");
    fs::remove_file(&path).map_err(|source| EnvsError::FileDelete { path, source })
}

/// Parse the named environment file into key/value pairs.
///
/// # Errors
///
/// `EnvsError::NotFound` when the file does not exist, `EnvsError::Parse`
/// when a line is not a valid `KEY=VALUE` entry.
pub async fn load_env_file(envs_dir: &Path, name: &str) -> EnvsResult<HashMap<String, String>> {
    let path = env_file_path(envs_dir, name)?;
    if !path.exists() {
        return Err(EnvsError::NotFound {
            name: name.to_string(),
        });
    }

    let iter = dotenvy::from_path_iter(&path).map_err(|source| EnvsError::Parse {
        path: path.clone(),
        source,
    })?;

    let mut vars = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|source| EnvsError::Parse {
            path: path.clone(),
            source,
        })?;
        vars.insert(key, value);
    }

    Ok(vars)
}

fn env_file_path(envs_dir: &Path, name: &str) -> EnvsResult<PathBuf> {
    validate_name(name)?;
    Ok(envs_dir.join(format!("{ENV_FILE_PREFIX}{name}")))
}

fn validate_name(name: &str) -> EnvsResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(EnvsError::InvalidName {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_list_read_delete_round_trip() {
        let dir = tempdir().expect("temp dir");
        let envs_dir = dir.path().join("env-configs");

        write_env(&envs_dir, "production", "PORT=8080\nAPI_KEY=secret\n")
            .await
            .expect("write should succeed");
        write_env(&envs_dir, "staging", "PORT=8081\n")
            .await
            .expect("write should succeed");

        let names = list_envs(&envs_dir).await.expect("list should succeed");
        assert_eq!(names, vec!["production", "staging"]);

        let content = read_env(&envs_dir, "production")
            .await
            .expect("read should succeed");
        assert!(content.contains("PORT=8080"));

        delete_env(&envs_dir, "staging")
            .await
            .expect("delete should succeed");
        let names = list_envs(&envs_dir).await.expect("list should succeed");
        assert_eq!(names, vec!["production"]);
    }

    #[tokio::test]
    async fn test_list_on_missing_directory_is_empty() {
        let dir = tempdir().expect("temp dir");
        let names = list_envs(&dir.path().join("nowhere"))
            .await
            .expect("missing directory should read as empty");
        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_names_are_rejected() {
        let dir = tempdir().expect("temp dir");
        for name in ["", "pro/duction", "../evil", "a b", ".hidden"] {
            let result = write_env(dir.path(), name, "X=1").await;
            assert!(
                matches!(result, Err(EnvsError::InvalidName { .. })),
                "{name:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_read_and_delete_missing_env_fail() {
        let dir = tempdir().expect("temp dir");
        assert!(matches!(
            read_env(dir.path(), "ghost").await,
            Err(EnvsError::NotFound { .. })
        ));
        assert!(matches!(
            delete_env(dir.path(), "ghost").await,
            Err(EnvsError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_env_file_parses_pairs() {
        let dir = tempdir().expect("temp dir");
        let envs_dir = dir.path().join("env-configs");
        write_env(
            &envs_dir,
            "production",
            "# comment\nPORT=8080\nNAME=\"quoted value\"\n",
        )
        .await
        .expect("write should succeed");

        let vars = load_env_file(&envs_dir, "production")
            .await
            .expect("parse should succeed");
        assert_eq!(vars.get("PORT").map(String::as_str), Some("8080"));
        assert_eq!(vars.get("NAME").map(String::as_str), Some("quoted value"));
        assert!(!vars.contains_key("# comment"));
    }
}
