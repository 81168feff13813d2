//! Agent configuration load/save.
//!
//! The configuration lives as pretty-printed JSON (`config.json`) in the
//! agent data directory. A missing file is not an error: defaults are
//! written out so the file exists from the first run onward.

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use dk_protocol::config_models::AgentConfig;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Load the agent configuration from `path`.
///
/// When the file does not exist yet, the default configuration is written
/// to `path` and returned.
///
/// # Errors
///
/// Returns `ConfigError` when the file exists but cannot be read or is not
/// valid JSON.
pub async fn load_config(path: &Path) -> ConfigResult<AgentConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file yet, writing defaults");
        let config = AgentConfig::default();
        save_config(path, &config).await?;
        return Ok(config);
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let config = serde_json::from_str(&content).map_err(|source| ConfigError::JsonParse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(config)
}

/// Save the agent configuration to `path` as pretty-printed JSON.
///
/// # Errors
///
/// Returns `ConfigError` when the parent directory or the file cannot be
/// written.
pub async fn save_config(path: &Path, config: &AgentConfig) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::DirectoryCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|source| ConfigError::JsonSerialize { source })?;

    fs::write(path, content).map_err(|source| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}
