//! Persisted agent configuration models.
//!
//! This module defines the structure of the agent's `config.json` file,
//! which records the supervised command, the current deployment pointer,
//! and the persistent-folder configuration.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::path::PathBuf;

/// Default command used to launch the deployed application when no command
/// has been configured yet.
pub const DEFAULT_COMMAND: &str = "npm run start";

/// Agent configuration persisted as `config.json` in the data directory.
///
/// Missing fields fall back to their defaults so that configs written by
/// older agents keep loading.
///
/// # Example
///
/// ```json
/// {
///   "command": "npm run start",
///   "basePath": "/srv/agent/data/deployments/2025-06-17T13-53-57-029Z",
///   "lastUploadDate": "2025-06-17T13:53:57.029Z",
///   "selectedEnv": "production",
///   "persistentFoldersUI": "uploads,frontend/node_modules"
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Shell command used to start the deployed application.
    pub command: String,

    /// Path of the current deployment, used as the child process's working
    /// directory. `None` until the first upload or rollback.
    pub base_path: Option<PathBuf>,

    /// Timestamp of the last upload or rollback.
    pub last_upload_date: Option<DateTime<Utc>>,

    /// Name of the selected environment file (without the `.env.` prefix).
    pub selected_env: Option<String>,

    /// Comma-separated list of relative folder paths that survive version
    /// switches (e.g. `uploads,frontend/node_modules`).
    #[serde(rename = "persistentFoldersUI")]
    pub persistent_folders_ui: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            base_path: None,
            last_upload_date: None,
            selected_env: None,
            persistent_folders_ui: None,
        }
    }
}

impl AgentConfig {
    /// Name of the current deployment, i.e. the final component of
    /// `base_path`.
    pub fn current_deployment(&self) -> Option<String> {
        self.base_path
            .as_deref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
    }
}
