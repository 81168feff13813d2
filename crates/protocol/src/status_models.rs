//! Status snapshot structures.
//!
//! A status snapshot combines the supervisor's running flag with the
//! persisted configuration. Presentation surfaces (the CLI, a transport
//! layer) serialize it as-is.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::config_models::AgentConfig;

/// Point-in-time view of the agent, as reported to callers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    /// Whether the supervised application process is currently running.
    pub running: bool,

    /// Shell command used to start the application.
    pub command: String,

    /// Name of the current deployment, if any.
    pub current_deployment: Option<String>,

    /// Path of the current deployment.
    pub base_path: Option<String>,

    /// Timestamp of the last upload or rollback.
    pub last_upload_date: Option<DateTime<Utc>>,

    /// Selected environment file name.
    pub selected_env: Option<String>,

    /// Configured persistent folder spec string.
    #[serde(rename = "persistentFoldersUI")]
    pub persistent_folders_ui: Option<String>,
}

impl AgentStatus {
    /// Build a snapshot from the persisted configuration and the
    /// supervisor's running flag.
    pub fn from_config(config: &AgentConfig, running: bool) -> Self {
        Self {
            running,
            command: config.command.clone(),
            current_deployment: config.current_deployment(),
            base_path: config
                .base_path
                .as_deref()
                .map(|p| p.display().to_string()),
            last_upload_date: config.last_upload_date,
            selected_env: config.selected_env.clone(),
            persistent_folders_ui: config.persistent_folders_ui.clone(),
        }
    }
}
