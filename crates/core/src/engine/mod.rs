//! Deployment pipeline sequencing.
//!
//! The `DeployEngine` drives the upload and rollback pipelines over the
//! supervisor, the deployment store, and the persistent-folder relocator:
//! stop, backup, stage the target version, switch the current pointer,
//! restore, start.
//!
//! Pipelines are fail-fast and not transactional: a stage failure aborts
//! the remaining stages and already-completed stages are not undone. A
//! failure between backup and restore therefore leaves the system
//! partially migrated and in need of a manual rollback, so every stage
//! logs enough context to reconstruct what happened.
//!
//! The engine itself holds no cross-pipeline lock; callers must not run
//! two pipelines concurrently.

pub mod error;

pub use error::DeployError;
pub use error::DeployResult;

use crate::archive;
use crate::config;
use crate::envs;
use crate::persist;
use crate::store::DeploymentStore;
use crate::store::RETAIN_DEPLOYMENTS;
use crate::supervisor::ProcessSupervisor;
use chrono::Utc;
use dk_protocol::config_models::AgentConfig;
use dk_protocol::status_models::AgentStatus;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::error;
use tracing::info;
use tracing::warn;

/// A partial configuration update; `None` fields are left unchanged and
/// empty strings clear the optional fields.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    /// New start command.
    pub command: Option<String>,
    /// New selected environment name; empty clears the selection.
    pub selected_env: Option<String>,
    /// New persistent-folder spec string; empty clears it.
    pub persistent_folders: Option<String>,
}

/// Sequences deployments over one data directory.
///
/// The data directory holds `uploads/`, `deployments/`, `env-configs/`,
/// `persistent/`, and `config.json`. The "current deployment" pointer is
/// the configuration's `basePath`.
pub struct DeployEngine {
    data_dir: PathBuf,
    store: DeploymentStore,
    supervisor: Arc<ProcessSupervisor>,
    config: Mutex<AgentConfig>,
}

impl DeployEngine {
    /// Open (or initialize) an agent data directory with a default
    /// supervisor.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::DataDir` when the directory layout cannot be
    /// created, or a `DeployError::Config` when `config.json` exists but
    /// cannot be read.
    pub async fn open(data_dir: impl Into<PathBuf>) -> DeployResult<Self> {
        Self::with_supervisor(data_dir, ProcessSupervisor::new()).await
    }

    /// Open an agent data directory with a custom-configured supervisor.
    pub async fn with_supervisor(
        data_dir: impl Into<PathBuf>,
        supervisor: ProcessSupervisor,
    ) -> DeployResult<Self> {
        let data_dir = data_dir.into();

        let deployments_dir = data_dir.join("deployments");
        for dir in [
            data_dir.join("uploads"),
            deployments_dir.clone(),
            data_dir.join("env-configs"),
            data_dir.join("persistent"),
        ] {
            fs::create_dir_all(&dir).map_err(|source| DeployError::DataDir {
                path: dir.clone(),
                source,
            })?;
        }

        let config = config::load_config(&data_dir.join("config.json")).await?;

        Ok(Self {
            data_dir,
            store: DeploymentStore::new(deployments_dir),
            supervisor: Arc::new(supervisor),
            config: Mutex::new(config),
        })
    }

    /// Handle to the supervisor, e.g. for subscribing to process events.
    pub fn supervisor(&self) -> Arc<ProcessSupervisor> {
        Arc::clone(&self.supervisor)
    }

    /// Directory where uploaded bundles are staged.
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    /// Directory holding the `.env.<name>` files.
    pub fn envs_dir(&self) -> PathBuf {
        self.data_dir.join("env-configs")
    }

    fn persistent_dir(&self) -> PathBuf {
        self.data_dir.join("persistent")
    }

    fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    /// Run the upload pipeline for a bundle on disk and return the new
    /// deployment's name.
    ///
    /// Stages: stop, backup persistent folders, create + extract into a
    /// new deployment slot, rotate, switch the current pointer, restore
    /// persistent folders, start.
    ///
    /// # Errors
    ///
    /// Any stage failure aborts the remaining stages and surfaces here;
    /// completed stages are not undone.
    pub async fn deploy(&self, archive_path: &Path) -> DeployResult<String> {
        let mut config = self.config.lock().await;
        let specs = folder_specs(&config)?;

        info!(archive = %archive_path.display(), "starting upload pipeline");
        self.supervisor.stop().await;

        if let Some(base) = config.base_path.clone() {
            persist::backup_folders(&base, &self.persistent_dir(), &specs).await?;
        }

        let deployment = self.store.create().await?;
        archive::extract(archive_path, &deployment.path).await?;
        self.store
            .rotate(RETAIN_DEPLOYMENTS, Some(&deployment.name))
            .await?;
        self.discard_staged_upload(archive_path);

        config.base_path = Some(deployment.path.clone());
        config.last_upload_date = Some(Utc::now());
        config::save_config(&self.config_path(), &config).await?;

        persist::restore_folders(&deployment.path, &self.persistent_dir(), &specs).await?;

        self.start_with(&config).await?;
        info!(deployment = %deployment.name, "upload pipeline completed");

        Ok(deployment.name)
    }

    /// Run the rollback pipeline to a retained deployment.
    ///
    /// The target version is resolved before anything is stopped, so an
    /// unknown version leaves the running process untouched.
    ///
    /// # Errors
    ///
    /// `DeployError::Store(StoreError::VersionNotFound)` when the version
    /// does not exist; otherwise the same fail-fast semantics as
    /// [`Self::deploy`].
    pub async fn rollback(&self, version: &str) -> DeployResult<()> {
        let mut config = self.config.lock().await;
        let specs = folder_specs(&config)?;

        // Confirm the target exists before touching the running process.
        let target = self.store.resolve(version).await?;

        info!(version, "starting rollback pipeline");
        self.supervisor.stop().await;

        if let Some(base) = config.base_path.clone() {
            persist::backup_folders(&base, &self.persistent_dir(), &specs).await?;
        }

        config.base_path = Some(target.clone());
        config.last_upload_date = Some(Utc::now());
        config::save_config(&self.config_path(), &config).await?;

        persist::restore_folders(&target, &self.persistent_dir(), &specs).await?;

        self.start_with(&config).await?;
        info!(version, "rollback pipeline completed");

        Ok(())
    }

    /// Start the application from the current configuration.
    ///
    /// # Errors
    ///
    /// Surfaces `SupervisorError::AlreadyRunning` and configuration
    /// errors from the supervisor.
    pub async fn start_app(&self) -> DeployResult<()> {
        let config = self.config.lock().await;
        self.start_with(&config).await
    }

    /// Stop the application. Returns whether a stop sequence was
    /// initiated for a previously running process.
    pub async fn stop_app(&self) -> bool {
        self.supervisor.stop().await
    }

    /// Current status snapshot: running flag plus configuration.
    pub async fn status(&self) -> AgentStatus {
        let config = self.config.lock().await;
        AgentStatus::from_config(&config, self.supervisor.is_running().await)
    }

    /// Retained deployment names, newest first.
    pub async fn deployments(&self) -> DeployResult<Vec<String>> {
        Ok(self.store.list().await?)
    }

    /// Apply a partial configuration update and persist it.
    ///
    /// A new persistent-folder spec string is validated before it is
    /// accepted so a bad spec surfaces here rather than mid-pipeline.
    ///
    /// # Errors
    ///
    /// `DeployError::Persist(PersistError::InvalidPath)` for a bad folder
    /// spec, or a `DeployError::Config` when saving fails.
    pub async fn update_config(&self, update: ConfigUpdate) -> DeployResult<AgentConfig> {
        let mut config = self.config.lock().await;

        if let Some(command) = update.command {
            config.command = command;
        }
        if let Some(selected_env) = update.selected_env {
            config.selected_env = none_if_empty(selected_env);
        }
        if let Some(folders) = update.persistent_folders {
            let folders = none_if_empty(folders);
            if let Some(raw) = &folders {
                persist::parse_folder_specs(raw)?;
            }
            config.persistent_folders_ui = folders;
        }

        config::save_config(&self.config_path(), &config).await?;
        Ok(config.clone())
    }

    /// Delete an environment file; deleting the selected one clears the
    /// selection.
    ///
    /// # Errors
    ///
    /// Surfaces `EnvsError` from the env-file store.
    pub async fn delete_env(&self, name: &str) -> DeployResult<()> {
        envs::delete_env(&self.envs_dir(), name).await?;

        let mut config = self.config.lock().await;
        if config.selected_env.as_deref() == Some(name) {
            config.selected_env = None;
            config::save_config(&self.config_path(), &config).await?;
        }
        Ok(())
    }

    async fn start_with(&self, config: &AgentConfig) -> DeployResult<()> {
        let env = self.merged_env(config).await;
        self.supervisor
            .start(&config.command, config.base_path.as_deref(), &env)
            .await?;
        Ok(())
    }

    /// Host environment with the selected env-file's pairs applied on top.
    /// A missing or unreadable env file is logged and skipped; the app
    /// still starts.
    async fn merged_env(&self, config: &AgentConfig) -> HashMap<String, String> {
        let mut env: HashMap<String, String> = std::env::vars().collect();

        if let Some(name) = &config.selected_env {
            match envs::load_env_file(&self.envs_dir(), name).await {
                Ok(pairs) => {
                    info!(env = %name, count = pairs.len(), "applying environment file");
                    env.extend(pairs);
                }
                Err(e) => {
                    error!(env = %name, error = %e, "could not load environment file, starting without it");
                }
            }
        }

        env
    }

    /// Uploaded bundles staged under `uploads/` are one-shot; remove them
    /// after a successful extraction. Archives elsewhere belong to the
    /// caller and are left alone.
    fn discard_staged_upload(&self, archive_path: &Path) {
        if !archive_path.starts_with(self.uploads_dir()) {
            return;
        }
        if let Err(e) = fs::remove_file(archive_path) {
            warn!(
                archive = %archive_path.display(),
                error = %e,
                "could not remove staged upload"
            );
        }
    }
}

fn folder_specs(config: &AgentConfig) -> DeployResult<Vec<String>> {
    match &config.persistent_folders_ui {
        Some(raw) => Ok(persist::parse_folder_specs(raw)?),
        None => Ok(Vec::new()),
    }
}

fn none_if_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
