//! State file persistence
//!
//! Instance configs, the archived-projects filter and loaded project lists
//! survive restarts in a single JSON file. Search results never do.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

use crate::config::{ConfigService, ConfigState};
use crate::projects::{GitlabData, ProjectsService};

/// Timeout for blocking JSON serialization
const BLOCKING_SERIALIZATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("State file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("State file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("State serialization did not complete: {0}")]
    Serialization(String),
}

/// Everything written to the state file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub config: ConfigState,
    #[serde(default)]
    pub projects: Vec<GitlabData>,
}

impl PersistedState {
    /// Snapshot of the services' persisted parts
    #[must_use]
    pub fn capture(configs: &ConfigService, projects: &ProjectsService) -> Self {
        Self {
            config: configs.store().get(),
            projects: projects.data(),
        }
    }

    /// Push the snapshot back into the services
    pub fn restore_into(self, configs: &ConfigService, projects: &ProjectsService) {
        configs.restore(self.config);
        projects.restore(self.projects);
    }
}

/// Read the state file; a missing file yields the default state
///
/// # Errors
///
/// I/O failures other than "not found" and malformed JSON.
pub async fn load_state(path: &Path) -> Result<PersistedState, PersistError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("No state file at {}, starting empty", path.display());
            return Ok(PersistedState::default());
        }
        Err(e) => return Err(e.into()),
    };
    let state: PersistedState = serde_json::from_slice(&bytes)?;
    log::debug!(
        "Loaded state from {}: {} instances",
        path.display(),
        state.config.instances.len()
    );
    Ok(state)
}

/// Write the state file, replacing it atomically
///
/// # Errors
///
/// Serialization and I/O failures.
pub async fn save_state(path: &Path, state: PersistedState) -> Result<(), PersistError> {
    // Project lists can be large; keep serialization off the async workers.
    let blocking_task = tokio::task::spawn_blocking(move || serde_json::to_vec_pretty(&state));
    let json = match timeout(BLOCKING_SERIALIZATION_TIMEOUT, blocking_task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(e)) => {
            return Err(PersistError::Serialization(format!("task panicked: {e}")));
        }
        Err(_) => {
            log::warn!("State serialization timeout (timeout: {BLOCKING_SERIALIZATION_TIMEOUT:?})");
            return Err(PersistError::Serialization(format!(
                "timed out after {BLOCKING_SERIALIZATION_TIMEOUT:?}"
            )));
        }
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    log::debug!("Saved state to {}", path.display());
    Ok(())
}
