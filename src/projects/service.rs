//! Per-instance project listings
//!
//! Keeps one `GitlabData` entry per configured instance, reloads listings
//! through the pagination client and tracks which instances are loading.
//! Loaded data is cached store-wide: every successful load restarts the TTL.

use chrono::Utc;
use futures::future::join_all;
use std::collections::{BTreeMap, HashSet};
use tokio::task::JoinHandle;

use super::errors::ProjectsError;
use super::types::{GitlabData, ProjectsState, SearchProject};
use crate::config::ConfigService;
use crate::gitlab_api::{Project, ProjectRequestOptions};
use crate::state::Store;
use crate::utils::diff_sets;

#[derive(Debug, Clone)]
pub struct ProjectsService {
    store: Store<ProjectsState>,
    configs: ConfigService,
}

impl ProjectsService {
    /// Service with one empty entry per instance currently configured
    #[must_use]
    pub fn new(configs: ConfigService) -> Self {
        let service = Self {
            store: Store::default(),
            configs,
        };
        service.sync_with_configs();
        service
    }

    /// Keep project entries in step with config changes
    ///
    /// Runs until the returned handle is aborted.
    pub fn spawn_config_sync(&self) -> JoinHandle<()> {
        let mut changes = self.configs.store().watch();
        let service = self.clone();
        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                service.sync_with_configs();
            }
        })
    }

    /// Load persisted project data, then align it with the configured instances
    pub fn restore(&self, data: Vec<GitlabData>) {
        self.store.apply(|s| s.data = data);
        self.sync_with_configs();
    }

    #[must_use]
    pub fn store(&self) -> &Store<ProjectsState> {
        &self.store
    }

    /// Snapshot of every instance's project data
    #[must_use]
    pub fn data(&self) -> Vec<GitlabData> {
        self.store.read(|s| s.data.clone())
    }

    #[must_use]
    pub fn gitlab_data(&self, gitlab_id: &str) -> Option<GitlabData> {
        self.store.read(|s| s.get(gitlab_id).cloned())
    }

    /// Add empty entries for new instances and drop entries of removed ones
    ///
    /// Selection entries pointing at removed instances are dropped as well.
    pub fn sync_with_configs(&self) {
        let configs = self.configs.all();
        let configured: HashSet<String> = configs.iter().map(|c| c.id.clone()).collect();
        self.store.apply_if(|s| {
            let stored: HashSet<String> = s.data.iter().map(|d| d.id.clone()).collect();
            let diff = diff_sets(&stored, &configured);
            if diff.added.is_empty() && diff.removed.is_empty() {
                return false;
            }

            s.data.retain(|d| !diff.removed.contains(&d.id));
            s.loading.retain(|id| !diff.removed.contains(id));
            s.search_projects
                .retain(|p| !diff.removed.contains(&p.gitlab_id));
            // Keep registration order for new entries.
            for config in &configs {
                if diff.added.contains(&config.id) {
                    s.data.push(GitlabData::empty(config.id.as_str()));
                }
            }
            log::debug!(
                "Synced project data: {} added, {} removed",
                diff.added.len(),
                diff.removed.len()
            );
            true
        });
    }

    /// Reload the project listing of `gitlab_id` when needed
    ///
    /// A reload happens when `force` is set, when the instance has no
    /// projects yet, or when the cache has expired. Returns whether a reload
    /// happened.
    ///
    /// # Errors
    ///
    /// `UnknownInstance` when `gitlab_id` is not configured. Listing failures
    /// are logged and returned; the previous data is kept.
    pub async fn update_gitlab_data(&self, gitlab_id: &str, force: bool) -> Result<bool, ProjectsError> {
        let config = self
            .configs
            .get(gitlab_id)
            .ok_or_else(|| ProjectsError::UnknownInstance(gitlab_id.to_string()))?;

        let needs_reload = self.store.read(|s| {
            force
                || s.get(gitlab_id).is_none_or(|d| d.projects.is_empty())
                || !s.has_cache(Utc::now())
        });
        if !needs_reload {
            log::debug!("Projects of {} are cached", config.gitlab_url);
            return Ok(false);
        }

        self.store.apply(|s| {
            s.loading.insert(gitlab_id.to_string());
        });

        let opts = ProjectRequestOptions {
            archived: (!self.configs.with_archived_projects()).then_some(false),
            ..ProjectRequestOptions::default()
        };
        let result = self.configs.api().get_all_projects(&config, opts).await;

        let ttl = self.configs.api().settings().projects_cache_ttl();
        match result {
            Ok(projects) => {
                log::info!("Loaded {} projects from {}", projects.len(), config.gitlab_url);
                let now = Utc::now();
                self.store.apply(|s| {
                    s.loading.remove(gitlab_id);
                    s.upsert(GitlabData {
                        id: gitlab_id.to_string(),
                        load_dt: Some(now),
                        projects,
                    });
                    s.cache_valid_until = chrono::Duration::from_std(ttl)
                        .ok()
                        .and_then(|ttl| now.checked_add_signed(ttl));
                });
                Ok(true)
            }
            Err(e) => {
                log::warn!("Error loading projects from {}: {e}", config.gitlab_url);
                self.store.apply(|s| {
                    s.loading.remove(gitlab_id);
                });
                Err(e.into())
            }
        }
    }

    /// Run `update_gitlab_data` for every configured instance concurrently
    ///
    /// Failures are logged by `update_gitlab_data`. Returns how many instances
    /// were reloaded.
    pub async fn update_all_gitlab_data(&self, force: bool) -> usize {
        let ids: Vec<String> = self.configs.all().into_iter().map(|c| c.id).collect();
        let loads = ids.iter().map(|id| self.update_gitlab_data(id, force));
        join_all(loads)
            .await
            .into_iter()
            .filter(|r| matches!(r, Ok(true)))
            .count()
    }

    /// Mark cached data stale so the next update reloads it
    pub fn reset_data_cache(&self) {
        self.store.apply(|s| s.cache_valid_until = None);
    }

    pub fn set_search_projects(&self, projects: Vec<SearchProject>) {
        self.store.apply(|s| s.search_projects = projects);
    }

    #[must_use]
    pub fn search_projects(&self) -> Vec<SearchProject> {
        self.store.read(|s| s.search_projects.clone())
    }

    #[must_use]
    pub fn is_loading(&self, gitlab_id: &str) -> bool {
        self.store.read(|s| s.is_loading(gitlab_id))
    }

    #[must_use]
    pub fn project_by_ids(&self, gitlab_id: &str, project_id: u64) -> Option<Project> {
        self.store.read(|s| {
            s.get(gitlab_id)?
                .projects
                .iter()
                .find(|p| p.id == project_id)
                .cloned()
        })
    }

    /// Projects of `gitlab_id` grouped by namespace full path
    #[must_use]
    pub fn projects_by_namespace(&self, gitlab_id: &str) -> BTreeMap<String, Vec<Project>> {
        self.store
            .read(|s| s.get(gitlab_id).map(GitlabData::by_namespace))
            .unwrap_or_default()
    }
}
