//! Instance registry and server version resolution
//!
//! Owns the `ConfigState` store and the rate limiter registry, and keeps the
//! two in step: every add, quota-changing edit, removal and shutdown goes
//! through here.

use futures::future::join_all;
use std::sync::Arc;
use uuid::Uuid;

use super::errors::ConfigError;
use super::types::{ConfigState, InstanceConfig, InstanceConfigPatch, NewInstanceConfig};
use crate::gitlab_api::GitlabApi;
use crate::rate_limit::{RateLimitController, RateLimiterRegistry};
use crate::state::Store;

#[derive(Debug, Clone)]
pub struct ConfigService {
    store: Store<ConfigState>,
    api: GitlabApi,
    limiters: RateLimiterRegistry,
}

impl ConfigService {
    /// Empty registry using `api` for version lookups
    #[must_use]
    pub fn new(api: GitlabApi) -> Self {
        let limiters = RateLimiterRegistry::new(api.settings().rate_limit_interval());
        Self {
            store: Store::default(),
            api,
            limiters,
        }
    }

    /// Load previously persisted instances and create their limiters
    pub fn restore(&self, state: ConfigState) {
        self.limiters.destroy_all();
        for config in &state.instances {
            self.limiters.register(&config.id, config.rate_limit);
        }
        log::debug!("Restored {} gitlab instances", state.instances.len());
        self.store.apply(|current| *current = state);
    }

    #[must_use]
    pub fn store(&self) -> &Store<ConfigState> {
        &self.store
    }

    #[must_use]
    pub fn api(&self) -> &GitlabApi {
        &self.api
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<InstanceConfig> {
        self.store.read(|s| s.get(id).cloned())
    }

    #[must_use]
    pub fn all(&self) -> Vec<InstanceConfig> {
        self.store.read(|s| s.instances.clone())
    }

    #[must_use]
    pub fn with_archived_projects(&self) -> bool {
        self.store.read(|s| s.filter.with_archived_projects)
    }

    pub fn set_with_archived_projects(&self, with_archived: bool) {
        self.store
            .apply(|s| s.filter.with_archived_projects = with_archived);
    }

    /// Limiter gating requests to `id`; `None` when the instance is unthrottled
    #[must_use]
    pub fn limiter(&self, id: &str) -> Option<Arc<RateLimitController>> {
        self.limiters.get(id)
    }

    #[must_use]
    pub fn limiters(&self) -> &RateLimiterRegistry {
        &self.limiters
    }

    /// Register a new instance after confirming it answers `/version`
    ///
    /// # Errors
    ///
    /// Propagates the version request failure; nothing is stored in that case.
    pub async fn add(&self, new_config: NewInstanceConfig) -> Result<InstanceConfig, ConfigError> {
        let version = self.api.get_version(&new_config).await?;
        let config = InstanceConfig {
            id: Uuid::new_v4().to_string(),
            gitlab_url: new_config.gitlab_url,
            token: new_config.token,
            rate_limit: new_config.rate_limit,
            version: Some(version),
        };

        log::info!(
            "Added gitlab {} (version {})",
            config.gitlab_url,
            config.version.as_ref().map_or("unknown", |v| v.version.as_str())
        );
        self.store.apply(|s| s.instances.push(config.clone()));
        self.limiters.register(&config.id, config.rate_limit);
        Ok(config)
    }

    /// Edit an instance
    ///
    /// A changed URL or token triggers a fresh version lookup before anything
    /// is stored. A changed quota replaces the instance's limiter.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown ids; version lookup failures propagate.
    pub async fn update(
        &self,
        id: &str,
        patch: InstanceConfigPatch,
    ) -> Result<InstanceConfig, ConfigError> {
        let current = self
            .get(id)
            .ok_or_else(|| ConfigError::NotFound(id.to_string()))?;
        let mut next = patch.applied_to(&current);
        if patch.changes_endpoint(&current) {
            next.version = Some(self.api.get_version(&next).await?);
        }

        let stored = self.store.apply_if(|s| match s.get_mut(id) {
            Some(entry) => {
                *entry = next.clone();
                true
            }
            None => false,
        });
        if !stored {
            return Err(ConfigError::NotFound(id.to_string()));
        }

        if current.effective_rate_limit() != next.effective_rate_limit() {
            self.limiters.register(id, next.rate_limit);
        }
        Ok(next)
    }

    /// Remove an instance and destroy its limiter
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown ids.
    pub fn remove(&self, id: &str) -> Result<InstanceConfig, ConfigError> {
        let mut removed = None;
        self.store.apply_if(|s| {
            let Some(pos) = s.instances.iter().position(|c| c.id == id) else {
                return false;
            };
            removed = Some(s.instances.remove(pos));
            true
        });
        let removed = removed.ok_or_else(|| ConfigError::NotFound(id.to_string()))?;
        self.limiters.remove(id);
        log::info!("Removed gitlab {}", removed.gitlab_url);
        Ok(removed)
    }

    /// Refresh the cached version of every instance concurrently
    ///
    /// Failed lookups are logged and keep the previous version. All successful
    /// lookups are applied in a single update. Returns how many were updated.
    pub async fn update_versions(&self) -> usize {
        let configs = self.all();
        let lookups = configs.iter().map(|config| async move {
            match self.api.get_version(config).await {
                Ok(version) => Some((config.id.clone(), version)),
                Err(e) => {
                    log::warn!("Error loading gitlab {} version: {e}", config.gitlab_url);
                    None
                }
            }
        });
        let versions: Vec<_> = join_all(lookups).await.into_iter().flatten().collect();

        let updated = versions.len();
        if updated > 0 {
            self.store.apply(|s| {
                for (id, version) in versions {
                    if let Some(entry) = s.get_mut(&id) {
                        entry.version = Some(version);
                    }
                }
            });
        }
        log::debug!("Refreshed {updated}/{} gitlab versions", configs.len());
        updated
    }

    /// Destroy every limiter; call once on teardown
    pub fn shutdown(&self) {
        self.limiters.destroy_all();
    }
}
