//! Core configuration types
//!
//! `InstanceConfig` describes one registered GitLab instance, `ConfigState`
//! is the registry of all of them, and `ClientSettings` holds the knobs of
//! the HTTP layer shared by every instance.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::gitlab_api::{ApiTarget, GitlabVersion};
use crate::utils::{
    DEFAULT_MAX_PAGES, DEFAULT_REQUEST_TIMEOUT, EVENT_BUS_CAPACITY, PROJECTS_CACHE_TTL,
    PROJECTS_PER_PAGE, RATE_LIMIT_INTERVAL, SEARCH_PER_PAGE, USER_AGENT,
};

/// A registered GitLab instance
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Opaque id assigned on registration
    pub id: String,
    /// Base URL, e.g. `https://gitlab.example.com`
    pub gitlab_url: String,
    pub token: String,
    /// Requests per minute; `None` or `0` means unthrottled
    #[serde(default)]
    pub rate_limit: Option<u32>,
    /// Last known server version; `None` until fetched successfully
    #[serde(default)]
    pub version: Option<GitlabVersion>,
}

impl fmt::Debug for InstanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceConfig")
            .field("id", &self.id)
            .field("gitlab_url", &self.gitlab_url)
            .field("token", &"<redacted>")
            .field("rate_limit", &self.rate_limit)
            .field("version", &self.version)
            .finish()
    }
}

impl InstanceConfig {
    /// Quota when it actually throttles
    #[must_use]
    pub fn effective_rate_limit(&self) -> Option<u32> {
        self.rate_limit.filter(|l| *l > 0)
    }
}

impl ApiTarget for InstanceConfig {
    fn gitlab_url(&self) -> &str {
        &self.gitlab_url
    }

    fn token(&self) -> &str {
        &self.token
    }
}

/// Instance details before registration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInstanceConfig {
    pub gitlab_url: String,
    pub token: String,
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl fmt::Debug for NewInstanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewInstanceConfig")
            .field("gitlab_url", &self.gitlab_url)
            .field("token", &"<redacted>")
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

impl ApiTarget for NewInstanceConfig {
    fn gitlab_url(&self) -> &str {
        &self.gitlab_url
    }

    fn token(&self) -> &str {
        &self.token
    }
}

/// Partial edit of an instance; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceConfigPatch {
    pub gitlab_url: Option<String>,
    pub token: Option<String>,
    /// `Some(None)` removes the quota
    pub rate_limit: Option<Option<u32>>,
}

impl InstanceConfigPatch {
    /// Whether applying the patch changes how the instance is reached
    #[must_use]
    pub fn changes_endpoint(&self, config: &InstanceConfig) -> bool {
        self.gitlab_url.as_ref().is_some_and(|u| *u != config.gitlab_url)
            || self.token.as_ref().is_some_and(|t| *t != config.token)
    }

    /// `config` with the patch applied
    #[must_use]
    pub fn applied_to(&self, config: &InstanceConfig) -> InstanceConfig {
        let mut next = config.clone();
        if let Some(url) = &self.gitlab_url {
            next.gitlab_url.clone_from(url);
        }
        if let Some(token) = &self.token {
            next.token.clone_from(token);
        }
        if let Some(rate_limit) = self.rate_limit {
            next.rate_limit = rate_limit;
        }
        next
    }
}

/// Filters remembered across sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFilter {
    pub with_archived_projects: bool,
}

/// All registered instances plus stored filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigState {
    /// Instances in registration order
    pub instances: Vec<InstanceConfig>,
    #[serde(default)]
    pub filter: StoredFilter,
}

impl ConfigState {
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&InstanceConfig> {
        self.instances.iter().find(|c| c.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut InstanceConfig> {
        self.instances.iter_mut().find(|c| c.id == id)
    }
}

/// HTTP client settings shared by all instances
///
/// Built through [`ClientSettingsBuilder`](super::ClientSettingsBuilder);
/// read through the getters in `getters.rs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    pub(crate) projects_per_page: u32,
    pub(crate) search_per_page: u32,
    pub(crate) max_pages: usize,
    pub(crate) request_timeout: Duration,
    pub(crate) rate_limit_interval: Duration,
    pub(crate) projects_cache_ttl: Duration,
    pub(crate) event_bus_capacity: usize,
    pub(crate) user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            projects_per_page: PROJECTS_PER_PAGE,
            search_per_page: SEARCH_PER_PAGE,
            max_pages: DEFAULT_MAX_PAGES,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            rate_limit_interval: RATE_LIMIT_INTERVAL,
            projects_cache_ttl: PROJECTS_CACHE_TTL,
            event_bus_capacity: EVENT_BUS_CAPACITY,
            user_agent: USER_AGENT.to_string(),
        }
    }
}
