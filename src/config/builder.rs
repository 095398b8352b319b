//! Fluent builder for `ClientSettings`
//!
//! Every field starts at the default from `utils::constants`; `build()`
//! validates the combination.

use std::time::Duration;

use super::errors::ConfigError;
use super::types::ClientSettings;

/// GitLab rejects larger `per_page` values
const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone)]
pub struct ClientSettingsBuilder {
    settings: ClientSettings,
}

impl Default for ClientSettingsBuilder {
    fn default() -> Self {
        Self {
            settings: ClientSettings::default(),
        }
    }
}

impl ClientSettings {
    #[must_use]
    pub fn builder() -> ClientSettingsBuilder {
        ClientSettingsBuilder::default()
    }
}

impl ClientSettingsBuilder {
    #[must_use]
    pub fn projects_per_page(mut self, per_page: u32) -> Self {
        self.settings.projects_per_page = per_page;
        self
    }

    #[must_use]
    pub fn search_per_page(mut self, per_page: u32) -> Self {
        self.settings.search_per_page = per_page;
        self
    }

    /// Upper bound on pages fetched by one project listing
    #[must_use]
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.settings.max_pages = max_pages;
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.settings.request_timeout = timeout;
        self
    }

    /// Window length used by every rate limiter
    #[must_use]
    pub fn rate_limit_interval(mut self, interval: Duration) -> Self {
        self.settings.rate_limit_interval = interval;
        self
    }

    #[must_use]
    pub fn projects_cache_ttl(mut self, ttl: Duration) -> Self {
        self.settings.projects_cache_ttl = ttl;
        self
    }

    #[must_use]
    pub fn event_bus_capacity(mut self, capacity: usize) -> Self {
        self.settings.event_bus_capacity = capacity;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.settings.user_agent = user_agent.into();
        self
    }

    /// Validate and return the settings
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when a page size is outside `1..=100`,
    /// when `max_pages` or the event bus capacity is zero, or when the rate
    /// limit interval is zero.
    pub fn build(self) -> Result<ClientSettings, ConfigError> {
        let s = &self.settings;
        if !(1..=MAX_PER_PAGE).contains(&s.projects_per_page) {
            return Err(ConfigError::Invalid(format!(
                "projects_per_page must be between 1 and {MAX_PER_PAGE}, got {}",
                s.projects_per_page
            )));
        }
        if !(1..=MAX_PER_PAGE).contains(&s.search_per_page) {
            return Err(ConfigError::Invalid(format!(
                "search_per_page must be between 1 and {MAX_PER_PAGE}, got {}",
                s.search_per_page
            )));
        }
        if s.max_pages == 0 {
            return Err(ConfigError::Invalid("max_pages must be positive".into()));
        }
        if s.event_bus_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event_bus_capacity must be positive".into(),
            ));
        }
        if s.rate_limit_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "rate_limit_interval must be positive".into(),
            ));
        }
        Ok(self.settings)
    }
}
