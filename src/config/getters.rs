//! Getter methods for `ClientSettings`

use std::time::Duration;

use super::types::ClientSettings;

impl ClientSettings {
    #[must_use]
    pub fn projects_per_page(&self) -> u32 {
        self.projects_per_page
    }

    #[must_use]
    pub fn search_per_page(&self) -> u32 {
        self.search_per_page
    }

    #[must_use]
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub fn rate_limit_interval(&self) -> Duration {
        self.rate_limit_interval
    }

    #[must_use]
    pub fn projects_cache_ttl(&self) -> Duration {
        self.projects_cache_ttl
    }

    #[must_use]
    pub fn event_bus_capacity(&self) -> usize {
        self.event_bus_capacity
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}
