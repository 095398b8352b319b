pub mod cli;
pub mod config;
pub mod gitlab_api;
pub mod persist;
pub mod projects;
pub mod rate_limit;
pub mod search;
pub mod search_events;
pub mod state;
pub mod utils;

pub use config::{
    ClientSettings, ClientSettingsBuilder, ConfigError, ConfigService, ConfigState,
    InstanceConfig, InstanceConfigPatch, NewInstanceConfig,
};
pub use gitlab_api::{ApiError, ApiTarget, GitlabApi, GitlabVersion, Project, SearchResultRaw};
pub use persist::{PersistError, PersistedState, load_state, save_state};
pub use projects::{GitlabData, ProjectsError, ProjectsService, SearchProject};
pub use rate_limit::{RateLimitController, RateLimitError, RateLimiterRegistry};
pub use search::{
    SearchError, SearchOrchestrator, SearchProgress, SearchResult, SearchResultStore,
};
pub use search_events::{FinishReason, SearchEvent, SearchEventBus};
pub use state::Store;

/// Services wired together the way front ends use them
#[derive(Debug, Clone)]
pub struct GitlabCodeSearch {
    pub configs: ConfigService,
    pub projects: ProjectsService,
    pub search: SearchOrchestrator,
}

impl GitlabCodeSearch {
    /// Build every service on top of one shared HTTP client
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let configs = ConfigService::new(GitlabApi::new(settings)?);
        let projects = ProjectsService::new(configs.clone());
        let search = SearchOrchestrator::new(configs.clone(), projects.clone());
        Ok(Self {
            configs,
            projects,
            search,
        })
    }

    /// Load persisted configs and project data
    pub fn restore(&self, state: PersistedState) {
        state.restore_into(&self.configs, &self.projects);
    }

    #[must_use]
    pub fn snapshot(&self) -> PersistedState {
        PersistedState::capture(&self.configs, &self.projects)
    }

    /// Stop searching and destroy every rate limiter
    pub fn shutdown(&self) {
        self.search.shutdown();
        self.configs.shutdown();
    }
}
