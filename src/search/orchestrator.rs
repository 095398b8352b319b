//! Multi-instance blob search
//!
//! Coordinates one search across every selected project:
//! - Selection grouped per instance, in first-appearance order
//! - Projects of one instance searched one after another, each request
//!   gated by that instance's rate limiter
//! - Instances searched concurrently
//! - Each finished call merged into the result store together with its
//!   progress step
//! - A failed call is logged and counts as a project with zero results
//!
//! A new search or `stop_searching` cancels the running one. The result store
//! rejects merges from any generation but the current one.

use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::errors::SearchError;
use super::store::SearchResultStore;
use super::types::SearchResult;
use crate::config::{ConfigService, InstanceConfig};
use crate::projects::{ProjectsService, SearchProject};
use crate::search_events::{EventBusError, FinishReason, SearchEvent, SearchEventBus};

#[derive(Debug)]
struct ActiveSearch {
    generation: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Runs searches and owns the result store they publish into
#[derive(Debug, Clone)]
pub struct SearchOrchestrator {
    configs: ConfigService,
    projects: ProjectsService,
    results: SearchResultStore,
    events: SearchEventBus,
    active: Arc<Mutex<Option<ActiveSearch>>>,
}

impl SearchOrchestrator {
    #[must_use]
    pub fn new(configs: ConfigService, projects: ProjectsService) -> Self {
        let events = SearchEventBus::new(configs.api().settings().event_bus_capacity());
        Self {
            configs,
            projects,
            results: SearchResultStore::new(),
            events,
            active: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub fn results(&self) -> &SearchResultStore {
        &self.results
    }

    #[must_use]
    pub fn events(&self) -> &SearchEventBus {
        &self.events
    }

    /// Subscribe to search lifecycle events
    #[must_use]
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<SearchEvent> {
        self.events.subscribe()
    }

    /// Whether a search is still running
    #[must_use]
    pub fn is_searching(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|a| !a.handle.is_finished())
    }

    /// Search the projects currently selected in the project service
    ///
    /// # Errors
    ///
    /// See [`SearchOrchestrator::search`].
    pub fn search_selected(&self, query: &str) -> Result<bool, SearchError> {
        let selection = self.projects.search_projects();
        self.search(query, &selection)
    }

    /// Start searching `query` in every project of `selection`
    ///
    /// Returns `Ok(false)` without touching any state when the query is blank
    /// or the selection is empty. Otherwise results are cleared, progress is
    /// reset to `{0, total}` and the search runs in the background; await
    /// [`SearchResultStore::wait_idle`] to observe completion. A search that
    /// is already running is cancelled first.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// `UnknownInstance` when a selection entry names an instance that is not
    /// configured; nothing is cancelled or cleared in that case.
    pub fn search(&self, query: &str, selection: &[SearchProject]) -> Result<bool, SearchError> {
        if query.trim().is_empty() || selection.is_empty() {
            return Ok(false);
        }
        let groups = self.group_by_instance(selection)?;
        let total = selection.len();

        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            previous.cancel.cancel();
            log::debug!("Search {} superseded", previous.generation);
            self.emit(SearchEvent::search_finished(
                previous.generation,
                FinishReason::Superseded,
            ));
        }

        let generation = self.results.begin(query, total);
        log::info!(
            "Search {generation} for {query:?} in {total} projects on {} gitlabs",
            groups.len()
        );
        self.emit(SearchEvent::search_started(generation, query.to_string(), total));

        let cancel = CancellationToken::new();
        let run = SearchRun {
            generation,
            query: query.to_string(),
            total,
            configs: self.configs.clone(),
            projects: self.projects.clone(),
            results: self.results.clone(),
            events: self.events.clone(),
        };
        let handle = tokio::spawn(run.execute(groups, cancel.clone(), Arc::clone(&self.active)));
        *active = Some(ActiveSearch {
            generation,
            cancel,
            handle,
        });
        Ok(true)
    }

    /// Cancel the running search
    ///
    /// Rows merged so far stay; progress is cleared. Returns whether a search
    /// was running.
    pub fn stop_searching(&self) -> bool {
        let Some(active) = self.active.lock().take() else {
            return false;
        };
        active.cancel.cancel();
        if self.results.finish(active.generation) {
            log::info!("Search {} stopped", active.generation);
            self.emit(SearchEvent::search_finished(
                active.generation,
                FinishReason::Stopped,
            ));
            return true;
        }
        false
    }

    /// Stop any search and close the event bus
    pub fn shutdown(&self) {
        self.stop_searching();
        self.events.shutdown();
    }

    fn group_by_instance(
        &self,
        selection: &[SearchProject],
    ) -> Result<Vec<(InstanceConfig, Vec<u64>)>, SearchError> {
        let mut groups: Vec<(InstanceConfig, Vec<u64>)> = Vec::new();
        for entry in selection {
            if let Some((_, ids)) = groups.iter_mut().find(|(c, _)| c.id == entry.gitlab_id) {
                ids.push(entry.project_id);
                continue;
            }
            let config = self
                .configs
                .get(&entry.gitlab_id)
                .ok_or_else(|| SearchError::UnknownInstance(entry.gitlab_id.clone()))?;
            groups.push((config, vec![entry.project_id]));
        }
        Ok(groups)
    }

    fn emit(&self, event: SearchEvent) {
        emit(&self.events, event);
    }
}

fn emit(events: &SearchEventBus, event: SearchEvent) {
    match events.publish(event) {
        Ok(_) | Err(EventBusError::NoSubscribers) => {}
        Err(e) => log::debug!("Search event dropped: {e}"),
    }
}

/// Everything one search generation needs, owned by its task
struct SearchRun {
    generation: u64,
    query: String,
    total: usize,
    configs: ConfigService,
    projects: ProjectsService,
    results: SearchResultStore,
    events: SearchEventBus,
}

impl SearchRun {
    async fn execute(
        self,
        groups: Vec<(InstanceConfig, Vec<u64>)>,
        cancel: CancellationToken,
        active: Arc<Mutex<Option<ActiveSearch>>>,
    ) {
        let branches = groups
            .iter()
            .map(|(config, project_ids)| self.search_instance(config, project_ids));

        tokio::select! {
            () = cancel.cancelled() => {
                log::debug!("Search {} cancelled", self.generation);
                return;
            }
            _ = join_all(branches) => {}
        }

        if self.results.finish(self.generation) {
            log::info!(
                "Search {} finished with {} results",
                self.generation,
                self.results.results().len()
            );
            emit(
                &self.events,
                SearchEvent::search_finished(self.generation, FinishReason::Completed),
            );
        }

        let mut active = active.lock();
        if active.as_ref().is_some_and(|a| a.generation == self.generation) {
            *active = None;
        }
    }

    /// Search the projects of one instance strictly in order
    async fn search_instance(&self, config: &InstanceConfig, project_ids: &[u64]) {
        for &project_id in project_ids {
            let rows = self.search_project(config, project_id).await;
            let count = rows.as_ref().map_or(0, Vec::len);
            let failed = rows.is_none();
            let Some(progress) = self
                .results
                .merge(self.generation, rows.unwrap_or_default())
            else {
                // Superseded or stopped.
                return;
            };
            emit(
                &self.events,
                SearchEvent::project_searched(
                    self.generation,
                    config.id.clone(),
                    project_id,
                    count,
                    failed,
                    progress.done,
                    self.total,
                ),
            );
        }
    }

    /// One rate-limited blob search call; `None` when it failed
    async fn search_project(&self, config: &InstanceConfig, project_id: u64) -> Option<Vec<SearchResult>> {
        let project = self.projects.project_by_ids(&config.id, project_id);
        let context = project.as_ref().map_or_else(
            || format!("project {project_id} on {}", config.gitlab_url),
            |p| format!("project {}, url {}", p.name_with_namespace, p.web_url),
        );

        if let Some(limiter) = self.configs.limiter(&config.id) {
            let waiting = limiter
                .acquire(|| {
                    log::debug!("Rate limit reached for {}, waiting", config.gitlab_url);
                    emit(
                        &self.events,
                        SearchEvent::rate_limit_waiting(self.generation, config.id.clone()),
                    );
                })
                .await;
            if let Err(e) = waiting {
                log::warn!("Error during search in {context}: {e}");
                return None;
            }
        }

        match self
            .configs
            .api()
            .search_project_blobs(config, project_id, &self.query)
            .await
        {
            Ok(rows) => Some(
                rows.into_iter()
                    .map(|raw| SearchResult::enrich(raw, config, project.as_ref()))
                    .collect(),
            ),
            Err(e) => {
                log::warn!("Error during search in {context}: {e}");
                None
            }
        }
    }
}
