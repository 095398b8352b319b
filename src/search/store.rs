//! Search result collection
//!
//! Rows are keyed by `result_id`. The orchestrator drives the lifecycle
//! methods (`begin`, `merge`, `finish`); every one of them is a single
//! atomic store update tagged with the search generation, so a superseded or
//! stopped search can never leak rows or progress into the current one.

use tokio::sync::watch;

use super::types::{SearchProgress, SearchResult, SearchResultState};
use crate::state::Store;

#[derive(Debug, Clone, Default)]
pub struct SearchResultStore {
    store: Store<SearchResultState>,
}

impl SearchResultStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to state changes
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SearchResultState> {
        self.store.watch()
    }

    #[must_use]
    pub fn state(&self) -> SearchResultState {
        self.store.get()
    }

    /// All rows in merge order
    #[must_use]
    pub fn results(&self) -> Vec<SearchResult> {
        self.store.read(|s| s.results.clone())
    }

    #[must_use]
    pub fn progress(&self) -> Option<SearchProgress> {
        self.store.read(|s| s.progress)
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.store.read(|s| s.loading)
    }

    #[must_use]
    pub fn query(&self) -> String {
        self.store.read(|s| s.query.clone())
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.store.read(|s| s.generation)
    }

    /// Insert a row, returning its key
    pub fn add(&self, result: SearchResult) -> String {
        let id = result.result_id.clone();
        self.store.apply(|s| match s.position(&id) {
            Some(pos) => s.results[pos] = result,
            None => s.results.push(result),
        });
        id
    }

    /// Modify the row `result_id` in place; `false` when it doesn't exist
    pub fn update<F>(&self, result_id: &str, update: F) -> bool
    where
        F: FnOnce(&mut SearchResult),
    {
        self.store.apply_if(|s| match s.position(result_id) {
            Some(pos) => {
                update(&mut s.results[pos]);
                // The key is not editable.
                s.results[pos].result_id = result_id.to_string();
                true
            }
            None => false,
        })
    }

    pub fn remove(&self, result_id: &str) -> Option<SearchResult> {
        let mut removed = None;
        self.store.apply_if(|s| {
            let Some(pos) = s.position(result_id) else {
                return false;
            };
            removed = Some(s.results.remove(pos));
            true
        });
        removed
    }

    #[must_use]
    pub fn get(&self, result_id: &str) -> Option<SearchResult> {
        self.store
            .read(|s| s.position(result_id).map(|pos| s.results[pos].clone()))
    }

    #[must_use]
    pub fn all(&self) -> Vec<SearchResult> {
        self.results()
    }

    /// Wait until no search is loading
    pub async fn wait_idle(&self) {
        let mut rx = self.watch();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|s| !s.loading).await;
    }

    /// Start a new generation: clear rows, reset progress, mark loading
    pub(crate) fn begin(&self, query: &str, total: usize) -> u64 {
        let mut generation = 0;
        self.store.apply(|s| {
            s.generation += 1;
            generation = s.generation;
            s.query = query.to_string();
            s.results.clear();
            s.progress = Some(SearchProgress { done: 0, total });
            s.loading = true;
        });
        generation
    }

    /// Count one finished project call and append its rows
    ///
    /// Returns the new progress, or `None` when `generation` is no longer the
    /// running search.
    pub(crate) fn merge(&self, generation: u64, rows: Vec<SearchResult>) -> Option<SearchProgress> {
        let mut progress = None;
        self.store.apply_if(|s| {
            if s.generation != generation || !s.loading {
                return false;
            }
            let Some(p) = s.progress.as_mut() else {
                return false;
            };
            p.done += 1;
            progress = Some(*p);
            s.results.extend(rows);
            true
        });
        progress
    }

    /// Clear progress and loading; `false` when already finished or stale
    pub(crate) fn finish(&self, generation: u64) -> bool {
        self.store.apply_if(|s| {
            if s.generation != generation || !s.loading {
                return false;
            }
            s.loading = false;
            s.progress = None;
            true
        })
    }
}
