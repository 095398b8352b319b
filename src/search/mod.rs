//! Blob search across the selected projects of every configured instance
//!
//! `SearchOrchestrator` runs the requests; `SearchResultStore` holds the
//! rows, progress and loading flag front ends observe.

pub mod errors;
pub mod orchestrator;
pub mod store;
pub mod types;

pub use errors::SearchError;
pub use orchestrator::SearchOrchestrator;
pub use store::SearchResultStore;
pub use types::{SearchProgress, SearchResult, SearchResultState};

pub use crate::projects::SearchProject;
