//! Error types for search operations

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    /// Selection names an instance that is not configured
    #[error("No such gitlab in config: {0}")]
    UnknownInstance(String),
}
