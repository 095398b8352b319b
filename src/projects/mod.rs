//! Project listings per GitLab instance and the search selection

pub mod errors;
pub mod service;
pub mod types;

pub use errors::ProjectsError;
pub use service::ProjectsService;
pub use types::{GitlabData, ProjectsState, SearchProject};
