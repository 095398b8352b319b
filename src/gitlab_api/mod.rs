//! GitLab REST API v4 client
//!
//! Version lookup, project listings with offset or keyset pagination, and
//! per-project blob search.

pub mod client;
pub mod errors;
pub mod models;
pub mod pagination;
pub mod version;

pub use client::{ApiTarget, GitlabApi};
pub use errors::{ApiError, ApiResult};
pub use models::{GitlabVersion, Namespace, Project, ProjectRequestOptions, SearchResultRaw};
pub use pagination::{parse_link, parse_total_pages};
pub use version::{PaginationStrategy, ParsedVersion};
