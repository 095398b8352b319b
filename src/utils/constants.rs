//! Shared configuration constants for gitlab_code_search
//!
//! This module contains default values and configuration constants used
//! throughout the codebase to ensure consistency and avoid magic numbers.

use std::time::Duration;

/// Page size for project listing requests
///
/// GitLab caps `per_page` at 100; 50 keeps single responses small on
/// instances with large project descriptions.
pub const PROJECTS_PER_PAGE: u32 = 50;

/// Page size for blob search requests
///
/// Blob search is never paginated beyond the first page, so this is the
/// maximum number of matches returned per project.
pub const SEARCH_PER_PAGE: u32 = 100;

/// Length of one rate-limit window
pub const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on pages fetched for a single project listing
///
/// Guards against servers that keep returning a next link forever.
pub const DEFAULT_MAX_PAGES: usize = 10_000;

/// Timeout for a single HTTP request to a GitLab instance
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long a loaded project list stays fresh
pub const PROJECTS_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Capacity of the search event broadcast channel
pub const EVENT_BUS_CAPACITY: usize = 1000;

/// User agent sent with every API request
pub const USER_AGENT: &str = concat!("gitlab-code-search/", env!("CARGO_PKG_VERSION"));

/// Header carrying the personal access token
pub const PRIVATE_TOKEN_HEADER: &str = "Private-Token";

/// Header carrying the page count in offset pagination
pub const TOTAL_PAGES_HEADER: &str = "x-total-pages";
