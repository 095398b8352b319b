use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::InstanceConfig;
use crate::gitlab_api::{Project, SearchResultRaw};

/// A blob search hit enriched with links back into GitLab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Entity key, fresh for every row
    pub result_id: String,
    pub gitlab_id: String,
    pub gitlab_url: String,
    /// `None` when the project is not in the loaded project data
    pub project_url: Option<String>,
    pub project_name: Option<String>,
    #[serde(flatten)]
    pub raw: SearchResultRaw,
}

impl SearchResult {
    /// Attach instance and project context to a raw row
    #[must_use]
    pub fn enrich(raw: SearchResultRaw, config: &InstanceConfig, project: Option<&Project>) -> Self {
        Self {
            result_id: Uuid::new_v4().to_string(),
            gitlab_id: config.id.clone(),
            gitlab_url: config.gitlab_url.clone(),
            project_url: project.map(|p| p.web_url.clone()),
            project_name: project.map(|p| p.name_with_namespace.clone()),
            raw,
        }
    }

    /// Link to the matched line, when the project URL is known
    #[must_use]
    pub fn blob_url(&self) -> Option<String> {
        let project_url = self.project_url.as_deref()?;
        Some(format!(
            "{}/-/blob/{}/{}#L{}",
            project_url.trim_end_matches('/'),
            self.raw.git_ref,
            self.raw.path,
            self.raw.startline
        ))
    }
}

/// Projects searched so far out of the selection size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchProgress {
    pub done: usize,
    pub total: usize,
}

/// Observable state of the current search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResultState {
    /// Bumped by every search start; merges carry the generation they belong to
    pub generation: u64,
    pub query: String,
    pub results: Vec<SearchResult>,
    /// `None` when no search is in flight
    pub progress: Option<SearchProgress>,
    pub loading: bool,
}

impl SearchResultState {
    pub(crate) fn position(&self, result_id: &str) -> Option<usize> {
        self.results.iter().position(|r| r.result_id == result_id)
    }
}
