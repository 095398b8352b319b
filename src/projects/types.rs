use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::gitlab_api::Project;

/// Projects of one instance, replaced wholesale on every reload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitlabData {
    /// Instance id
    pub id: String,
    /// Time of the last successful load; `None` until loaded
    pub load_dt: Option<DateTime<Utc>>,
    pub projects: Vec<Project>,
}

impl GitlabData {
    /// Placeholder for an instance whose projects were never loaded
    #[must_use]
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            load_dt: None,
            projects: Vec::new(),
        }
    }

    /// Projects grouped by namespace full path
    #[must_use]
    pub fn by_namespace(&self) -> BTreeMap<String, Vec<Project>> {
        let mut groups: BTreeMap<String, Vec<Project>> = BTreeMap::new();
        for project in &self.projects {
            groups
                .entry(project.namespace_path().to_string())
                .or_default()
                .push(project.clone());
        }
        groups
    }
}

/// One entry of the search selection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchProject {
    pub gitlab_id: String,
    pub project_id: u64,
}

impl SearchProject {
    pub fn new(gitlab_id: impl Into<String>, project_id: u64) -> Self {
        Self {
            gitlab_id: gitlab_id.into(),
            project_id,
        }
    }
}

/// Project data of every instance plus the current selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectsState {
    /// One entry per configured instance
    pub data: Vec<GitlabData>,
    /// Instances with a project listing in flight
    pub loading: HashSet<String>,
    pub search_projects: Vec<SearchProject>,
    /// Loaded data counts as fresh until this instant
    pub cache_valid_until: Option<DateTime<Utc>>,
}

impl ProjectsState {
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&GitlabData> {
        self.data.iter().find(|d| d.id == id)
    }

    #[must_use]
    pub fn has_cache(&self, now: DateTime<Utc>) -> bool {
        self.cache_valid_until.is_some_and(|until| now < until)
    }

    #[must_use]
    pub fn is_loading(&self, id: &str) -> bool {
        self.loading.contains(id)
    }

    /// Insert or replace the entry for `data.id`
    pub(crate) fn upsert(&mut self, data: GitlabData) {
        match self.data.iter_mut().find(|d| d.id == data.id) {
            Some(entry) => *entry = data,
            None => self.data.push(data),
        }
    }
}
