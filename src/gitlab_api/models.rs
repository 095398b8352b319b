//! Wire types returned by the GitLab REST API v4

use serde::{Deserialize, Serialize};

/// Response of `GET /api/v4/version`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitlabVersion {
    pub version: String,
    #[serde(default)]
    pub revision: String,
}

/// Namespace a project lives in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: u64,
    pub name: String,
    pub path: String,
    /// `user` or `group`
    pub kind: String,
    pub full_path: String,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub web_url: String,
}

/// Project metadata as returned by `GET /api/v4/projects?simple=true`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    #[serde(default)]
    pub description: Option<String>,
    pub name: String,
    pub name_with_namespace: String,
    pub path: String,
    pub path_with_namespace: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub tag_list: Vec<String>,
    #[serde(default)]
    pub ssh_url_to_repo: Option<String>,
    #[serde(default)]
    pub http_url_to_repo: Option<String>,
    pub web_url: String,
    #[serde(default)]
    pub last_activity_at: Option<String>,
    #[serde(default)]
    pub namespace: Option<Namespace>,
}

impl Project {
    /// Full path of the owning namespace, falling back to the project path prefix
    #[must_use]
    pub fn namespace_path(&self) -> &str {
        if let Some(ns) = &self.namespace {
            return &ns.full_path;
        }
        self.path_with_namespace
            .rsplit_once('/')
            .map_or("", |(ns, _)| ns)
    }
}

/// One row of `GET /api/v4/projects/{id}/search?scope=blobs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultRaw {
    #[serde(default)]
    pub basename: String,
    pub data: String,
    pub path: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "ref", default)]
    pub git_ref: String,
    #[serde(default)]
    pub startline: u64,
    pub project_id: u64,
}

/// Filters for project listing requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRequestOptions {
    /// Only projects the token's user is a member of
    pub membership: bool,
    /// `Some(false)` hides archived projects; `None` sends no filter
    pub archived: Option<bool>,
}

impl Default for ProjectRequestOptions {
    fn default() -> Self {
        Self {
            membership: true,
            archived: None,
        }
    }
}

impl ProjectRequestOptions {
    /// Query parameters for these options
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("membership", self.membership.to_string())];
        if let Some(archived) = self.archived {
            pairs.push(("archived", archived.to_string()));
        }
        pairs
    }
}
