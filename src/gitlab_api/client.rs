//! HTTP client for the GitLab REST API v4
//!
//! Wraps a shared `reqwest::Client` and knows how to authenticate against an
//! instance, check response status and decode JSON bodies. Pagination lives in
//! `pagination.rs` as a second `impl GitlabApi` block.

use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::errors::{ApiError, ApiResult};
use super::models::{GitlabVersion, Project, ProjectRequestOptions, SearchResultRaw};
use crate::config::ClientSettings;
use crate::utils::PRIVATE_TOKEN_HEADER;

/// Anything that can address a GitLab instance
///
/// Implemented by stored instance configs and by not-yet-stored ones, so the
/// version can be fetched before an id is assigned.
pub trait ApiTarget {
    /// Base URL without the `/api/v4` suffix
    fn gitlab_url(&self) -> &str;
    /// Personal access token
    fn token(&self) -> &str;
}

/// GitLab API client shared by all services
#[derive(Debug, Clone)]
pub struct GitlabApi {
    pub(super) client: Client,
    pub(super) settings: ClientSettings,
}

impl GitlabApi {
    /// Build a client using `settings` for timeouts and user agent
    pub fn new(settings: ClientSettings) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .user_agent(settings.user_agent())
            .build()?;
        Ok(Self { client, settings })
    }

    #[must_use]
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// `GET /version`
    pub async fn get_version(&self, target: &impl ApiTarget) -> ApiResult<GitlabVersion> {
        let url = format!("{}/version", api_v4_url(target));
        let request = self.authorized(self.client.get(&url), target);
        let (_, version) = self.send_json(request, &url).await?;
        Ok(version)
    }

    /// Single `GET /projects` request without following pagination
    pub async fn get_projects(
        &self,
        target: &impl ApiTarget,
        opts: ProjectRequestOptions,
    ) -> ApiResult<Vec<Project>> {
        let url = format!("{}/projects", api_v4_url(target));
        let request = self
            .authorized(self.client.get(&url), target)
            .query(&[("simple", "true")])
            .query(&opts.query_pairs());
        let (_, projects) = self.send_json(request, &url).await?;
        Ok(projects)
    }

    /// Blob search inside one project
    pub async fn search_project_blobs(
        &self,
        target: &impl ApiTarget,
        project_id: u64,
        query: &str,
    ) -> ApiResult<Vec<SearchResultRaw>> {
        let url = format!("{}/projects/{project_id}/search", api_v4_url(target));
        let request = self
            .authorized(self.client.get(&url), target)
            .query(&[("scope", "blobs"), ("search", query)])
            .query(&[("per_page", self.settings.search_per_page())]);
        let (_, rows) = self.send_json(request, &url).await?;
        Ok(rows)
    }

    pub(super) fn authorized(&self, request: RequestBuilder, target: &impl ApiTarget) -> RequestBuilder {
        request.header(PRIVATE_TOKEN_HEADER, target.token())
    }

    /// Send `request`, fail on non-2xx, decode the body as JSON
    pub(super) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> ApiResult<(HeaderMap, T)> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            log::debug!("HTTP {} from {}", status.as_u16(), url);
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let headers = response.headers().clone();
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok((headers, body))
    }
}

/// `<gitlab_url>/api/v4`
pub(crate) fn api_v4_url(target: &impl ApiTarget) -> String {
    format!("{}/api/v4", target.gitlab_url().trim_end_matches('/'))
}
