//! Full project listings across GitLab's two pagination styles
//!
//! Older servers only support offset pagination (`page=N` plus an
//! `x-total-pages` header); newer ones support keyset pagination where each
//! response carries the URL of the next page in a `Link` header.
//!
//! Both walkers concatenate pages so that every later page is placed ahead of
//! the pages fetched before it: the final list is last-page-first, with each
//! page keeping the server's order. Any failed page aborts the whole listing.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use url::Url;

use super::client::{ApiTarget, GitlabApi, api_v4_url};
use super::errors::{ApiError, ApiResult};
use super::models::{Project, ProjectRequestOptions};
use super::version::{PaginationStrategy, ParsedVersion};
use crate::config::InstanceConfig;
use crate::utils::TOTAL_PAGES_HEADER;

/// First `<url>; rel="..."` entry; `rel` is not inspected
static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<([^>]*)>; rel="(\w*)""#).expect("Invalid link header regex"));

/// Extract the first link URL from a `Link` header value
#[must_use]
pub fn parse_link(link_header: Option<&str>) -> Option<String> {
    let caps = LINK_RE.captures(link_header?)?;
    Some(caps[1].to_string())
}

/// `Link`, falling back to the non-standard `Links`
fn link_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("link")
        .or_else(|| headers.get("links"))
        .and_then(|v| v.to_str().ok())
}

/// Page count from `x-total-pages`; absent or unparsable reads as `None`
#[must_use]
pub fn parse_total_pages(headers: &HeaderMap) -> Option<u32> {
    headers
        .get(TOTAL_PAGES_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Join pages last-page-first
fn concat_last_first(pages: Vec<Vec<Project>>) -> Vec<Project> {
    pages.into_iter().rev().flatten().collect()
}

impl GitlabApi {
    /// Every project visible to the instance's token
    ///
    /// Picks offset or keyset pagination from the cached server version.
    pub async fn get_all_projects(
        &self,
        config: &InstanceConfig,
        opts: ProjectRequestOptions,
    ) -> ApiResult<Vec<Project>> {
        let version = ParsedVersion::from_gitlab(config.version.as_ref());
        match PaginationStrategy::for_version(version) {
            PaginationStrategy::Offset => {
                self.get_all_projects_with_offset_pagination(config, opts)
                    .await
            }
            PaginationStrategy::Keyset => {
                self.get_all_projects_with_keyset_pagination(config, opts)
                    .await
            }
        }
    }

    /// Follow `Link` headers until a response carries none
    pub async fn get_all_projects_with_keyset_pagination(
        &self,
        target: &impl ApiTarget,
        opts: ProjectRequestOptions,
    ) -> ApiResult<Vec<Project>> {
        let max_pages = self.settings.max_pages();
        let first_url = format!("{}/projects", api_v4_url(target));
        let mut pages: Vec<Vec<Project>> = Vec::new();
        let mut next_url: Option<String> = None;

        loop {
            if pages.len() >= max_pages {
                log::warn!(
                    "Keyset pagination for {} exceeded {max_pages} pages",
                    target.gitlab_url()
                );
                return Err(ApiError::PageLimitExceeded { limit: max_pages });
            }

            let (headers, batch) = match next_url.take() {
                None => {
                    let request = self
                        .authorized(self.client.get(&first_url), target)
                        .query(&[
                            ("simple", "true"),
                            ("order_by", "id"),
                            ("pagination", "keyset"),
                        ])
                        .query(&[("per_page", self.settings.projects_per_page())])
                        .query(&opts.query_pairs());
                    self.send_json::<Vec<Project>>(request, &first_url).await?
                }
                Some(url) => {
                    let next = Url::parse(&url).map_err(|e| ApiError::InvalidUrl {
                        url: url.clone(),
                        message: e.to_string(),
                    })?;
                    let request = self.authorized(self.client.get(next), target);
                    self.send_json::<Vec<Project>>(request, &url).await?
                }
            };

            log::debug!(
                "Keyset page {} from {}: {} projects",
                pages.len() + 1,
                target.gitlab_url(),
                batch.len()
            );
            pages.push(batch);

            match parse_link(link_header(&headers)) {
                Some(url) => next_url = Some(url),
                None => break,
            }
        }

        Ok(concat_last_first(pages))
    }

    /// Request `page=1, 2, ...` until `x-total-pages` is reached
    ///
    /// A missing or zero `x-total-pages` header ends the walk after the
    /// current page.
    pub async fn get_all_projects_with_offset_pagination(
        &self,
        target: &impl ApiTarget,
        opts: ProjectRequestOptions,
    ) -> ApiResult<Vec<Project>> {
        let max_pages = self.settings.max_pages();
        let url = format!("{}/projects", api_v4_url(target));
        let mut pages: Vec<Vec<Project>> = Vec::new();
        let mut page: u32 = 1;

        loop {
            if pages.len() >= max_pages {
                log::warn!(
                    "Offset pagination for {} exceeded {max_pages} pages",
                    target.gitlab_url()
                );
                return Err(ApiError::PageLimitExceeded { limit: max_pages });
            }

            let request = self
                .authorized(self.client.get(&url), target)
                .query(&[("simple", "true"), ("order_by", "id")])
                .query(&[
                    ("per_page", self.settings.projects_per_page()),
                    ("page", page),
                ])
                .query(&opts.query_pairs());
            let (headers, batch) = self.send_json::<Vec<Project>>(request, &url).await?;
            pages.push(batch);

            match parse_total_pages(&headers) {
                Some(total) if total > 0 && page < total => page += 1,
                _ => break,
            }
        }

        Ok(concat_last_first(pages))
    }
}
