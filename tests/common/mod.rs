//! Test utilities and helper functions for the gitlab_code_search test suite

use gitlab_code_search::{
    ClientSettings, GitlabCodeSearch, GitlabVersion, InstanceConfig, NewInstanceConfig,
};
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::{Value, json};
use std::time::Duration;

pub const TOKEN: &str = "glpat-test";

/// Settings with a short request timeout and the given rate window
#[allow(dead_code)]
pub fn test_settings(rate_limit_interval: Duration) -> ClientSettings {
    ClientSettings::builder()
        .request_timeout(Duration::from_secs(5))
        .rate_limit_interval(rate_limit_interval)
        .build()
        .expect("valid settings")
}

/// Project payload as returned by `GET /projects?simple=true`
#[allow(dead_code)]
pub fn project_json(id: u64, namespace: &str, name: &str) -> Value {
    json!({
        "id": id,
        "description": null,
        "name": name,
        "name_with_namespace": format!("{namespace} / {name}"),
        "path": name,
        "path_with_namespace": format!("{namespace}/{name}"),
        "created_at": "2021-03-04T10:00:00.000Z",
        "tag_list": [],
        "ssh_url_to_repo": format!("git@gitlab.example.com:{namespace}/{name}.git"),
        "http_url_to_repo": format!("https://gitlab.example.com/{namespace}/{name}.git"),
        "web_url": format!("https://gitlab.example.com/{namespace}/{name}"),
        "last_activity_at": "2024-01-02T03:04:05.000Z",
        "namespace": {
            "id": 7,
            "name": namespace,
            "path": namespace,
            "kind": "group",
            "full_path": namespace,
            "parent_id": null,
            "web_url": format!("https://gitlab.example.com/groups/{namespace}")
        }
    })
}

/// One blob search row
#[allow(dead_code)]
pub fn blob_json(project_id: u64, path: &str, data: &str) -> Value {
    json!({
        "basename": path.rsplit('/').next().unwrap_or(path),
        "data": data,
        "path": path,
        "filename": path,
        "id": null,
        "ref": "main",
        "startline": 10,
        "project_id": project_id
    })
}

/// Mock `GET /api/v4/version`
#[allow(dead_code)]
pub async fn mock_version(server: &mut ServerGuard, version: &str) -> Mock {
    server
        .mock("GET", "/api/v4/version")
        .match_header("private-token", TOKEN)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"version": version, "revision": "abc123"}).to_string())
        .create_async()
        .await
}

/// Mock the blob search of one project for `query`, expecting `hits` calls
#[allow(dead_code)]
pub async fn mock_blob_search(
    server: &mut ServerGuard,
    project_id: u64,
    query: &str,
    rows: Value,
    hits: usize,
) -> Mock {
    server
        .mock("GET", format!("/api/v4/projects/{project_id}/search").as_str())
        .match_header("private-token", TOKEN)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("scope".into(), "blobs".into()),
            Matcher::UrlEncoded("search".into(), query.into()),
            Matcher::UrlEncoded("per_page".into(), "100".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(rows.to_string())
        .expect(hits)
        .create_async()
        .await
}

/// Mock a failing blob search of one project
#[allow(dead_code)]
pub async fn mock_blob_search_error(server: &mut ServerGuard, project_id: u64, status: usize) -> Mock {
    server
        .mock("GET", format!("/api/v4/projects/{project_id}/search").as_str())
        .match_query(Matcher::Any)
        .with_status(status)
        .with_body("{\"message\":\"boom\"}")
        .create_async()
        .await
}

/// Register `server` as an instance through the config service
#[allow(dead_code)]
pub async fn add_instance(
    app: &GitlabCodeSearch,
    server: &mut ServerGuard,
    rate_limit: Option<u32>,
) -> InstanceConfig {
    let _version = mock_version(server, "16.5.1").await;
    app.configs
        .add(NewInstanceConfig {
            gitlab_url: server.url(),
            token: TOKEN.to_string(),
            rate_limit,
        })
        .await
        .expect("instance added")
}

/// Stored config pointing at `url` without contacting it
#[allow(dead_code)]
pub fn instance_config(id: &str, url: &str, version: Option<&str>) -> InstanceConfig {
    InstanceConfig {
        id: id.to_string(),
        gitlab_url: url.to_string(),
        token: TOKEN.to_string(),
        rate_limit: None,
        version: version.map(|v| GitlabVersion {
            version: v.to_string(),
            revision: String::new(),
        }),
    }
}
