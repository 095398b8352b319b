mod common;

use common::{TOKEN, add_instance, mock_version, test_settings};
use gitlab_code_search::{
    ConfigError, GitlabCodeSearch, InstanceConfigPatch, NewInstanceConfig,
};
use std::time::Duration;

fn app() -> GitlabCodeSearch {
    GitlabCodeSearch::new(test_settings(Duration::from_secs(60))).expect("app")
}

#[tokio::test]
async fn add_fetches_version_and_creates_limiter_for_positive_quota() {
    let app = app();
    let mut limited = mockito::Server::new_async().await;
    let mut unlimited = mockito::Server::new_async().await;

    let a = add_instance(&app, &mut limited, Some(5)).await;
    let b = add_instance(&app, &mut unlimited, Some(0)).await;

    assert_ne!(a.id, b.id);
    assert_eq!(a.version.as_ref().map(|v| v.version.as_str()), Some("16.5.1"));
    assert_eq!(app.configs.limiter(&a.id).map(|l| l.limit()), Some(5));
    assert!(app.configs.limiter(&b.id).is_none());
    assert_eq!(app.configs.all().len(), 2);
}

#[tokio::test]
async fn failed_version_lookup_stores_nothing() {
    let app = app();
    let mut server = mockito::Server::new_async().await;
    let _unauthorized = server
        .mock("GET", "/api/v4/version")
        .with_status(401)
        .with_body("{\"message\":\"401 Unauthorized\"}")
        .create_async()
        .await;

    let err = app
        .configs
        .add(NewInstanceConfig {
            gitlab_url: server.url(),
            token: "wrong".to_string(),
            rate_limit: Some(10),
        })
        .await
        .expect_err("unauthorized");

    assert!(matches!(err, ConfigError::Api(ref e) if e.status() == Some(401)));
    assert!(app.configs.all().is_empty());
    assert!(app.configs.limiters().is_empty());
}

#[tokio::test]
async fn quota_edit_replaces_limiter() {
    let app = app();
    let mut server = mockito::Server::new_async().await;
    let config = add_instance(&app, &mut server, Some(5)).await;
    let old = app.configs.limiter(&config.id).expect("limiter");

    let patch = InstanceConfigPatch {
        rate_limit: Some(Some(2)),
        ..InstanceConfigPatch::default()
    };
    app.configs.update(&config.id, patch).await.expect("updated");

    assert!(old.is_closed());
    assert_eq!(app.configs.limiter(&config.id).map(|l| l.limit()), Some(2));

    let patch = InstanceConfigPatch {
        rate_limit: Some(None),
        ..InstanceConfigPatch::default()
    };
    app.configs.update(&config.id, patch).await.expect("updated");
    assert!(app.configs.limiter(&config.id).is_none());
}

#[tokio::test]
async fn endpoint_edit_refetches_version() {
    let app = app();
    let mut old_server = mockito::Server::new_async().await;
    let config = add_instance(&app, &mut old_server, None).await;

    let mut new_server = mockito::Server::new_async().await;
    let version = mock_version(&mut new_server, "17.2.0").await;
    let patch = InstanceConfigPatch {
        gitlab_url: Some(new_server.url()),
        ..InstanceConfigPatch::default()
    };
    let updated = app.configs.update(&config.id, patch).await.expect("updated");

    version.assert_async().await;
    assert_eq!(updated.gitlab_url, new_server.url());
    assert_eq!(
        app.configs
            .get(&config.id)
            .and_then(|c| c.version)
            .map(|v| v.version),
        Some("17.2.0".to_string())
    );
}

#[tokio::test]
async fn unknown_ids_are_reported() {
    let app = app();
    assert!(matches!(
        app.configs.remove("missing"),
        Err(ConfigError::NotFound(id)) if id == "missing"
    ));
    assert!(matches!(
        app.configs
            .update("missing", InstanceConfigPatch::default())
            .await,
        Err(ConfigError::NotFound(_))
    ));
}

#[tokio::test]
async fn remove_destroys_limiter_and_project_entry() {
    let app = app();
    let mut server = mockito::Server::new_async().await;
    let config = add_instance(&app, &mut server, Some(3)).await;
    app.projects.sync_with_configs();
    let limiter = app.configs.limiter(&config.id).expect("limiter");
    assert!(app.projects.gitlab_data(&config.id).is_some());

    app.configs.remove(&config.id).expect("removed");
    app.projects.sync_with_configs();

    assert!(limiter.is_closed());
    assert!(app.configs.get(&config.id).is_none());
    assert!(app.projects.gitlab_data(&config.id).is_none());
}

#[tokio::test]
async fn version_refresh_keeps_previous_value_on_failure() {
    let app = app();
    let mut healthy = mockito::Server::new_async().await;
    let mut broken = mockito::Server::new_async().await;
    let a = add_instance(&app, &mut healthy, None).await;
    let b = add_instance(&app, &mut broken, None).await;

    let _upgraded = mock_version(&mut healthy, "17.0.0").await;
    let _down = broken
        .mock("GET", "/api/v4/version")
        .match_header("private-token", TOKEN)
        .with_status(503)
        .create_async()
        .await;

    let mut changes = app.configs.store().watch();
    changes.borrow_and_update();
    let updated = app.configs.update_versions().await;

    assert_eq!(updated, 1);
    let version_of = |id: &str| {
        app.configs
            .get(id)
            .and_then(|c| c.version)
            .map(|v| v.version)
    };
    assert_eq!(version_of(&a.id), Some("17.0.0".to_string()));
    assert_eq!(version_of(&b.id), Some("16.5.1".to_string()));
    assert!(changes.has_changed().expect("open"));
}
