mod common;

use chrono::{TimeZone, Utc};
use common::{instance_config, project_json, test_settings};
use gitlab_code_search::{
    ConfigState, GitlabCodeSearch, GitlabData, Project, load_state, save_state,
};
use std::time::Duration;

fn app() -> GitlabCodeSearch {
    GitlabCodeSearch::new(test_settings(Duration::from_secs(60))).expect("app")
}

fn seeded_app() -> GitlabCodeSearch {
    let app = app();
    let mut limited = instance_config("limited", "https://limited.example", Some("16.5.1"));
    limited.rate_limit = Some(7);
    let mut state = ConfigState {
        instances: vec![
            limited,
            instance_config("open", "https://open.example", Some("12.0.3")),
        ],
        ..ConfigState::default()
    };
    state.filter.with_archived_projects = true;
    app.configs.restore(state);

    let project: Project =
        serde_json::from_value(project_json(42, "platform", "core")).expect("project");
    app.projects.restore(vec![GitlabData {
        id: "limited".to_string(),
        load_dt: Some(Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()),
        projects: vec![project],
    }]);
    app
}

#[tokio::test]
async fn state_survives_a_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("state.json");

    let before = seeded_app();
    let snapshot = before.snapshot();
    save_state(&path, snapshot.clone()).await.expect("saved");
    assert!(!path.with_extension("json.tmp").exists());

    let loaded = load_state(&path).await.expect("loaded");
    assert_eq!(loaded, snapshot);

    let after = app();
    after.restore(loaded);

    assert!(after.configs.with_archived_projects());
    assert_eq!(after.configs.all().len(), 2);
    assert_eq!(after.configs.limiter("limited").map(|l| l.limit()), Some(7));
    assert!(after.configs.limiter("open").is_none());

    let data = after.projects.gitlab_data("limited").expect("project data");
    assert_eq!(data.projects.len(), 1);
    assert!(after.projects.project_by_ids("limited", 42).is_some());
    // Instances without saved projects still get an entry.
    assert!(after.projects.gitlab_data("open").is_some());
}

#[tokio::test]
async fn saving_twice_overwrites_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.json");
    let app = seeded_app();

    save_state(&path, app.snapshot()).await.expect("first save");
    app.configs.remove("open").expect("removed");
    app.projects.sync_with_configs();
    save_state(&path, app.snapshot()).await.expect("second save");

    let loaded = load_state(&path).await.expect("loaded");
    let ids: Vec<&str> = loaded
        .config
        .instances
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(ids, vec!["limited"]);
    assert_eq!(loaded.projects.len(), 1);
}
