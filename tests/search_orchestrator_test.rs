mod common;

use common::{add_instance, blob_json, mock_blob_search, mock_blob_search_error, project_json, test_settings};
use gitlab_code_search::{
    FinishReason, GitlabCodeSearch, GitlabData, InstanceConfig, Project, SearchError, SearchEvent,
    SearchProgress, SearchProject,
};
use serde_json::json;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time::timeout;

const P1: u64 = 101;
const P2: u64 = 102;
const P3: u64 = 201;

fn project(id: u64, name: &str) -> Project {
    serde_json::from_value(project_json(id, "team", name)).expect("project")
}

fn project_data(config: &InstanceConfig, projects: Vec<Project>) -> GitlabData {
    GitlabData {
        id: config.id.clone(),
        load_dt: None,
        projects,
    }
}

fn drain(rx: &mut broadcast::Receiver<SearchEvent>) -> Vec<SearchEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

async fn next_matching<F>(rx: &mut broadcast::Receiver<SearchEvent>, matches: F) -> SearchEvent
where
    F: Fn(&SearchEvent) -> bool,
{
    timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("bus open");
            if matches(&event) {
                return event;
            }
        }
    })
    .await
    .expect("event in time")
}

fn progress_steps(events: &[SearchEvent]) -> Vec<(String, u64, usize)> {
    events
        .iter()
        .filter_map(|e| match e {
            SearchEvent::ProjectSearched {
                gitlab_id,
                project_id,
                done,
                ..
            } => Some((gitlab_id.clone(), *project_id, *done)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn searches_every_instance_and_tracks_progress() {
    let app = GitlabCodeSearch::new(test_settings(Duration::from_secs(60))).expect("app");
    let mut server_a = mockito::Server::new_async().await;
    let mut server_b = mockito::Server::new_async().await;
    let a = add_instance(&app, &mut server_a, Some(2)).await;
    let b = add_instance(&app, &mut server_b, None).await;
    app.projects.restore(vec![
        project_data(&a, vec![project(P1, "one"), project(P2, "two")]),
        project_data(&b, vec![project(P3, "three")]),
    ]);

    let p1 = mock_blob_search(
        &mut server_a,
        P1,
        "foo",
        json!([blob_json(P1, "src/a.rs", "foo()"), blob_json(P1, "src/b.rs", "foo(1)")]),
        1,
    )
    .await;
    let p2 = mock_blob_search(&mut server_a, P2, "foo", json!([blob_json(P2, "lib.rs", "foo")]), 1).await;
    let p3 = mock_blob_search(&mut server_b, P3, "foo", json!([blob_json(P3, "main.go", "foo")]), 1).await;

    let mut events = app.search.subscribe_events();
    let selection = vec![
        SearchProject::new(a.id.as_str(), P1),
        SearchProject::new(b.id.as_str(), P3),
        SearchProject::new(a.id.as_str(), P2),
    ];
    assert_eq!(app.search.search("foo", &selection), Ok(true));
    assert_eq!(
        app.search.results().progress(),
        Some(SearchProgress { done: 0, total: 3 })
    );
    assert!(app.search.results().is_loading());

    app.search.results().wait_idle().await;

    p1.assert_async().await;
    p2.assert_async().await;
    p3.assert_async().await;
    assert_eq!(app.search.results().progress(), None);
    assert!(!app.search.is_searching());

    let events = drain(&mut events);
    assert!(matches!(
        events.first(),
        Some(SearchEvent::SearchStarted { total: 3, .. })
    ));
    assert!(matches!(
        events.last(),
        Some(SearchEvent::SearchFinished {
            reason: FinishReason::Completed,
            ..
        })
    ));
    let steps = progress_steps(&events);
    assert_eq!(
        steps.iter().map(|(_, _, done)| *done).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    let order_on_a: Vec<u64> = steps
        .iter()
        .filter(|(gitlab_id, _, _)| *gitlab_id == a.id)
        .map(|(_, project_id, _)| *project_id)
        .collect();
    assert_eq!(order_on_a, vec![P1, P2]);
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, SearchEvent::RateLimitWaiting { .. }))
    );

    let results = app.search.results().results();
    assert_eq!(results.len(), 4);
    let ids: HashSet<&str> = results.iter().map(|r| r.result_id.as_str()).collect();
    assert_eq!(ids.len(), 4);
    for result in &results {
        let (gitlab, url, name) = match result.raw.project_id {
            P1 => (&a, server_a.url(), "one"),
            P2 => (&a, server_a.url(), "two"),
            _ => (&b, server_b.url(), "three"),
        };
        assert_eq!(result.gitlab_id, gitlab.id);
        assert_eq!(result.gitlab_url, url);
        assert_eq!(
            result.project_url.as_deref(),
            Some(format!("https://gitlab.example.com/team/{name}").as_str())
        );
        assert_eq!(
            result.project_name.as_deref(),
            Some(format!("team / {name}").as_str())
        );
    }
}

#[tokio::test]
async fn failed_project_counts_as_searched() {
    let app = GitlabCodeSearch::new(test_settings(Duration::from_secs(60))).expect("app");
    let mut server_a = mockito::Server::new_async().await;
    let mut server_b = mockito::Server::new_async().await;
    let a = add_instance(&app, &mut server_a, Some(2)).await;
    let b = add_instance(&app, &mut server_b, None).await;

    let _p1 = mock_blob_search(&mut server_a, P1, "foo", json!([blob_json(P1, "a.rs", "foo")]), 1).await;
    let _p2 = mock_blob_search_error(&mut server_a, P2, 500).await;
    let _p3 = mock_blob_search(&mut server_b, P3, "foo", json!([blob_json(P3, "b.rs", "foo")]), 1).await;

    let mut events = app.search.subscribe_events();
    let selection = vec![
        SearchProject::new(a.id.as_str(), P1),
        SearchProject::new(a.id.as_str(), P2),
        SearchProject::new(b.id.as_str(), P3),
    ];
    app.search.search("foo", &selection).expect("started");
    app.search.results().wait_idle().await;

    let events = drain(&mut events);
    let steps = progress_steps(&events);
    assert_eq!(steps.last().map(|(_, _, done)| *done), Some(3));
    assert!(events.iter().any(|e| matches!(
        e,
        SearchEvent::ProjectSearched { project_id: P2, failed: true, results: 0, .. }
    )));

    let mut project_ids: Vec<u64> = app
        .search
        .results()
        .results()
        .iter()
        .map(|r| r.raw.project_id)
        .collect();
    project_ids.sort_unstable();
    assert_eq!(project_ids, vec![P1, P3]);
    // No project lists were loaded, so rows carry no project details.
    assert!(
        app.search
            .results()
            .results()
            .iter()
            .all(|r| r.project_url.is_none() && r.project_name.is_none())
    );
    assert_eq!(app.search.results().progress(), None);
}

#[tokio::test]
async fn saturated_instance_waits_for_next_window() {
    let interval = Duration::from_millis(300);
    let app = GitlabCodeSearch::new(test_settings(interval)).expect("app");
    let mut server = mockito::Server::new_async().await;
    let a = add_instance(&app, &mut server, Some(1)).await;
    let p1 = mock_blob_search(&mut server, P1, "foo", json!([]), 1).await;
    let p2 = mock_blob_search(&mut server, P2, "foo", json!([]), 1).await;

    let mut events = app.search.subscribe_events();
    let started = Instant::now();
    app.search
        .search(
            "foo",
            &[
                SearchProject::new(a.id.as_str(), P1),
                SearchProject::new(a.id.as_str(), P2),
            ],
        )
        .expect("started");
    timeout(Duration::from_secs(5), app.search.results().wait_idle())
        .await
        .expect("finished in time");

    assert!(started.elapsed() >= interval);
    p1.assert_async().await;
    p2.assert_async().await;
    let waited: Vec<String> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            SearchEvent::RateLimitWaiting { gitlab_id, .. } => Some(gitlab_id),
            _ => None,
        })
        .collect();
    assert_eq!(waited, vec![a.id.clone()]);
}

#[tokio::test]
async fn stop_keeps_merged_rows_and_clears_progress() {
    let app = GitlabCodeSearch::new(test_settings(Duration::from_secs(60))).expect("app");
    let mut server = mockito::Server::new_async().await;
    let a = add_instance(&app, &mut server, Some(1)).await;
    let _p1 = mock_blob_search(&mut server, P1, "foo", json!([blob_json(P1, "a.rs", "foo")]), 1).await;
    let p2 = mock_blob_search(&mut server, P2, "foo", json!([blob_json(P2, "b.rs", "foo")]), 0).await;

    let mut events = app.search.subscribe_events();
    app.search
        .search(
            "foo",
            &[
                SearchProject::new(a.id.as_str(), P1),
                SearchProject::new(a.id.as_str(), P2),
            ],
        )
        .expect("started");
    next_matching(&mut events, |e| matches!(e, SearchEvent::RateLimitWaiting { .. })).await;

    assert_eq!(
        app.search.results().progress(),
        Some(SearchProgress { done: 1, total: 2 })
    );
    assert!(app.search.stop_searching());
    assert!(!app.search.stop_searching());

    assert_eq!(app.search.results().progress(), None);
    assert!(!app.search.results().is_loading());
    let rows = app.search.results().results();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].raw.project_id, P1);
    next_matching(&mut events, |e| {
        matches!(
            e,
            SearchEvent::SearchFinished {
                reason: FinishReason::Stopped,
                ..
            }
        )
    })
    .await;
    p2.assert_async().await;
}

#[tokio::test]
async fn restart_discards_the_superseded_search() {
    let app = GitlabCodeSearch::new(test_settings(Duration::from_secs(60))).expect("app");
    let mut server_a = mockito::Server::new_async().await;
    let mut server_b = mockito::Server::new_async().await;
    let a = add_instance(&app, &mut server_a, Some(1)).await;
    let b = add_instance(&app, &mut server_b, None).await;

    let _p1 = mock_blob_search(&mut server_a, P1, "foo", json!([blob_json(P1, "a.rs", "foo")]), 1).await;
    let p2 = mock_blob_search(&mut server_a, P2, "foo", json!([blob_json(P2, "b.rs", "foo")]), 0).await;
    let p3 = mock_blob_search(&mut server_b, P3, "bar", json!([blob_json(P3, "c.rs", "bar")]), 1).await;

    let mut events = app.search.subscribe_events();
    app.search
        .search(
            "foo",
            &[
                SearchProject::new(a.id.as_str(), P1),
                SearchProject::new(a.id.as_str(), P2),
            ],
        )
        .expect("first search");
    next_matching(&mut events, |e| matches!(e, SearchEvent::RateLimitWaiting { .. })).await;
    let first = app.search.results().generation();

    app.search
        .search("bar", &[SearchProject::new(b.id.as_str(), P3)])
        .expect("second search");
    assert_eq!(
        app.search.results().progress(),
        Some(SearchProgress { done: 0, total: 1 })
    );
    assert!(app.search.results().results().is_empty());
    app.search.results().wait_idle().await;

    let state = app.search.results().state();
    assert_eq!(state.query, "bar");
    assert_eq!(state.generation, first + 1);
    assert_eq!(state.results.len(), 1);
    assert_eq!(state.results[0].raw.data, "bar");
    p2.assert_async().await;
    p3.assert_async().await;

    let superseded = drain(&mut events).into_iter().any(|e| {
        matches!(
            e,
            SearchEvent::SearchFinished {
                generation,
                reason: FinishReason::Superseded,
                ..
            } if generation == first
        )
    });
    assert!(superseded);
}

#[tokio::test]
async fn invalid_requests_leave_state_untouched() {
    let app = GitlabCodeSearch::new(test_settings(Duration::from_secs(60))).expect("app");
    let mut server = mockito::Server::new_async().await;
    let a = add_instance(&app, &mut server, None).await;
    let mut events = app.search.subscribe_events();
    let selection = vec![SearchProject::new(a.id.as_str(), P1)];

    assert_eq!(app.search.search("", &selection), Ok(false));
    assert_eq!(app.search.search("   ", &selection), Ok(false));
    assert_eq!(app.search.search("foo", &[]), Ok(false));
    assert_eq!(
        app.search.search(
            "foo",
            &[
                SearchProject::new(a.id.as_str(), P1),
                SearchProject::new("ghost", 1),
            ]
        ),
        Err(SearchError::UnknownInstance("ghost".to_string()))
    );

    assert_eq!(app.search.results().generation(), 0);
    assert_eq!(app.search.results().progress(), None);
    assert!(!app.search.is_searching());
    assert!(drain(&mut events).is_empty());
    assert!(!app.search.stop_searching());
}

#[tokio::test]
async fn selected_projects_are_searched() {
    let app = GitlabCodeSearch::new(test_settings(Duration::from_secs(60))).expect("app");
    let mut server = mockito::Server::new_async().await;
    let a = add_instance(&app, &mut server, None).await;
    let p1 = mock_blob_search(&mut server, P1, "needle", json!([blob_json(P1, "x.rs", "needle")]), 1).await;

    app.projects
        .set_search_projects(vec![SearchProject::new(a.id.as_str(), P1)]);
    assert_eq!(app.search.search_selected("needle"), Ok(true));
    app.search.results().wait_idle().await;

    p1.assert_async().await;
    assert_eq!(app.search.results().results().len(), 1);
}
