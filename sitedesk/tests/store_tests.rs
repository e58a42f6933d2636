mod common;

use common::{FakeProjectBackend, PendingCall, ScriptedGateway, project_json};
use serde_json::json;
use sitedesk::gateway::{FailureKind, GatewayError};
use sitedesk::models::{Project, ProjectForm, ProjectPatch, ProjectStatus};
use sitedesk::services::{NoFilter, ProjectService};
use sitedesk::store::{ProjectStore, StalePolicy, StoreError};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

fn store_over(backend: FakeProjectBackend) -> ProjectStore {
    ProjectStore::new(ProjectService::new(Arc::new(backend)), StalePolicy::Discard)
}

fn names(store: &ProjectStore) -> Vec<String> {
    store.state().items.into_iter().map(|p| p.name).collect()
}

fn form(name: &str) -> ProjectForm {
    ProjectForm {
        name: name.to_string(),
        description: "Twelve-storey office block".to_string(),
        status: ProjectStatus::Planning,
        start_date: "2025-01-01".parse().unwrap(),
        end_date: "2025-12-31".parse().unwrap(),
        manager: "Jung".to_string(),
        budget: 2_000_000_000.0,
        location: "Daejeon".to_string(),
    }
}

fn renamed(name: &str) -> ProjectPatch {
    ProjectPatch {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_fetch_all_mirrors_server_list() {
    // Arrange
    let backend = FakeProjectBackend::with_projects(vec![
        project_json(3, "C"),
        project_json(1, "A"),
        project_json(2, "B"),
    ]);
    let store = store_over(backend);

    // Act
    let loaded = store.fetch_all(&NoFilter).await;

    // Assert
    let state = store.state();
    assert!(loaded);
    assert_eq!(names(&store), vec!["C", "A", "B"]);
    assert!(!state.loading());
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn test_create_appends_once() {
    // Arrange
    let store = store_over(FakeProjectBackend::with_projects(vec![
        project_json(2, "B"),
        project_json(1, "A"),
    ]));
    store.fetch_all(&NoFilter).await;

    // Act
    let created = store.create(&form("Daejeon Office")).await;

    // Assert
    let created = created.unwrap();
    assert_eq!(created.id, 3);
    assert_eq!(names(&store), vec!["B", "A", "Daejeon Office"]);
}

#[tokio::test]
async fn test_update_replaces_in_place_and_selection() {
    // Arrange
    let store = store_over(FakeProjectBackend::with_projects(vec![
        project_json(1, "A"),
        project_json(5, "E"),
        project_json(9, "I"),
    ]));
    store.fetch_all(&NoFilter).await;
    store.fetch_one(5).await;

    // Act
    let updated = store.update(5, &renamed("E2")).await;

    // Assert
    assert_eq!(updated.map(|p| p.name), Some("E2".to_string()));
    assert_eq!(names(&store), vec!["A", "E2", "I"]);
    assert_eq!(store.state().selected.map(|p| p.name), Some("E2".to_string()));
}

#[tokio::test]
async fn test_delete_removes_and_clears_selection() {
    // Arrange
    let store = store_over(FakeProjectBackend::with_projects(vec![
        project_json(1, "A"),
        project_json(5, "E"),
    ]));
    store.fetch_all(&NoFilter).await;
    store.fetch_one(5).await;

    // Act
    let deleted = store.delete(5).await;

    // Assert
    let state = store.state();
    assert!(deleted);
    assert_eq!(state.items.len(), 1);
    assert!(state.items.iter().all(|p| p.id != 5));
    assert_eq!(state.selected, None);
}

#[tokio::test]
async fn test_second_delete_is_not_found() {
    // Arrange
    let store = store_over(FakeProjectBackend::with_projects(vec![
        project_json(1, "A"),
        project_json(5, "E"),
    ]));
    store.fetch_all(&NoFilter).await;
    assert!(store.delete(5).await);
    let before = store.state().items;

    // Act
    let deleted_again = store.delete(5).await;

    // Assert
    let state = store.state();
    assert!(!deleted_again);
    assert_eq!(state.items, before);
    assert_eq!(
        state.error,
        Some(StoreError {
            kind: FailureKind::NotFound,
            message: "프로젝트 삭제에 실패했습니다".to_string(),
        })
    );
}

#[tokio::test]
async fn test_network_failure_keeps_items() {
    // Arrange
    let (gateway, mut calls) = ScriptedGateway::new();
    let store = ProjectStore::new(ProjectService::new(Arc::new(gateway)), StalePolicy::Discard);
    let fetch = tokio::spawn({
        let store = store.clone();
        async move { store.fetch_all(&NoFilter).await }
    });

    // Act
    let call = calls.recv().await.unwrap();
    assert!(store.state().loading());
    call.respond(Err(GatewayError::Network("connection refused".to_string())));
    let loaded = fetch.await.unwrap();

    // Assert
    let state = store.state();
    assert!(!loaded);
    assert!(state.items.is_empty());
    assert!(!state.loading());
    assert_eq!(
        state.error.map(|error| error.message),
        Some("프로젝트 목록을 불러오는데 실패했습니다".to_string())
    );
}

/// Issues update A then update B for project 5 and answers B before A.
async fn overlapping_updates(policy: StalePolicy) -> Project {
    let (gateway, mut calls) = ScriptedGateway::new();
    let store = ProjectStore::new(ProjectService::new(Arc::new(gateway)), policy);

    let seed = tokio::spawn({
        let store = store.clone();
        async move { store.fetch_all(&NoFilter).await }
    });
    calls
        .recv()
        .await
        .unwrap()
        .respond(Ok(json!([project_json(5, "Seed")])));
    assert!(seed.await.unwrap());

    let first = tokio::spawn({
        let store = store.clone();
        async move { store.update(5, &renamed("A")).await }
    });
    let call_a = calls.recv().await.unwrap();
    let second = tokio::spawn({
        let store = store.clone();
        async move { store.update(5, &renamed("B")).await }
    });
    let call_b = calls.recv().await.unwrap();
    assert_eq!(call_a.command.args["project"], json!({"name": "A"}));

    call_b.respond(Ok(project_json(5, "B")));
    second.await.unwrap();
    call_a.respond(Ok(project_json(5, "A")));
    first.await.unwrap();

    let state = store.state();
    assert!(!state.loading());
    state.items.into_iter().next().unwrap()
}

#[tokio::test]
async fn test_overlapping_updates_keep_last_issued() {
    let project = overlapping_updates(StalePolicy::Discard).await;

    assert_eq!(project.name, "B");
}

#[tokio::test]
async fn test_overlapping_updates_keep_last_resolved_when_applying() {
    let project = overlapping_updates(StalePolicy::Apply).await;

    assert_eq!(project.name, "A");
}

/// Store over a scripted gateway, already holding projects 5 and 6.
async fn seeded(policy: StalePolicy) -> (ProjectStore, UnboundedReceiver<PendingCall>) {
    let (gateway, mut calls) = ScriptedGateway::new();
    let store = ProjectStore::new(ProjectService::new(Arc::new(gateway)), policy);
    let seed = tokio::spawn({
        let store = store.clone();
        async move { store.fetch_all(&NoFilter).await }
    });
    calls
        .recv()
        .await
        .unwrap()
        .respond(Ok(json!([project_json(5, "E"), project_json(6, "F")])));
    assert!(seed.await.unwrap());
    (store, calls)
}

fn ids(store: &ProjectStore) -> Vec<i64> {
    store.state().items.iter().map(|p| p.id).collect()
}

#[tokio::test]
async fn test_confirmed_delete_wins_over_later_update() {
    // Arrange
    let (store, mut calls) = seeded(StalePolicy::Discard).await;
    let lookup = tokio::spawn({
        let store = store.clone();
        async move { store.fetch_one(5).await }
    });
    calls.recv().await.unwrap().respond(Ok(project_json(5, "E")));
    assert!(lookup.await.unwrap());
    let delete = tokio::spawn({
        let store = store.clone();
        async move { store.delete(5).await }
    });
    let delete_call = calls.recv().await.unwrap();
    let update = tokio::spawn({
        let store = store.clone();
        async move { store.update(5, &renamed("E2")).await }
    });
    let update_call = calls.recv().await.unwrap();

    // Act
    update_call.respond(Ok(project_json(5, "E2")));
    update.await.unwrap();
    delete_call.respond(Ok(serde_json::Value::Null));
    let deleted = delete.await.unwrap();

    // Assert
    let state = store.state();
    assert!(deleted);
    assert_eq!(ids(&store), vec![6]);
    assert_eq!(state.selected, None);
    assert!(!state.loading());
}

#[tokio::test]
async fn test_update_resolving_after_delete_does_not_restore() {
    for policy in [StalePolicy::Discard, StalePolicy::Apply] {
        // Arrange
        let (store, mut calls) = seeded(policy).await;
        let update = tokio::spawn({
            let store = store.clone();
            async move { store.update(5, &renamed("E2")).await }
        });
        let update_call = calls.recv().await.unwrap();
        let delete = tokio::spawn({
            let store = store.clone();
            async move { store.delete(5).await }
        });
        let delete_call = calls.recv().await.unwrap();

        // Act
        delete_call.respond(Ok(serde_json::Value::Null));
        assert!(delete.await.unwrap());
        update_call.respond(Ok(project_json(5, "E2")));
        update.await.unwrap();

        // Assert
        assert_eq!(ids(&store), vec![6], "{policy:?}");
        assert!(!store.state().loading());
    }
}

#[tokio::test]
async fn test_list_with_null_fields_loads() {
    let mut sparse = project_json(1, "A");
    sparse["description"] = serde_json::Value::Null;
    sparse["budget"] = serde_json::Value::Null;
    let store = store_over(FakeProjectBackend::with_projects(vec![sparse, project_json(2, "B")]));

    let loaded = store.fetch_all(&NoFilter).await;

    assert!(loaded);
    assert_eq!(names(&store), vec!["A", "B"]);
    assert_eq!(store.state().items[0].budget, 0.0);
}

#[tokio::test]
async fn test_concurrent_fetches_count_in_flight() {
    // Arrange
    let (gateway, mut calls) = ScriptedGateway::new();
    let store = ProjectStore::new(ProjectService::new(Arc::new(gateway)), StalePolicy::Discard);
    let list = tokio::spawn({
        let store = store.clone();
        async move { store.fetch_all(&NoFilter).await }
    });
    let list_call = calls.recv().await.unwrap();
    let one = tokio::spawn({
        let store = store.clone();
        async move { store.fetch_one(1).await }
    });
    let one_call = calls.recv().await.unwrap();
    assert_eq!(store.state().in_flight, 2);

    // Act
    one_call.respond(Ok(project_json(1, "A")));
    one.await.unwrap();

    // Assert
    assert!(store.state().loading());
    list_call.respond(Ok(json!([project_json(1, "A")])));
    list.await.unwrap();
    assert!(!store.state().loading());
}

#[tokio::test]
async fn test_detach_ignores_late_response() {
    // Arrange
    let (gateway, mut calls) = ScriptedGateway::new();
    let store = ProjectStore::new(ProjectService::new(Arc::new(gateway)), StalePolicy::Discard);
    let fetch = tokio::spawn({
        let store = store.clone();
        async move { store.fetch_all(&NoFilter).await }
    });
    let call = calls.recv().await.unwrap();

    // Act
    store.detach();
    call.respond(Ok(json!([project_json(1, "late")])));
    let applied = fetch.await.unwrap();

    // Assert
    let state = store.state();
    assert!(!applied);
    assert!(state.items.is_empty());
    assert_eq!(state.in_flight, 0);
}

#[tokio::test]
async fn test_search_matches_substring() {
    let store = store_over(FakeProjectBackend::with_projects(vec![
        project_json(1, "Gangnam Tower"),
        project_json(2, "Songdo Bridge"),
        project_json(3, "Gangnam Station"),
    ]));
    store.fetch_all(&NoFilter).await;

    let found: Vec<i64> = store.search("gangnam").iter().map(|p| p.id).collect();

    assert_eq!(found, vec![1, 3]);
}
