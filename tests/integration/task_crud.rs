//! Integration tests for task CRUD through the sync adapter.
//!
//! Each mutation goes server-first; the local store must only ever show
//! state the server has committed, and must record failures without
//! inventing local writes.

use std::sync::Arc;

use taskdeck::remote::{ClientError, RemoteTaskService};
use taskdeck::store::TaskStore;
use taskdeck::sync::SyncAdapter;
use taskdeck_core::task::{GeoPoint, Priority, TaskDraft, TaskId};

/// Start the task server in-process and return its base URL.
async fn start_server() -> (String, tokio::task::JoinHandle<()>) {
    let (addr, handle) = taskdeck_server::server::start_server("127.0.0.1:0")
        .await
        .expect("failed to start task server");
    (format!("http://{addr}"), handle)
}

/// Build a logged-in sync adapter against the given server.
async fn connect(url: &str) -> SyncAdapter {
    let remote = RemoteTaskService::new(url).expect("client should build");
    remote
        .login("admin", "1234")
        .await
        .expect("login should succeed");
    SyncAdapter::new(Arc::new(TaskStore::new()), Arc::new(remote))
}

fn draft(title: &str) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        description: "created by an integration test".to_string(),
        due_date: "2026-09-15".to_string(),
        priority: Priority::Medium,
        location: None,
        completed: false,
    }
}

#[tokio::test]
async fn created_task_round_trips_modulo_id() {
    let (url, _handle) = start_server().await;
    let sync = connect(&url).await;

    let mut submitted = draft("Water the plants");
    submitted.priority = Priority::High;
    submitted.location = Some(GeoPoint {
        lat: 52.52,
        lng: 13.405,
    });

    let created = sync
        .add_task(submitted.clone())
        .await
        .expect("create should succeed");

    // The server assigns the id; every other field comes back verbatim.
    assert!(!created.id.as_str().is_empty());
    assert_eq!(created.title, submitted.title);
    assert_eq!(created.description, submitted.description);
    assert_eq!(created.due_date, submitted.due_date);
    assert_eq!(created.priority, submitted.priority);
    assert_eq!(created.location, submitted.location);
    assert!(!created.completed);

    // And the store mirrors the committed record.
    let cached = sync.store().get(&created.id).expect("store should hold it");
    assert_eq!(cached, created);
}

#[tokio::test]
async fn list_reflects_every_created_task() {
    let (url, _handle) = start_server().await;
    let sync = connect(&url).await;

    for i in 0..3 {
        sync.add_task(draft(&format!("task {i}")))
            .await
            .expect("create should succeed");
    }

    sync.fetch_into_store().await.expect("fetch should succeed");
    let tasks = sync.store().tasks();
    assert_eq!(tasks.len(), 3);
    // Insertion order is preserved by the server's collection.
    assert_eq!(tasks[0].title, "task 0");
    assert_eq!(tasks[2].title, "task 2");
}

#[tokio::test]
async fn edit_replaces_the_record_on_server_and_store() {
    let (url, _handle) = start_server().await;
    let sync = connect(&url).await;

    let created = sync
        .add_task(draft("unedited"))
        .await
        .expect("create should succeed");

    let mut changed = TaskDraft::from(created.clone());
    changed.title = "edited".to_string();
    changed.completed = true;
    let updated = sync
        .edit_task(&created.id, changed)
        .await
        .expect("edit should succeed");

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.title, "edited");
    assert!(updated.completed);

    // Refetching from the server shows the same record.
    sync.fetch_into_store().await.expect("fetch should succeed");
    let fetched = sync.store().get(&created.id).expect("task should exist");
    assert_eq!(fetched, updated);
}

#[tokio::test]
async fn edit_unknown_id_is_not_found_and_creates_nothing() {
    let (url, _handle) = start_server().await;
    let sync = connect(&url).await;

    let result = sync
        .edit_task(&TaskId::new("no-such-task"), draft("ghost"))
        .await;
    assert!(
        matches!(result, Err(ClientError::NotFound)),
        "edit of unknown id should be NotFound, got: {result:?}"
    );

    sync.fetch_into_store().await.expect("fetch should succeed");
    assert!(
        sync.store().tasks().is_empty(),
        "a failed edit must not create a task"
    );
}

#[tokio::test]
async fn delete_removes_from_server_and_store() {
    let (url, _handle) = start_server().await;
    let sync = connect(&url).await;

    let keep = sync
        .add_task(draft("keep me"))
        .await
        .expect("create should succeed");
    let doomed = sync
        .add_task(draft("delete me"))
        .await
        .expect("create should succeed");

    sync.delete_task(&doomed.id)
        .await
        .expect("delete should succeed");
    assert!(sync.store().get(&doomed.id).is_none());

    sync.fetch_into_store().await.expect("fetch should succeed");
    let tasks = sync.store().tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, keep.id);

    // Deleting again answers NotFound and records the failure.
    let result = sync.delete_task(&doomed.id).await;
    assert!(matches!(result, Err(ClientError::NotFound)));
    assert!(sync.store().last_error().is_some());
}

#[tokio::test]
async fn fetch_task_cached_prefers_the_local_copy() {
    let (url, _handle) = start_server().await;
    let sync = connect(&url).await;

    let created = sync
        .add_task(draft("cached"))
        .await
        .expect("create should succeed");

    // Already in the store from add_task; the lookup must not change it.
    let hit = sync
        .fetch_task_cached(&created.id)
        .await
        .expect("cached fetch should succeed");
    assert_eq!(hit, created);

    // A fresh adapter with an empty store falls through to the server.
    let other = connect(&url).await;
    assert!(other.store().get(&created.id).is_none());
    let fetched = other
        .fetch_task_cached(&created.id)
        .await
        .expect("server fetch should succeed");
    assert_eq!(fetched.title, "cached");
    assert!(
        other.store().get(&created.id).is_some(),
        "a cache miss should backfill the store"
    );
}

#[tokio::test]
async fn fetch_unknown_task_is_not_found_without_store_error() {
    let (url, _handle) = start_server().await;
    let sync = connect(&url).await;

    let result = sync.fetch_task_cached(&TaskId::new("missing")).await;
    assert!(
        matches!(result, Err(ClientError::NotFound)),
        "unknown id should be NotFound, got: {result:?}"
    );
    assert!(
        sync.store().last_error().is_none(),
        "a miss is an answer, not a store failure"
    );
}

#[tokio::test]
async fn server_rejects_invalid_draft_and_store_records_it() {
    let (url, _handle) = start_server().await;
    let sync = connect(&url).await;

    let result = sync.add_task(draft("")).await;
    match result {
        Err(ClientError::Api { status, .. }) => assert_eq!(status, 400),
        other => panic!("empty title should be a 400, got: {other:?}"),
    }
    assert!(sync.store().last_error().is_some());

    let mut bad_date = draft("fine title");
    bad_date.due_date = "next tuesday".to_string();
    let result = sync.add_task(bad_date).await;
    assert!(
        matches!(result, Err(ClientError::Api { status: 400, .. })),
        "unparseable due date should be a 400, got: {result:?}"
    );

    sync.fetch_into_store().await.expect("fetch should succeed");
    assert!(
        sync.store().tasks().is_empty(),
        "rejected drafts must not be committed"
    );
}

#[tokio::test]
async fn two_clients_see_each_others_writes() {
    let (url, _handle) = start_server().await;
    let writer = connect(&url).await;
    let reader = connect(&url).await;

    let created = writer
        .add_task(draft("shared"))
        .await
        .expect("create should succeed");

    reader
        .fetch_into_store()
        .await
        .expect("fetch should succeed");
    let seen = reader.store().get(&created.id).expect("task should exist");
    assert_eq!(seen, created);
}
