//! Integration tests for the snapshot subscription.
//!
//! A subscribed client receives the full collection immediately and again
//! after every committed mutation; each snapshot fully supersedes local
//! state. A cancelled subscription stops touching the store.

use std::sync::Arc;
use std::time::Duration;

use taskdeck::remote::RemoteTaskService;
use taskdeck::store::TaskStore;
use taskdeck::sync::SyncAdapter;
use taskdeck_core::protocol::ServerEvent;
use taskdeck_core::task::{Priority, TaskDraft};

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
        description: String::new(),
        due_date: "2026-09-15".to_string(),
        priority: Priority::Low,
        location: None,
        completed: false,
    }
}

/// Poll until `check` holds or the deadline passes.
async fn wait_until(deadline: Duration, check: impl Fn() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

#[tokio::test]
async fn subscriber_receives_current_collection_immediately() {
    let (url, _handle) = start_server().await;
    let writer = connect(&url).await;
    writer
        .add_task(draft("already there"))
        .await
        .expect("create should succeed");

    let remote = RemoteTaskService::new(&url).expect("client should build");
    remote
        .login("admin", "1234")
        .await
        .expect("login should succeed");
    let mut stream = remote.subscribe().await.expect("subscribe should succeed");

    let event = tokio::time::timeout(Duration::from_secs(5), stream.next_event())
        .await
        .expect("initial snapshot timed out")
        .expect("stream should be open")
        .expect("frame should decode");

    let ServerEvent::Snapshot { tasks } = event;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "already there");
}

#[tokio::test]
async fn mutations_push_fresh_snapshots_to_the_store() {
    let (url, _handle) = start_server().await;
    let watcher = connect(&url).await;
    let _subscription = watcher
        .spawn_subscription()
        .await
        .expect("subscribe should succeed");

    let writer = connect(&url).await;
    let created = writer
        .add_task(draft("pushed to watchers"))
        .await
        .expect("create should succeed");

    let store = Arc::clone(watcher.store());
    let arrived = wait_until(Duration::from_secs(5), || {
        store.get(&created.id).is_some()
    })
    .await;
    assert!(arrived, "created task never reached the subscribed store");

    // A snapshot carries whole records, not deltas.
    let seen = store.get(&created.id).expect("task should be present");
    assert_eq!(seen, created);
}

#[tokio::test]
async fn deletion_propagates_to_subscribers() {
    let (url, _handle) = start_server().await;
    let writer = connect(&url).await;
    let keep = writer
        .add_task(draft("survivor"))
        .await
        .expect("create should succeed");
    let doomed = writer
        .add_task(draft("doomed"))
        .await
        .expect("create should succeed");

    let watcher = connect(&url).await;
    let _subscription = watcher
        .spawn_subscription()
        .await
        .expect("subscribe should succeed");

    let store = Arc::clone(watcher.store());
    assert!(
        wait_until(Duration::from_secs(5), || store.tasks().len() == 2).await,
        "initial snapshot never arrived"
    );

    writer
        .delete_task(&doomed.id)
        .await
        .expect("delete should succeed");

    assert!(
        wait_until(Duration::from_secs(5), || store.get(&doomed.id).is_none()).await,
        "deletion never reached the subscribed store"
    );
    assert!(
        store.get(&keep.id).is_some(),
        "unrelated task must survive the snapshot"
    );
}

#[tokio::test]
async fn edits_supersede_prior_snapshot_state() {
    let (url, _handle) = start_server().await;
    let writer = connect(&url).await;
    let created = writer
        .add_task(draft("first title"))
        .await
        .expect("create should succeed");

    let watcher = connect(&url).await;
    let _subscription = watcher
        .spawn_subscription()
        .await
        .expect("subscribe should succeed");

    let store = Arc::clone(watcher.store());
    assert!(
        wait_until(Duration::from_secs(5), || store.get(&created.id).is_some()).await,
        "initial snapshot never arrived"
    );

    let mut changed = TaskDraft::from(created.clone());
    changed.title = "second title".to_string();
    changed.completed = true;
    writer
        .edit_task(&created.id, changed)
        .await
        .expect("edit should succeed");

    assert!(
        wait_until(Duration::from_secs(5), || {
            store
                .get(&created.id)
                .is_some_and(|t| t.title == "second title" && t.completed)
        })
        .await,
        "edit never reached the subscribed store"
    );
    assert_eq!(store.tasks().len(), 1, "snapshots replace, never duplicate");
}

#[tokio::test]
async fn cancelled_subscription_stops_updating_the_store() {
    let (url, _handle) = start_server().await;
    let watcher = connect(&url).await;
    let subscription = watcher
        .spawn_subscription()
        .await
        .expect("subscribe should succeed");

    let store = Arc::clone(watcher.store());
    let writer = connect(&url).await;
    let first = writer
        .add_task(draft("before cancel"))
        .await
        .expect("create should succeed");
    assert!(
        wait_until(Duration::from_secs(5), || store.get(&first.id).is_some()).await,
        "snapshot never arrived before cancellation"
    );

    subscription.cancel();
    assert!(
        wait_until(Duration::from_secs(5), || subscription.is_finished()).await,
        "cancelled subscription should finish"
    );

    writer
        .add_task(draft("after cancel"))
        .await
        .expect("create should succeed");

    // Give any stray snapshot time to land; none may.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(
        store.tasks().len(),
        1,
        "no snapshot may reach the store after cancellation"
    );
}

#[tokio::test]
async fn lagged_subscriber_converges_on_latest_snapshot() {
    let config = taskdeck_server::config::ServerConfig {
        snapshot_buffer: 1,
        ..taskdeck_server::config::ServerConfig::default()
    };
    let state = Arc::new(taskdeck_server::server::AppState::with_config(&config));
    let (addr, _handle) =
        taskdeck_server::server::start_server_with_state("127.0.0.1:0", Arc::clone(&state))
            .await
            .expect("failed to start task server");
    let url = format!("http://{addr}");

    let watcher = connect(&url).await;
    let _subscription = watcher
        .spawn_subscription()
        .await
        .expect("subscribe should succeed");

    // A one-slot buffer makes the forwarder fall behind this burst; it must
    // skip the missed snapshots and still converge on the last one.
    for i in 0..20 {
        state.store.insert(draft(&format!("burst {i}"))).await;
    }

    let store = Arc::clone(watcher.store());
    assert!(
        wait_until(Duration::from_secs(5), || store.tasks().len() == 20).await,
        "subscriber never converged after lagging"
    );

    let titles: Vec<String> = store.tasks().iter().map(|t| t.title.clone()).collect();
    let server_titles: Vec<String> = state
        .store
        .list()
        .await
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(
        titles, server_titles,
        "final store must match the authoritative collection"
    );
}

#[tokio::test]
async fn multiple_subscribers_converge_on_the_same_state() {
    let (url, _handle) = start_server().await;
    let first = connect(&url).await;
    let second = connect(&url).await;
    let _sub_a = first
        .spawn_subscription()
        .await
        .expect("subscribe should succeed");
    let _sub_b = second
        .spawn_subscription()
        .await
        .expect("subscribe should succeed");

    let writer = connect(&url).await;
    for i in 0..3 {
        writer
            .add_task(draft(&format!("broadcast {i}")))
            .await
            .expect("create should succeed");
    }

    let store_a = Arc::clone(first.store());
    let store_b = Arc::clone(second.store());
    assert!(
        wait_until(Duration::from_secs(5), || store_a.tasks().len() == 3).await,
        "first subscriber never converged"
    );
    assert!(
        wait_until(Duration::from_secs(5), || store_b.tasks().len() == 3).await,
        "second subscriber never converged"
    );

    let titles_a: Vec<String> = store_a.tasks().iter().map(|t| t.title.clone()).collect();
    let titles_b: Vec<String> = store_b.tasks().iter().map(|t| t.title.clone()).collect();
    assert_eq!(titles_a, titles_b, "subscribers must agree on order too");
}
