//! Glue between the remote service and the local store.
//!
//! Every mutation goes to the server first; the local [`TaskStore`] is only
//! touched once the server has committed, so the store never shows a write
//! the server rejected. Failures are recorded on the store as well as
//! returned, so UI layers polling the store see them.

use std::sync::Arc;

use taskdeck_core::protocol::ServerEvent;
use taskdeck_core::task::{Task, TaskDraft, TaskId};
use tokio::task::JoinHandle;

use crate::remote::{ClientError, RemoteTaskService};
use crate::store::TaskStore;

/// Keeps a [`TaskStore`] consistent with one server.
#[derive(Debug, Clone)]
pub struct SyncAdapter {
    store: Arc<TaskStore>,
    remote: Arc<RemoteTaskService>,
}

impl SyncAdapter {
    /// Pair a store with a remote service.
    #[must_use]
    pub fn new(store: Arc<TaskStore>, remote: Arc<RemoteTaskService>) -> Self {
        Self { store, remote }
    }

    /// The shared store this adapter writes into.
    #[must_use]
    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    /// Refetch the full collection into the store.
    ///
    /// # Errors
    ///
    /// On failure the store keeps its previous tasks and records the error.
    pub async fn fetch_into_store(&self) -> Result<(), ClientError> {
        self.store.set_loading();
        match self.remote.fetch_tasks().await {
            Ok(tasks) => {
                self.store.set_tasks(tasks);
                Ok(())
            }
            Err(e) => {
                self.store.set_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Create a task on the server, then append it locally.
    ///
    /// # Errors
    ///
    /// On failure nothing is appended and the error is recorded.
    pub async fn add_task(&self, draft: TaskDraft) -> Result<Task, ClientError> {
        match self.remote.create_task(&draft).await {
            Ok(task) => {
                self.store.append_task(task.clone());
                Ok(task)
            }
            Err(e) => {
                self.store.set_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Replace a task on the server, then mirror the result locally.
    ///
    /// The returned record is upserted: updated in place when the store
    /// already holds the id, appended when it does not (e.g. the store was
    /// never populated with the full list).
    ///
    /// # Errors
    ///
    /// On failure the store is left untouched apart from the recorded error.
    pub async fn edit_task(&self, id: &TaskId, draft: TaskDraft) -> Result<Task, ClientError> {
        match self.remote.update_task(id, &draft).await {
            Ok(task) => {
                if !self.store.update_task(task.clone()) {
                    self.store.append_task(task.clone());
                }
                Ok(task)
            }
            Err(e) => {
                self.store.set_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Delete a task on the server, then drop it locally.
    ///
    /// # Errors
    ///
    /// On failure the task stays in the store and the error is recorded.
    pub async fn delete_task(&self, id: &TaskId) -> Result<(), ClientError> {
        match self.remote.delete_task(id).await {
            Ok(()) => {
                self.store.remove_task(id);
                Ok(())
            }
            Err(e) => {
                self.store.set_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Fetch one task, preferring the local copy.
    ///
    /// A cache miss fetches from the server and appends the result. A
    /// [`ClientError::NotFound`] is returned as-is without recording a store
    /// error: asking for an unknown id is an answer, not a failure.
    ///
    /// # Errors
    ///
    /// Transport failures are recorded on the store and returned.
    pub async fn fetch_task_cached(&self, id: &TaskId) -> Result<Task, ClientError> {
        if let Some(task) = self.store.get(id) {
            return Ok(task);
        }
        match self.remote.fetch_task(id).await {
            Ok(task) => {
                self.store.append_task(task.clone());
                Ok(task)
            }
            Err(e @ ClientError::NotFound) => Err(e),
            Err(e) => {
                self.store.set_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Spawn a background task applying server snapshots to the store.
    ///
    /// The subscription runs until the server closes the stream or the
    /// returned handle is cancelled (or dropped). After cancellation no
    /// further snapshots reach the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the WebSocket subscription cannot be opened.
    pub async fn spawn_subscription(&self) -> Result<Subscription, ClientError> {
        let mut stream = self.remote.subscribe().await?;
        let store = Arc::clone(&self.store);

        let handle = tokio::spawn(async move {
            while let Some(event) = stream.next_event().await {
                match event {
                    Ok(ServerEvent::Snapshot { tasks }) => {
                        tracing::debug!(count = tasks.len(), "applying snapshot");
                        store.set_tasks(tasks);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "subscription frame error");
                    }
                }
            }
            tracing::debug!("subscription stream closed");
        });

        Ok(Subscription { handle })
    }
}

/// Handle to a running snapshot subscription.
///
/// Dropping the handle cancels the subscription.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Stop applying snapshots immediately.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the background task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
