//! Authoritative in-memory task document store.
//!
//! The [`DocumentStore`] holds the insertion-ordered task collection, assigns
//! document identifiers on insert, and broadcasts a full snapshot of the
//! collection after every committed mutation. Subscribers that lag simply
//! miss intermediate snapshots; each snapshot fully replaces prior state, so
//! only the most recent one matters.

use tokio::sync::{RwLock, broadcast};

use taskdeck_core::task::{Task, TaskDraft, TaskError, TaskId};

/// Default capacity of the snapshot broadcast channel.
const DEFAULT_SNAPSHOT_BUFFER: usize = 64;

/// In-memory document collection with snapshot fan-out.
///
/// Ids are unique across the collection at any instant; insertion order is
/// preserved and is the order every read path returns.
pub struct DocumentStore {
    tasks: RwLock<Vec<Task>>,
    snapshots: broadcast::Sender<Vec<Task>>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    /// Creates an empty store with the default snapshot buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_snapshot_buffer(DEFAULT_SNAPSHOT_BUFFER)
    }

    /// Creates an empty store with a custom snapshot buffer capacity.
    #[must_use]
    pub fn with_snapshot_buffer(capacity: usize) -> Self {
        let (snapshots, _) = broadcast::channel(capacity.max(1));
        Self {
            tasks: RwLock::new(Vec::new()),
            snapshots,
        }
    }

    /// Returns the full collection in insertion order.
    pub async fn list(&self) -> Vec<Task> {
        self.tasks.read().await.clone()
    }

    /// Returns the task with the given id, if present.
    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        self.tasks.read().await.iter().find(|t| &t.id == id).cloned()
    }

    /// Inserts a new document, assigning a fresh identifier.
    ///
    /// The draft is assumed validated by the caller; the store publishes a
    /// snapshot before returning.
    pub async fn insert(&self, draft: TaskDraft) -> Task {
        let task = draft.into_task(TaskId::generate());
        let mut tasks = self.tasks.write().await;
        tasks.push(task.clone());
        self.publish(&tasks);
        drop(tasks);
        task
    }

    /// Replaces the document at the given id with the draft (full-record
    /// replace semantics, no field-level patching).
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] if no document has that id.
    pub async fn replace(&self, id: &TaskId, draft: TaskDraft) -> Result<Task, TaskError> {
        let mut tasks = self.tasks.write().await;
        let Some(slot) = tasks.iter_mut().find(|t| &t.id == id) else {
            return Err(TaskError::NotFound(id.to_string()));
        };
        *slot = draft.into_task(id.clone());
        let task = slot.clone();
        self.publish(&tasks);
        drop(tasks);
        Ok(task)
    }

    /// Removes the document with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] if no document has that id.
    pub async fn delete(&self, id: &TaskId) -> Result<(), TaskError> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| &t.id != id);
        if tasks.len() == before {
            return Err(TaskError::NotFound(id.to_string()));
        }
        self.publish(&tasks);
        drop(tasks);
        Ok(())
    }

    /// Subscribes to snapshot broadcasts. The receiver observes one full
    /// collection per committed mutation, in commit order.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<Task>> {
        self.snapshots.subscribe()
    }

    /// Publishes a snapshot while the write lock is still held, so publish
    /// order always matches commit order.
    fn publish(&self, tasks: &[Task]) {
        // A send error only means no subscriber is currently listening.
        let _ = self.snapshots.send(tasks.to_vec());
    }
}
