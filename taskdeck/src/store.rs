//! Client-side task collection state.
//!
//! [`TaskCollectionState`] holds the locally known task list plus loading and
//! error flags, with pure transition methods. [`TaskStore`] wraps it in a
//! lock so several parts of the client (CLI commands, a background
//! subscription task) can share one handle behind an `Arc`.

use parking_lot::RwLock;
use taskdeck_core::task::{Task, TaskId};

/// Locally known task collection plus request status flags.
#[derive(Debug, Default, Clone)]
pub struct TaskCollectionState {
    /// Tasks as last observed. Ordering follows the server's collection.
    pub tasks: Vec<Task>,
    /// Whether a fetch is in flight.
    pub loading: bool,
    /// Message from the most recent failed operation, if any.
    pub error: Option<String>,
}

impl TaskCollectionState {
    /// Replace the whole collection and clear the loading flag.
    ///
    /// Tasks absent from `tasks` are dropped; this is how server snapshots
    /// and full refetches are applied.
    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.loading = false;
    }

    /// Append a task unless one with the same id is already present.
    pub fn append_task(&mut self, task: Task) {
        if !self.tasks.iter().any(|t| t.id == task.id) {
            self.tasks.push(task);
        }
    }

    /// Replace the task with a matching id in place.
    ///
    /// Returns `false` (and changes nothing) when no task has that id.
    pub fn update_task(&mut self, task: Task) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => {
                *slot = task;
                true
            }
            None => false,
        }
    }

    /// Remove the task with the given id, if present.
    pub fn remove_task(&mut self, id: &TaskId) {
        self.tasks.retain(|t| t.id != *id);
    }

    /// Mark a fetch as in flight and clear any previous error.
    pub fn set_loading(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Record a failure. Replaces any previous error and ends loading.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.loading = false;
    }
}

/// Shared, lock-protected [`TaskCollectionState`].
#[derive(Debug, Default)]
pub struct TaskStore {
    state: RwLock<TaskCollectionState>,
}

impl TaskStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of the full current state.
    #[must_use]
    pub fn snapshot(&self) -> TaskCollectionState {
        self.state.read().clone()
    }

    /// Clone of the current task list.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.state.read().tasks.clone()
    }

    /// Look up a single task by id.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<Task> {
        self.state.read().tasks.iter().find(|t| t.id == *id).cloned()
    }

    /// Whether a fetch is currently in flight.
    #[must_use]
    pub fn loading(&self) -> bool {
        self.state.read().loading
    }

    /// Message from the most recent failed operation, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    /// See [`TaskCollectionState::set_tasks`].
    pub fn set_tasks(&self, tasks: Vec<Task>) {
        self.state.write().set_tasks(tasks);
    }

    /// See [`TaskCollectionState::append_task`].
    pub fn append_task(&self, task: Task) {
        self.state.write().append_task(task);
    }

    /// See [`TaskCollectionState::update_task`].
    pub fn update_task(&self, task: Task) -> bool {
        self.state.write().update_task(task)
    }

    /// See [`TaskCollectionState::remove_task`].
    pub fn remove_task(&self, id: &TaskId) {
        self.state.write().remove_task(id);
    }

    /// See [`TaskCollectionState::set_loading`].
    pub fn set_loading(&self) {
        self.state.write().set_loading();
    }

    /// See [`TaskCollectionState::set_error`].
    pub fn set_error(&self, message: impl Into<String>) {
        self.state.write().set_error(message);
    }
}
