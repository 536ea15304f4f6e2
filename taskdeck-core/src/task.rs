//! Task domain types for `TaskDeck`.
//!
//! Defines the canonical task record persisted by the remote document store
//! and mirrored in the client-side task store, plus [`TaskDraft`], the single
//! validated constructor used at every boundary (REST body decode, form
//! submit, CLI input).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Maximum allowed task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 256;

/// Wire format for due dates (`YYYY-MM-DD`).
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors that can occur when constructing or looking up tasks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    /// Task title cannot be empty.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds the maximum length.
    #[error("task title too long (max 256 characters)")]
    TitleTooLong,
    /// Due date is not a valid `YYYY-MM-DD` calendar date.
    #[error("invalid due date (expected YYYY-MM-DD): {0}")]
    InvalidDueDate(String),
    /// Task with the given ID was not found.
    #[error("task not found: {0}")]
    NotFound(String),
}

/// Opaque identifier for a task, assigned by the document store on creation
/// and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Creates a fresh time-ordered identifier (UUID v7 string).
    ///
    /// Only the document store assigns ids; clients treat them as opaque.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wraps an existing identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Task priority. Three buckets, no numeric ordering beyond the
/// classification used for dashboard aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Low priority.
    Low,
    /// Medium priority.
    Medium,
    /// High priority.
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Self::Low),
            "Medium" => Ok(Self::Medium),
            "High" => Ok(Self::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Geographic coordinates attached to a task.
///
/// Latitude and longitude are jointly present by construction; a task
/// without a location carries `None`, never a half-populated pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
}

/// A task document as held by the remote store and the client cache.
///
/// Field names on the wire match the persisted remote schema
/// (`dueDate`, `location.lat`, `location.lng`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Store-assigned identifier, unique across the collection.
    pub id: TaskId,
    /// Task title (non-empty, max 256 characters).
    pub title: String,
    /// Free-form description, may be empty.
    pub description: String,
    /// Due date as a `YYYY-MM-DD` string.
    pub due_date: String,
    /// Priority bucket.
    pub priority: Priority,
    /// Optional geolocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    /// Completion flag, defaults to false.
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    /// Parses the due date, tolerating trailing content after the
    /// `YYYY-MM-DD` prefix. Returns `None` for malformed dates.
    #[must_use]
    pub fn due_date_value(&self) -> Option<NaiveDate> {
        let prefix = self.due_date.get(..10)?;
        NaiveDate::parse_from_str(prefix, DUE_DATE_FORMAT).ok()
    }
}

/// Everything a task holds except its identifier.
///
/// This is the canonical validated constructor: every boundary that accepts
/// task fields (REST create/replace bodies, CLI input) decodes into a draft
/// and calls [`TaskDraft::validate`] before the record reaches a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    /// Task title (non-empty, max 256 characters).
    pub title: String,
    /// Free-form description, may be empty.
    #[serde(default)]
    pub description: String,
    /// Due date as a `YYYY-MM-DD` string.
    pub due_date: String,
    /// Priority bucket.
    pub priority: Priority,
    /// Optional geolocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    /// Completion flag, defaults to false.
    #[serde(default)]
    pub completed: bool,
}

impl TaskDraft {
    /// Checks the draft invariants.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TitleEmpty`] if the title is empty,
    /// [`TaskError::TitleTooLong`] if it exceeds 256 characters, or
    /// [`TaskError::InvalidDueDate`] if the due date is not a canonical
    /// `YYYY-MM-DD` calendar date.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.title.is_empty() {
            return Err(TaskError::TitleEmpty);
        }
        if self.title.chars().count() > MAX_TASK_TITLE_LENGTH {
            return Err(TaskError::TitleTooLong);
        }
        // chrono accepts unpadded components like 2026-9-1; only the
        // canonical zero-padded form works with the fixed-width prefix
        // handling in due_date_value and the dashboard trend.
        match NaiveDate::parse_from_str(&self.due_date, DUE_DATE_FORMAT) {
            Ok(date) if date.format(DUE_DATE_FORMAT).to_string() == self.due_date => Ok(()),
            _ => Err(TaskError::InvalidDueDate(self.due_date.clone())),
        }
    }

    /// Attaches an identifier, producing a full task record.
    #[must_use]
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            priority: self.priority,
            location: self.location,
            completed: self.completed,
        }
    }
}

impl From<Task> for TaskDraft {
    fn from(task: Task) -> Self {
        Self {
            title: task.title,
            description: task.description,
            due_date: task.due_date,
            priority: task.priority,
            location: task.location,
            completed: task.completed,
        }
    }
}
