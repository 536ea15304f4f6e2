//! Dashboard aggregation over a task collection snapshot.
//!
//! Pure, synchronous derivations recomputed from scratch on every snapshot
//! change. Nothing here persists state, so recomputation is idempotent and
//! there are no incremental-update edge cases.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::task::{DUE_DATE_FORMAT, Priority, Task};

/// Number of trailing calendar days covered by the completion trend.
const TREND_DAYS: u64 = 7;

/// Task counts bucketed by the three priority values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    /// Number of low-priority tasks.
    pub low: usize,
    /// Number of medium-priority tasks.
    pub medium: usize,
    /// Number of high-priority tasks.
    pub high: usize,
}

impl PriorityCounts {
    /// Sum of all three buckets. Always equals the total task count,
    /// since every task carries exactly one priority.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.low + self.medium + self.high
    }
}

/// One day of the trailing completion trend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Calendar day as a `YYYY-MM-DD` string.
    pub day: String,
    /// Tasks both completed and due on this day.
    pub completed: usize,
}

/// Aggregate statistics derived from one task collection snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Total number of tasks.
    pub total: usize,
    /// Tasks with the completion flag set.
    pub completed: usize,
    /// Tasks with the completion flag unset.
    pub pending: usize,
    /// Counts by priority bucket.
    pub priority: PriorityCounts,
    /// Tasks due strictly after today, ascending by due date.
    pub upcoming: Vec<Task>,
    /// Trailing seven-day completion histogram, oldest day first.
    pub trend: Vec<TrendPoint>,
}

impl DashboardStats {
    /// Computes all dashboard statistics for the given snapshot, with
    /// `today` as the reference date.
    #[must_use]
    pub fn compute(tasks: &[Task], today: NaiveDate) -> Self {
        let completed = tasks.iter().filter(|t| t.completed).count();
        Self {
            total: tasks.len(),
            completed,
            pending: tasks.len() - completed,
            priority: priority_counts(tasks),
            upcoming: upcoming(tasks, today),
            trend: completion_trend(tasks, today),
        }
    }

    /// Computes statistics against the current local date.
    #[must_use]
    pub fn for_today(tasks: &[Task]) -> Self {
        Self::compute(tasks, chrono::Local::now().date_naive())
    }
}

/// Buckets tasks by priority.
#[must_use]
pub fn priority_counts(tasks: &[Task]) -> PriorityCounts {
    let mut counts = PriorityCounts::default();
    for task in tasks {
        match task.priority {
            Priority::Low => counts.low += 1,
            Priority::Medium => counts.medium += 1,
            Priority::High => counts.high += 1,
        }
    }
    counts
}

/// Returns the tasks due strictly after `today`, sorted ascending by due
/// date. Tasks with unparseable due dates are excluded.
#[must_use]
pub fn upcoming(tasks: &[Task], today: NaiveDate) -> Vec<Task> {
    let mut due: Vec<(NaiveDate, Task)> = tasks
        .iter()
        .filter_map(|t| t.due_date_value().map(|d| (d, t.clone())))
        .filter(|(d, _)| *d > today)
        .collect();
    due.sort_by_key(|(d, _)| *d);
    due.into_iter().map(|(_, t)| t).collect()
}

/// Trailing seven-calendar-day completion histogram ending at `today`,
/// oldest day first.
///
/// A task counts toward a day when it is completed and its stored due-date
/// string starts with that day's `YYYY-MM-DD` string.
#[must_use]
pub fn completion_trend(tasks: &[Task], today: NaiveDate) -> Vec<TrendPoint> {
    (0..TREND_DAYS)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .map(|day| {
            let day = day.format(DUE_DATE_FORMAT).to_string();
            let completed = tasks
                .iter()
                .filter(|t| t.completed && t.due_date.starts_with(&day))
                .count();
            TrendPoint { day, completed }
        })
        .collect()
}
