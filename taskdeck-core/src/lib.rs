//! Shared domain definitions for `TaskDeck`.

pub mod dashboard;
pub mod protocol;
pub mod task;
