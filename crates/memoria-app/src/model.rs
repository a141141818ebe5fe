// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Durable surrogate identity for a task. Provisional values are handed out by
/// the in-memory store; the persistence layer re-binds the database id on
/// write-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(i64);

impl TaskId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for TaskId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A single TODO entry. `completed_at` is `Some` exactly when `completed` is
/// true; `created_at` never changes after construction. Descriptions may
/// contain embedded newlines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub created_at: OffsetDateTime,
    pub completed: bool,
    pub completed_at: Option<OffsetDateTime>,
}

impl Task {
    pub fn new(id: TaskId, description: impl Into<String>, created_at: OffsetDateTime) -> Self {
        Self {
            id,
            description: description.into(),
            created_at,
            completed: false,
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Task, TaskId};
    use time::macros::datetime;

    #[test]
    fn new_task_starts_incomplete_without_completion_time() {
        let task = Task::new(TaskId::new(7), "Buy milk", datetime!(2026-02-01 09:30 UTC));
        assert_eq!(task.id, TaskId::new(7));
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
        assert_eq!(task.created_at, datetime!(2026-02-01 09:30 UTC));
    }

    #[test]
    fn task_id_round_trips_through_i64() {
        let id = TaskId::from(42);
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
    }
}
