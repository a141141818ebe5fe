// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;
use time::OffsetDateTime;

use crate::{Task, TaskId};

/// A canonical index fell outside the store's current bounds. Only reachable
/// through bugs in index translation, never through ordinary user input, so
/// callers treat it as a skippable no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("task index {index} out of bounds for store of length {len}")]
pub struct InvalidIndex {
    pub index: i64,
    pub len: usize,
}

/// Ordered task collection, newest-first. Position 0 is always the most
/// recently added task; canonical indices shift on delete but task identity
/// never does. Not thread-safe; the single-threaded event loop serializes
/// access.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    next_id: i64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 1,
        }
    }

    /// Builds a store from already-persisted tasks, preserving their order
    /// (callers supply newest-first). Provisional ids continue above the
    /// largest loaded id so they never collide with durable ones.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let next_id = tasks
            .iter()
            .map(|task| task.id.get())
            .max()
            .unwrap_or(0)
            .saturating_add(1);
        Self { tasks, next_id }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, index: i64) -> Option<&Task> {
        usize::try_from(index).ok().and_then(|i| self.tasks.get(i))
    }

    /// Prepends a new incomplete task and returns its provisional identity.
    /// No error conditions: empty descriptions and embedded newlines are
    /// accepted as-is.
    pub fn add(&mut self, description: &str, now: OffsetDateTime) -> TaskId {
        let id = TaskId::new(self.next_id);
        self.next_id += 1;
        self.tasks.insert(0, Task::new(id, description, now));
        id
    }

    /// Replaces a provisional identity with the durable one assigned by the
    /// repository. Leaves every other field untouched.
    pub fn bind_identity(&mut self, index: i64, id: TaskId) -> Result<(), InvalidIndex> {
        let slot = self.slot(index)?;
        self.tasks[slot].id = id;
        if id.get() >= self.next_id {
            self.next_id = id.get() + 1;
        }
        Ok(())
    }

    /// Flips completion at the canonical index. Completing stamps
    /// `completed_at = now`; un-completing clears it.
    pub fn toggle(&mut self, index: i64, now: OffsetDateTime) -> Result<(), InvalidIndex> {
        let slot = self.slot(index)?;
        let task = &mut self.tasks[slot];
        task.completed = !task.completed;
        task.completed_at = task.completed.then_some(now);
        Ok(())
    }

    /// Replaces the description in place; completion state and timestamps are
    /// untouched.
    pub fn edit(&mut self, index: i64, description: &str) -> Result<(), InvalidIndex> {
        let slot = self.slot(index)?;
        self.tasks[slot].description = description.to_owned();
        Ok(())
    }

    /// Removes the task at the canonical index, shifting later positions down
    /// by one. Any previously computed position mapping is stale afterwards.
    pub fn delete(&mut self, index: i64) -> Result<(), InvalidIndex> {
        let slot = self.slot(index)?;
        self.tasks.remove(slot);
        Ok(())
    }

    fn slot(&self, index: i64) -> Result<usize, InvalidIndex> {
        usize::try_from(index)
            .ok()
            .filter(|slot| *slot < self.tasks.len())
            .ok_or(InvalidIndex {
                index,
                len: self.tasks.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{InvalidIndex, TaskStore};
    use crate::TaskId;
    use time::macros::datetime;
    use time::OffsetDateTime;

    fn now() -> OffsetDateTime {
        datetime!(2026-03-14 12:00 UTC)
    }

    #[test]
    fn adds_prepend_newest_first() {
        let mut store = TaskStore::new();
        for description in ["one", "two", "three"] {
            store.add(description, now());
        }

        let order: Vec<&str> = store
            .tasks()
            .iter()
            .map(|task| task.description.as_str())
            .collect();
        assert_eq!(order, vec!["three", "two", "one"]);
    }

    #[test]
    fn toggle_twice_restores_original_completion() {
        let mut store = TaskStore::new();
        store.add("Buy milk", now());

        store.toggle(0, now()).expect("toggle on");
        assert!(store.get(0).expect("task").completed);
        assert_eq!(store.get(0).expect("task").completed_at, Some(now()));

        store.toggle(0, now()).expect("toggle off");
        assert!(!store.get(0).expect("task").completed);
        assert_eq!(store.get(0).expect("task").completed_at, None);
    }

    #[test]
    fn edit_preserves_completion_and_created_at() {
        let mut store = TaskStore::new();
        store.add("Buy milk", now());
        store.toggle(0, now()).expect("toggle");

        store.edit(0, "Buy oat milk").expect("edit");

        let task = store.get(0).expect("task");
        assert_eq!(task.description, "Buy oat milk");
        assert!(task.completed);
        assert_eq!(task.completed_at, Some(now()));
        assert_eq!(task.created_at, now());
    }

    #[test]
    fn delete_shifts_later_positions_and_leaves_earlier_tasks_alone() {
        let mut store = TaskStore::new();
        store.add("one", now());
        store.add("two", now());
        store.add("three", now());

        let before: Vec<_> = store.tasks()[..1].to_vec();
        store.delete(1).expect("delete middle");

        assert_eq!(store.len(), 2);
        assert_eq!(store.tasks()[..1], before[..]);
        assert_eq!(store.get(1).expect("shifted task").description, "one");
    }

    #[test]
    fn out_of_bounds_indices_fail_without_mutating() {
        let mut store = TaskStore::new();
        store.add("Buy milk", now());
        let snapshot = store.clone();

        for index in [-1, 1, 99] {
            assert_eq!(
                store.toggle(index, now()),
                Err(InvalidIndex { index, len: 1 })
            );
            assert_eq!(store.edit(index, "x"), Err(InvalidIndex { index, len: 1 }));
            assert_eq!(store.delete(index), Err(InvalidIndex { index, len: 1 }));
        }
        assert_eq!(store, snapshot);
    }

    #[test]
    fn bind_identity_adopts_durable_id_and_advances_counter() {
        let mut store = TaskStore::new();
        store.add("Buy milk", now());

        store
            .bind_identity(0, TaskId::new(50))
            .expect("bind identity");
        assert_eq!(store.get(0).expect("task").id, TaskId::new(50));

        let next = store.add("Buy bread", now());
        assert_eq!(next, TaskId::new(51));
    }

    #[test]
    fn from_tasks_continues_ids_above_loaded_maximum() {
        let mut seeded = TaskStore::new();
        seeded.add("persisted", now());
        seeded.bind_identity(0, TaskId::new(9)).expect("bind");

        let mut store = TaskStore::from_tasks(seeded.tasks().to_vec());
        let id = store.add("fresh", now());
        assert_eq!(id, TaskId::new(10));
    }

    #[test]
    fn scenario_add_toggle_delete() {
        let mut store = TaskStore::new();
        store.add("Buy milk", now());
        store.add("Buy bread", now());
        assert_eq!(store.get(0).expect("task").description, "Buy bread");
        assert_eq!(store.get(1).expect("task").description, "Buy milk");

        store.toggle(1, now()).expect("toggle milk");
        assert!(store.get(1).expect("milk").completed);
        assert!(store.get(1).expect("milk").completed_at.is_some());
        assert!(!store.get(0).expect("bread").completed);

        store.delete(0).expect("delete bread");
        assert_eq!(store.len(), 1);
        let remaining = store.get(0).expect("milk");
        assert_eq!(remaining.description, "Buy milk");
        assert!(remaining.completed);
    }
}
