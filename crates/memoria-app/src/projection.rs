// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::OffsetDateTime;
use time::macros::format_description;

use crate::{TaskId, TaskStore};

pub const COMPLETED_PLACEHOLDER: &str = "-";

/// One display-ready table row. `index` is the task's canonical (unfiltered)
/// position in the store and doubles as the row's selectable key, so a
/// selected row maps straight back to a store index without a lookup table.
/// `id` is the task's durable identity, carried so mutations can be persisted
/// without a second store read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub index: i64,
    pub id: TaskId,
    pub done: bool,
    pub description: String,
    pub created_at: String,
    pub completed_at: String,
}

/// Filtered, display-ordered view over the canonical store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableProjection {
    rows: Vec<TaskRow>,
}

impl TableProjection {
    /// Single pass over canonical order. When hiding completed tasks the
    /// surviving rows keep their canonical indices, so keys are sparse rather
    /// than dense row counters.
    pub fn build(store: &TaskStore, hide_completed: bool) -> Self {
        let rows = store
            .tasks()
            .iter()
            .enumerate()
            .filter(|(_, task)| !(hide_completed && task.completed))
            .map(|(index, task)| TaskRow {
                index: index as i64,
                id: task.id,
                done: task.completed,
                description: task.description.clone(),
                created_at: format_date(task.created_at),
                completed_at: task
                    .completed_at
                    .map(format_date)
                    .unwrap_or_else(|| COMPLETED_PLACEHOLDER.to_owned()),
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[TaskRow] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, position: usize) -> Option<&TaskRow> {
        self.rows.get(position)
    }

    /// Display position of the row whose canonical key matches, or 0 when the
    /// key is no longer visible. Keeps the cursor on the same task across
    /// rebuilds.
    pub fn position_of_key(&self, key: i64) -> usize {
        self.rows
            .iter()
            .position(|row| row.index == key)
            .unwrap_or(0)
    }
}

fn format_date(value: OffsetDateTime) -> String {
    value
        .date()
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| "1970-01-01".to_owned())
}

#[cfg(test)]
mod tests {
    use super::{COMPLETED_PLACEHOLDER, TableProjection};
    use crate::TaskStore;
    use time::OffsetDateTime;
    use time::macros::datetime;

    fn now() -> OffsetDateTime {
        datetime!(2026-03-14 12:00 UTC)
    }

    fn three_task_store_with_middle_completed() -> TaskStore {
        let mut store = TaskStore::new();
        store.add("oldest", now());
        store.add("middle", now());
        store.add("newest", now());
        store.toggle(1, now()).expect("complete middle task");
        store
    }

    #[test]
    fn hidden_rows_keep_canonical_indices() {
        let store = three_task_store_with_middle_completed();
        let projection = TableProjection::build(&store, true);

        assert_eq!(projection.row_count(), 2);
        let keys: Vec<i64> = projection.rows().iter().map(|row| row.index).collect();
        assert_eq!(keys, vec![0, 2]);
    }

    #[test]
    fn unfiltered_projection_lists_every_task() {
        let store = three_task_store_with_middle_completed();
        let projection = TableProjection::build(&store, false);

        assert_eq!(projection.row_count(), 3);
        assert!(projection.rows()[1].done);
        assert_eq!(projection.rows()[1].completed_at, "2026-03-14");
        assert_eq!(projection.rows()[0].completed_at, COMPLETED_PLACEHOLDER);
    }

    #[test]
    fn position_of_key_round_trips_for_every_row() {
        let store = three_task_store_with_middle_completed();
        for hide_completed in [false, true] {
            let projection = TableProjection::build(&store, hide_completed);
            for (position, row) in projection.rows().iter().enumerate() {
                assert_eq!(projection.position_of_key(row.index), position);
            }
        }
    }

    #[test]
    fn position_of_key_defaults_to_zero_for_hidden_rows() {
        let store = three_task_store_with_middle_completed();
        let projection = TableProjection::build(&store, true);
        assert_eq!(projection.position_of_key(1), 0);
        assert_eq!(projection.position_of_key(99), 0);
    }

    #[test]
    fn rows_carry_durable_identity() {
        let store = three_task_store_with_middle_completed();
        let projection = TableProjection::build(&store, false);
        for row in projection.rows() {
            let task = store.get(row.index).expect("row key resolves");
            assert_eq!(task.id, row.id);
        }
    }
}
