// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use std::path::PathBuf;
use time::macros::datetime;
use time::OffsetDateTime;

const TASK_VERBS: [&str; 10] = [
    "Buy", "Fix", "Clean", "Call", "Schedule", "Return", "Water", "Organize", "Replace", "Mail",
];

const TASK_OBJECTS: [&str; 12] = [
    "the groceries",
    "the kitchen faucet",
    "the gutters",
    "the dentist",
    "the car inspection",
    "the library books",
    "the plants",
    "the garage shelves",
    "the furnace filter",
    "the tax forms",
    "the bike tires",
    "the package",
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Deterministic task text generator for seeding test databases.
#[derive(Debug, Clone)]
pub struct TaskFaker {
    rng: DeterministicRng,
}

impl TaskFaker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: DeterministicRng::new(if seed == 0 { 1 } else { seed }),
        }
    }

    pub fn description(&mut self) -> String {
        format!(
            "{} {}",
            TASK_VERBS[self.rng.int_n(TASK_VERBS.len())],
            TASK_OBJECTS[self.rng.int_n(TASK_OBJECTS.len())],
        )
    }

    pub fn completed(&mut self) -> bool {
        self.rng.bool()
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("memoria-todos.db");
    Ok((dir, db_path))
}

pub fn fixture_datetime() -> OffsetDateTime {
    datetime!(2026-02-19 12:34:56 UTC)
}

/// Inserts a todo row with arbitrary raw timestamp text, bypassing the typed
/// store API so datetime-parsing fallbacks can be exercised.
pub fn seed_raw_task(
    conn: &Connection,
    description: &str,
    completed: bool,
    created_at_raw: &str,
    completed_at_raw: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO todos (completed, task, created_at, completed_at) VALUES (?, ?, ?, ?)",
        params![i64::from(completed), description, created_at_raw, completed_at_raw],
    )
    .context("seed raw todo row")?;
    Ok(conn.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::TaskFaker;
    use std::collections::BTreeSet;

    #[test]
    fn same_seed_generates_same_descriptions() {
        let mut left = TaskFaker::new(42);
        let mut right = TaskFaker::new(42);
        for _ in 0..10 {
            assert_eq!(left.description(), right.description());
        }
    }

    #[test]
    fn variety_across_seeds() {
        let mut descriptions = BTreeSet::new();
        for seed in 0_u64..20_u64 {
            let mut faker = TaskFaker::new(seed);
            descriptions.insert(faker.description());
        }
        assert!(descriptions.len() >= 10, "got {}", descriptions.len());
    }
}
