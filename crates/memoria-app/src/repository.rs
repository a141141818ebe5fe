// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;
use time::OffsetDateTime;

use crate::{Task, TaskId, TaskMutation};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("task {0} not found")]
    NotFound(TaskId),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Persistence seam for tasks. The in-memory store remains authoritative for
/// display; implementations only need to mirror mutations and hand back
/// durable identities on insert.
pub trait TaskRepository {
    /// All persisted tasks, newest-first.
    fn load_all(&mut self) -> Result<Vec<Task>, RepositoryError>;

    /// Persists a new incomplete task and returns it with its durable id.
    fn insert(&mut self, description: &str, created_at: OffsetDateTime)
    -> Result<Task, RepositoryError>;

    fn update_description(&mut self, id: TaskId, description: &str)
    -> Result<(), RepositoryError>;

    fn set_completion(
        &mut self,
        id: TaskId,
        completed: bool,
        completed_at: Option<OffsetDateTime>,
    ) -> Result<(), RepositoryError>;

    fn remove(&mut self, id: TaskId) -> Result<(), RepositoryError>;
}

/// Mirrors one already-applied store mutation into the repository. Returns
/// the persisted task for `Added` so the caller can adopt its durable id.
pub fn apply_mutation<R: TaskRepository + ?Sized>(
    repository: &mut R,
    mutation: &TaskMutation,
) -> Result<Option<Task>, RepositoryError> {
    match mutation {
        TaskMutation::Added {
            description,
            created_at,
        } => repository.insert(description, *created_at).map(Some),
        TaskMutation::Toggled {
            id,
            completed,
            completed_at,
        } => repository
            .set_completion(*id, *completed, *completed_at)
            .map(|()| None),
        TaskMutation::Edited { id, description } => repository
            .update_description(*id, description)
            .map(|()| None),
        TaskMutation::Deleted { id } => repository.remove(*id).map(|()| None),
    }
}

/// Vec-backed repository for tests and ephemeral sessions. Assigns ids the
/// way the database does: monotonically, never reusing a removed one.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tasks: Vec<Task>,
    next_id: i64,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 1,
        }
    }

    fn position(&self, id: TaskId) -> Result<usize, RepositoryError> {
        self.tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or(RepositoryError::NotFound(id))
    }
}

impl TaskRepository for MemoryRepository {
    fn load_all(&mut self) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.tasks.clone())
    }

    fn insert(
        &mut self,
        description: &str,
        created_at: OffsetDateTime,
    ) -> Result<Task, RepositoryError> {
        let task = Task::new(TaskId::new(self.next_id), description, created_at);
        self.next_id += 1;
        self.tasks.insert(0, task.clone());
        Ok(task)
    }

    fn update_description(
        &mut self,
        id: TaskId,
        description: &str,
    ) -> Result<(), RepositoryError> {
        let position = self.position(id)?;
        self.tasks[position].description = description.to_owned();
        Ok(())
    }

    fn set_completion(
        &mut self,
        id: TaskId,
        completed: bool,
        completed_at: Option<OffsetDateTime>,
    ) -> Result<(), RepositoryError> {
        let position = self.position(id)?;
        self.tasks[position].completed = completed;
        self.tasks[position].completed_at = completed_at;
        Ok(())
    }

    fn remove(&mut self, id: TaskId) -> Result<(), RepositoryError> {
        let position = self.position(id)?;
        self.tasks.remove(position);
        Ok(())
    }
}
