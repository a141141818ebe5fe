// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use memoria_app::{RepositoryError, Task, TaskId, TaskRepository};
use rusqlite::{Connection, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

pub const APP_NAME: &str = "memoria";
pub const DB_FILE_NAME: &str = "memoria-todos.db";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[(
    "todos",
    &["id", "completed", "task", "created_at", "completed_at"],
)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[RequiredIndex {
    name: "idx_todos_completed",
    create_sql: "CREATE INDEX IF NOT EXISTS idx_todos_completed ON todos (completed);",
}];

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        if printable != ":memory:" {
            set_private_permissions(path)?;
        }
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }

        ensure_required_indexes(&self.conn)?;
        Ok(())
    }

    /// All tasks, newest insertion first.
    pub fn load_tasks(&self) -> Result<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT id, completed, task, created_at, completed_at
                FROM todos
                ORDER BY id DESC
                ",
            )
            .context("prepare tasks query")?;
        let rows = stmt
            .query_map([], |row| {
                let completed: i64 = row.get(1)?;
                let created_at_raw: String = row.get(3)?;
                let completed_at_raw: Option<String> = row.get(4)?;
                Ok(Task {
                    id: TaskId::new(row.get(0)?),
                    description: row.get(2)?,
                    created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
                    completed: completed != 0,
                    completed_at: parse_opt_datetime(completed_at_raw).map_err(to_sql_error)?,
                })
            })
            .context("query tasks")?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect tasks")
    }

    pub fn insert_task(&self, description: &str, created_at: OffsetDateTime) -> Result<Task> {
        self.conn
            .execute(
                "INSERT INTO todos (completed, task, created_at) VALUES (0, ?, ?)",
                params![description, format_datetime(created_at)?],
            )
            .context("insert task")?;
        Ok(Task::new(
            TaskId::new(self.conn.last_insert_rowid()),
            description,
            created_at,
        ))
    }

    pub fn update_task_description(&self, id: TaskId, description: &str) -> Result<bool> {
        let rows_affected = self
            .conn
            .execute(
                "UPDATE todos SET task = ? WHERE id = ?",
                params![description, id.get()],
            )
            .with_context(|| format!("update description of task {id}"))?;
        Ok(rows_affected > 0)
    }

    pub fn set_task_completion(
        &self,
        id: TaskId,
        completed: bool,
        completed_at: Option<OffsetDateTime>,
    ) -> Result<bool> {
        let completed_at = completed_at.map(format_datetime).transpose()?;
        let rows_affected = self
            .conn
            .execute(
                "UPDATE todos SET completed = ?, completed_at = ? WHERE id = ?",
                params![i64::from(completed), completed_at, id.get()],
            )
            .with_context(|| format!("set completion of task {id}"))?;
        Ok(rows_affected > 0)
    }

    pub fn delete_task(&self, id: TaskId) -> Result<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM todos WHERE id = ?", params![id.get()])
            .with_context(|| format!("delete task {id}"))?;
        Ok(rows_affected > 0)
    }
}

impl TaskRepository for Store {
    fn load_all(&mut self) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.load_tasks()?)
    }

    fn insert(
        &mut self,
        description: &str,
        created_at: OffsetDateTime,
    ) -> Result<Task, RepositoryError> {
        Ok(self.insert_task(description, created_at)?)
    }

    fn update_description(&mut self, id: TaskId, description: &str)
    -> Result<(), RepositoryError> {
        if !self.update_task_description(id, description)? {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }

    fn set_completion(
        &mut self,
        id: TaskId,
        completed: bool,
        completed_at: Option<OffsetDateTime>,
    ) -> Result<(), RepositoryError> {
        if !self.set_task_completion(id, completed, completed_at)? {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }

    fn remove(&mut self, id: TaskId) -> Result<(), RepositoryError> {
        if !self.delete_task(id)? {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }
}

/// Seeds a handful of tasks for demo sessions. One entry is already
/// completed and one spans two lines, so the table and filter have something
/// to show immediately.
pub fn seed_demo_tasks(store: &Store) -> Result<()> {
    let now = OffsetDateTime::now_utc();
    store.insert_task("Water the plants", now)?;
    store.insert_task("Buy bread and some other stuff\nCoffee", now)?;
    let done = store.insert_task("Take out the recycling", now)?;
    store.set_task_completion(done.id, true, Some(now))?;
    store.insert_task("Call the dentist", now)?;
    Ok(())
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("MEMORIA_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set MEMORIA_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join(DB_FILE_NAME))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; use a memoria-compatible database or migrate first"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; run migration before launching",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("ensure required index `{}`", index.name))?;
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    let names = rows
        .collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))?;
    Ok(names)
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn format_datetime(value: OffsetDateTime) -> Result<String> {
    value.format(&Rfc3339).context("format timestamp")
}

fn parse_datetime(raw: &str) -> Result<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(value);
    }

    if let Ok(value) = OffsetDateTime::parse(
        raw,
        &format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]"
        ),
    ) {
        return Ok(value);
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    ) {
        return Ok(value.assume_utc());
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    bail!("unsupported datetime format {raw:?}")
}

fn parse_opt_datetime(raw: Option<String>) -> Result<Option<OffsetDateTime>> {
    raw.as_deref().map(parse_datetime).transpose()
}

fn to_sql_error(error: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            error.to_string(),
        )),
    )
}

fn set_private_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if !path.exists() {
            return Ok(());
        }
        let mut permissions = fs::metadata(path)
            .with_context(|| format!("stat {}", path.display()))?
            .permissions();
        permissions.set_mode(0o600);
        fs::set_permissions(path, permissions)
            .with_context(|| format!("set permissions on {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::validate_db_path;

    #[test]
    fn memory_path_is_accepted() {
        assert!(validate_db_path(":memory:").is_ok());
        assert!(validate_db_path("/tmp/todos.db").is_ok());
    }

    #[test]
    fn uri_paths_are_rejected_with_guidance() {
        for path in ["", "file:todos.db", "sqlite://todos.db", "todos.db?mode=ro"] {
            assert!(validate_db_path(path).is_err(), "expected rejection: {path:?}");
        }
    }
}
