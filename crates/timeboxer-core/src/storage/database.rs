//! SQLite-based task and session storage.
//!
//! Provides persistent storage for:
//! - Tasks and their subtasks (subtasks cascade on task deletion)
//! - Completed focus sessions (task reference nulled on task deletion)
//! - Key-value store for application state, including the identity map

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::calendar::DateRange;
use crate::error::{CoreError, PersistenceError, ValidationError};
use crate::reconcile::{IdentityMap, TaskStore};
use crate::session::{FocusMode, TaskSession};
use crate::task::{Schedule, Subtask, Task};

use super::data_dir;

const IDENTITY_MAP_KEY: &str = "identity_map";

/// SQLite database for tasks, subtasks and sessions.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/timeboxer/timeboxer.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, PersistenceError> {
        let path = data_dir()?.join("timeboxer.db");
        Self::open_at(path)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| PersistenceError::OpenFailed {
            path: PathBuf::from(path),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory().map_err(|source| PersistenceError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), PersistenceError> {
        self.conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS tasks (
                id                TEXT PRIMARY KEY,
                title             TEXT NOT NULL,
                label             TEXT,
                color             TEXT NOT NULL,
                important         INTEGER NOT NULL DEFAULT 0,
                start_at          TEXT,
                end_at            TEXT,
                completed         INTEGER NOT NULL DEFAULT 0,
                external_event_id TEXT UNIQUE,
                created_at        TEXT NOT NULL,
                updated_at        TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS subtasks (
                id         TEXT PRIMARY KEY,
                task_id    TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                title      TEXT NOT NULL,
                completed  INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id           TEXT PRIMARY KEY,
                task_id      TEXT REFERENCES tasks(id) ON DELETE SET NULL,
                mode         TEXT NOT NULL,
                focused_secs INTEGER NOT NULL,
                points       INTEGER NOT NULL,
                completed_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_subtasks_task_id ON subtasks(task_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_completed_at ON sessions(completed_at);",
        )?;
        Ok(())
    }

    /// Persist a new task and its subtasks.
    ///
    /// # Errors
    /// Fails validation for an empty title or an inverted interval.
    pub fn insert_task(&self, task: &Task) -> Result<(), CoreError> {
        task.validate().map_err(CoreError::Validation)?;
        let (start_at, end_at) = schedule_columns(&task.schedule);
        self.conn
            .execute(
                "INSERT INTO tasks (id, title, label, color, important, start_at, end_at,
                                    completed, external_event_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    task.id.to_string(),
                    task.title,
                    task.label,
                    task.color,
                    task.important,
                    start_at,
                    end_at,
                    task.completed,
                    task.external_event_id,
                    task.created_at.to_rfc3339(),
                    task.updated_at.to_rfc3339(),
                ],
            )
            .map_err(PersistenceError::from)?;
        self.replace_subtasks(task)?;
        Ok(())
    }

    /// Rewrite a persisted task and its subtasks.
    pub fn update_task(&self, task: &Task) -> Result<(), CoreError> {
        task.validate().map_err(CoreError::Validation)?;
        let (start_at, end_at) = schedule_columns(&task.schedule);
        let changed = self
            .conn
            .execute(
                "UPDATE tasks
                 SET title = ?2, label = ?3, color = ?4, important = ?5, start_at = ?6,
                     end_at = ?7, completed = ?8, external_event_id = ?9, updated_at = ?10
                 WHERE id = ?1",
                params![
                    task.id.to_string(),
                    task.title,
                    task.label,
                    task.color,
                    task.important,
                    start_at,
                    end_at,
                    task.completed,
                    task.external_event_id,
                    task.updated_at.to_rfc3339(),
                ],
            )
            .map_err(PersistenceError::from)?;
        if changed == 0 {
            return Err(PersistenceError::WriteFailed(format!("no task {}", task.id)).into());
        }
        self.replace_subtasks(task)?;
        Ok(())
    }

    fn replace_subtasks(&self, task: &Task) -> Result<(), PersistenceError> {
        self.conn.execute(
            "DELETE FROM subtasks WHERE task_id = ?1",
            params![task.id.to_string()],
        )?;
        let mut stmt = self.conn.prepare(
            "INSERT INTO subtasks (id, task_id, title, completed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for subtask in &task.subtasks {
            stmt.execute(params![
                subtask.id.to_string(),
                task.id.to_string(),
                subtask.title,
                subtask.completed,
                subtask.created_at.to_rfc3339(),
            ])?;
        }
        Ok(())
    }

    /// Fetch one task with its subtasks.
    pub fn get_task(&self, id: Uuid) -> Result<Option<Task>, PersistenceError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, title, label, color, important, start_at, end_at,
                        completed, external_event_id, created_at, updated_at
                 FROM tasks WHERE id = ?1",
                params![id.to_string()],
                raw_task_row,
            )
            .optional()?;
        match row {
            Some(raw) => Ok(Some(self.hydrate_task(raw)?)),
            None => Ok(None),
        }
    }

    /// All tasks, oldest first, subtasks included.
    pub fn list_tasks(&self) -> Result<Vec<Task>, PersistenceError> {
        self.query_tasks(
            "SELECT id, title, label, color, important, start_at, end_at,
                    completed, external_event_id, created_at, updated_at
             FROM tasks ORDER BY created_at",
        )
    }

    /// Tasks imported from the calendar, oldest first.
    pub fn imported_tasks(&self) -> Result<Vec<Task>, PersistenceError> {
        self.query_tasks(
            "SELECT id, title, label, color, important, start_at, end_at,
                    completed, external_event_id, created_at, updated_at
             FROM tasks WHERE external_event_id IS NOT NULL ORDER BY created_at",
        )
    }

    fn query_tasks(&self, sql: &str) -> Result<Vec<Task>, PersistenceError> {
        let mut stmt = self.conn.prepare(sql)?;
        let raws = stmt
            .query_map([], raw_task_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(|raw| self.hydrate_task(raw)).collect()
    }

    fn hydrate_task(&self, raw: RawTask) -> Result<Task, PersistenceError> {
        let subtasks = self.subtasks_of(&raw.id)?;
        raw.into_task(subtasks)
    }

    fn subtasks_of(&self, task_id: &str) -> Result<Vec<Subtask>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, completed, created_at
             FROM subtasks WHERE task_id = ?1 ORDER BY rowid",
        )?;
        let raws = stmt
            .query_map(params![task_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter()
            .map(|(id, title, completed, created_at)| {
                Ok(Subtask {
                    id: parse_id(&id)?,
                    title,
                    completed,
                    created_at: parse_ts(&created_at)?,
                })
            })
            .collect()
    }

    /// Delete a task. Subtasks cascade; session references are nulled.
    ///
    /// This is the reconciler path: no provenance check.
    pub fn delete_task(&self, id: Uuid) -> Result<(), PersistenceError> {
        self.conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }

    /// Delete a task on behalf of the user.
    ///
    /// Refused for imported tasks: those are removed only when their calendar
    /// event disappears.
    pub fn delete_manual(&self, id: Uuid) -> Result<(), CoreError> {
        match self.get_task(id)? {
            Some(task) if task.is_imported() => {
                Err(CoreError::Validation(ValidationError::ImportedTaskDeletion { id }))
            }
            Some(_) => {
                self.delete_task(id)?;
                Ok(())
            }
            None => Err(PersistenceError::WriteFailed(format!("no task {id}")).into()),
        }
    }

    /// Record a completed focus session.
    pub fn record_session(&self, session: &TaskSession) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT INTO sessions (id, task_id, mode, focused_secs, points, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.id.to_string(),
                session.task_id.map(|id| id.to_string()),
                mode_column(session.mode),
                session.focused_secs,
                session.points,
                session.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Sessions completed within the window, oldest first.
    pub fn sessions_between(&self, range: &DateRange) -> Result<Vec<TaskSession>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task_id, mode, focused_secs, points, completed_at
             FROM sessions
             WHERE completed_at >= ?1 AND completed_at < ?2
             ORDER BY completed_at",
        )?;
        let raws = stmt
            .query_map(
                params![range.start.to_rfc3339(), range.end.to_rfc3339()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, u32>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter()
            .map(|(id, task_id, mode, focused_secs, points, completed_at)| {
                Ok(TaskSession {
                    id: parse_id(&id)?,
                    task_id: task_id.as_deref().map(parse_id).transpose()?,
                    mode: parse_mode(&mode)?,
                    focused_secs,
                    points,
                    completed_at: parse_ts(&completed_at)?,
                })
            })
            .collect()
    }

    /// Load the persisted identity map, or a fresh one if none is stored.
    pub fn load_identity_map(&self) -> Result<IdentityMap, PersistenceError> {
        match self.kv_get(IDENTITY_MAP_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| PersistenceError::QueryFailed(e.to_string())),
            None => Ok(IdentityMap::new()),
        }
    }

    /// Persist the identity map.
    pub fn store_identity_map(&self, ids: &IdentityMap) -> Result<(), PersistenceError> {
        let raw = serde_json::to_string(ids)
            .map_err(|e| PersistenceError::WriteFailed(e.to_string()))?;
        self.kv_set(IDENTITY_MAP_KEY, &raw)
    }

    fn kv_get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Flush pending writes.
    pub fn save(&self) -> Result<(), PersistenceError> {
        self.conn
            .execute_batch("PRAGMA optimize;")
            .map_err(|e| PersistenceError::WriteFailed(e.to_string()))
    }
}

impl TaskStore for Database {
    type Error = CoreError;

    fn imported_tasks(&self) -> Result<Vec<Task>, Self::Error> {
        Database::imported_tasks(self).map_err(CoreError::Persistence)
    }

    fn create_task(&mut self, task: &Task) -> Result<(), Self::Error> {
        self.insert_task(task)
    }

    fn update_task(&mut self, task: &Task) -> Result<(), Self::Error> {
        Database::update_task(self, task)
    }

    fn delete_task(&mut self, id: Uuid) -> Result<(), Self::Error> {
        Database::delete_task(self, id).map_err(CoreError::Persistence)
    }

    fn save(&mut self) -> Result<(), Self::Error> {
        Database::save(self).map_err(CoreError::Persistence)
    }
}

struct RawTask {
    id: String,
    title: String,
    label: Option<String>,
    color: String,
    important: bool,
    start_at: Option<String>,
    end_at: Option<String>,
    completed: bool,
    external_event_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl RawTask {
    fn into_task(self, subtasks: Vec<Subtask>) -> Result<Task, PersistenceError> {
        let schedule = match (self.start_at, self.end_at) {
            (Some(start), Some(end)) => Some(Schedule::new(parse_ts(&start)?, parse_ts(&end)?)),
            (None, None) => None,
            _ => {
                return Err(PersistenceError::QueryFailed(format!(
                    "task {} has a dangling half-interval",
                    self.id
                )))
            }
        };
        Ok(Task {
            id: parse_id(&self.id)?,
            title: self.title,
            label: self.label,
            color: self.color,
            important: self.important,
            schedule,
            completed: self.completed,
            subtasks,
            external_event_id: self.external_event_id,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

fn raw_task_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTask> {
    Ok(RawTask {
        id: row.get(0)?,
        title: row.get(1)?,
        label: row.get(2)?,
        color: row.get(3)?,
        important: row.get(4)?,
        start_at: row.get(5)?,
        end_at: row.get(6)?,
        completed: row.get(7)?,
        external_event_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn schedule_columns(schedule: &Option<Schedule>) -> (Option<String>, Option<String>) {
    match schedule {
        Some(s) => (Some(s.start.to_rfc3339()), Some(s.end.to_rfc3339())),
        None => (None, None),
    }
}

fn mode_column(mode: FocusMode) -> &'static str {
    match mode {
        FocusMode::Countdown => "countdown",
        FocusMode::Stopwatch => "stopwatch",
    }
}

fn parse_mode(raw: &str) -> Result<FocusMode, PersistenceError> {
    match raw {
        "countdown" => Ok(FocusMode::Countdown),
        "stopwatch" => Ok(FocusMode::Stopwatch),
        other => Err(PersistenceError::QueryFailed(format!(
            "unknown focus mode {other:?}"
        ))),
    }
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| PersistenceError::QueryFailed(format!("bad timestamp {raw:?}: {e}")))
}

fn parse_id(raw: &str) -> Result<Uuid, PersistenceError> {
    Uuid::parse_str(raw).map_err(|e| PersistenceError::QueryFailed(format!("bad id {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ScorePolicy;
    use chrono::{Duration, TimeZone};

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn scheduled_task(title: &str) -> Task {
        let start = Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap();
        let mut task = Task::new(title);
        task.schedule = Some(Schedule::new(start, start + Duration::hours(1)));
        task
    }

    #[test]
    fn task_round_trip_with_subtasks() {
        let db = db();
        let mut task = scheduled_task("Write report");
        task.label = Some("Work".to_string());
        task.subtasks.push(Subtask::new("outline"));
        task.subtasks.push(Subtask::new("draft"));

        db.insert_task(&task).unwrap();
        let loaded = db.get_task(task.id).unwrap().unwrap();
        assert_eq!(loaded, task);
        let titles: Vec<_> = loaded.subtasks.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["outline", "draft"]);
    }

    #[test]
    fn insert_rejects_empty_title() {
        let db = db();
        let mut task = Task::new("x");
        task.title = String::new();
        assert!(matches!(
            db.insert_task(&task),
            Err(CoreError::Validation(ValidationError::EmptyTitle))
        ));
    }

    #[test]
    fn update_rewrites_fields_and_subtasks() {
        let db = db();
        let mut task = scheduled_task("Old title");
        task.subtasks.push(Subtask::new("old subtask"));
        db.insert_task(&task).unwrap();

        task.title = "New title".to_string();
        task.completed = true;
        task.subtasks = vec![Subtask::new("first"), Subtask::new("second")];
        db.update_task(&task).unwrap();

        let loaded = db.get_task(task.id).unwrap().unwrap();
        assert_eq!(loaded.title, "New title");
        assert!(loaded.completed);
        assert_eq!(loaded.subtasks.len(), 2);
    }

    #[test]
    fn update_of_missing_task_fails() {
        let db = db();
        let task = scheduled_task("ghost");
        assert!(db.update_task(&task).is_err());
    }

    #[test]
    fn delete_cascades_to_subtasks() {
        let db = db();
        let mut task = scheduled_task("parent");
        task.subtasks.push(Subtask::new("child"));
        db.insert_task(&task).unwrap();

        db.delete_task(task.id).unwrap();
        assert!(db.get_task(task.id).unwrap().is_none());
        let orphans: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM subtasks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn deleting_task_nulls_session_reference() {
        let db = db();
        let task = scheduled_task("focus target");
        db.insert_task(&task).unwrap();

        let session = TaskSession::record(
            Some(task.id),
            FocusMode::Countdown,
            25 * 60,
            Some(25 * 60),
            &ScorePolicy::default(),
            Utc.with_ymd_and_hms(2024, 6, 10, 10, 0, 0).unwrap(),
        );
        db.record_session(&session).unwrap();
        db.delete_task(task.id).unwrap();

        let range = DateRange {
            start: Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 6, 11, 0, 0, 0).unwrap(),
        };
        let sessions = db.sessions_between(&range).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].task_id, None);
        assert_eq!(sessions[0].points, session.points);
    }

    #[test]
    fn manual_delete_refuses_imported_tasks() {
        let db = db();
        let mut task = scheduled_task("Imported standup");
        task.external_event_id = Some("cal-1:550e8400-e29b-41d4-a716-446655440000".to_string());
        db.insert_task(&task).unwrap();

        let err = db.delete_manual(task.id).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::ImportedTaskDeletion { .. })
        ));
        assert!(db.get_task(task.id).unwrap().is_some());

        let manual = scheduled_task("Mine");
        db.insert_task(&manual).unwrap();
        db.delete_manual(manual.id).unwrap();
        assert!(db.get_task(manual.id).unwrap().is_none());
    }

    #[test]
    fn imported_tasks_filters_on_provenance() {
        let db = db();
        let mut imported = scheduled_task("Imported");
        imported.external_event_id = Some("cal-1:550e8400-e29b-41d4-a716-446655440000".to_string());
        db.insert_task(&imported).unwrap();
        db.insert_task(&scheduled_task("Manual")).unwrap();

        let found = db.imported_tasks().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, imported.id);
    }

    #[test]
    fn sessions_between_is_half_open() {
        let db = db();
        let policy = ScorePolicy::default();
        for hour in [9, 12, 18] {
            let session = TaskSession::record(
                None,
                FocusMode::Stopwatch,
                10 * 60,
                None,
                &policy,
                Utc.with_ymd_and_hms(2024, 6, 10, hour, 0, 0).unwrap(),
            );
            db.record_session(&session).unwrap();
        }

        let range = DateRange {
            start: Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 6, 10, 18, 0, 0).unwrap(),
        };
        let sessions = db.sessions_between(&range).unwrap();
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn identity_map_round_trips_through_kv() {
        let db = db();
        let mut ids = IdentityMap::new();
        let id = ids.resolve("garbled-external-id");
        db.store_identity_map(&ids).unwrap();

        let loaded = db.load_identity_map().unwrap();
        assert_eq!(loaded.get("garbled-external-id"), Some(id));

        // Missing key yields a fresh map.
        let fresh = Database::open_in_memory().unwrap().load_identity_map().unwrap();
        assert!(fresh.is_empty());
    }

    #[test]
    fn open_at_creates_schema_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timeboxer.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.insert_task(&scheduled_task("persisted")).unwrap();
        }
        let reopened = Database::open_at(&path).unwrap();
        assert_eq!(reopened.list_tasks().unwrap().len(), 1);
    }
}
