//! SQLite database: schema init and shared connection.
//!
//! Tables:
//! - `chat_sessions` — one row per conversation
//! - `messages`      — user/assistant turns (SYSTEM messages are never persisted)
//! - `task_plans`    — one row per plan, tied to the prompting user message
//! - `tasks`         — per-plan tasks with the kind-shaped `task_log_json` document
//! - `feedbacks`     — good/bad signals, unique per (message_id, user_id)

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct DbError(pub String);

impl std::fmt::Display for DbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "db: {}", self.0)
    }
}

impl std::error::Error for DbError {}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        DbError(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

/// Persistent SQLite store.
///
/// Uses a single `Mutex<Connection>` — safe to share across async tasks via
/// `Arc<Database>` since all operations take the lock synchronously inside
/// `spawn_blocking`. (rusqlite `Connection` is `Send` but not `Sync`.)
pub struct Database {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Open (or create) the database file, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DbError(format!("create_dir_all: {e}")))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| DbError(format!("open {}: {e}", path.display())))?;

        // WAL + NORMAL sync: durable with fast writes; foreign keys enforced.
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;

        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), DbError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chat_sessions (
                id         TEXT PRIMARY KEY,
                thread_id  TEXT,
                user_id    TEXT NOT NULL,
                channel_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS messages (
                id              TEXT PRIMARY KEY,
                chat_session_id TEXT NOT NULL REFERENCES chat_sessions(id),
                role            TEXT NOT NULL,
                content         TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_messages_session
                ON messages(chat_session_id, created_at);

            CREATE TABLE IF NOT EXISTS task_plans (
                id              TEXT PRIMARY KEY,
                chat_session_id TEXT NOT NULL REFERENCES chat_sessions(id),
                message_id      TEXT NOT NULL REFERENCES messages(id),
                created_at      TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_task_plans_session
                ON task_plans(chat_session_id, created_at);

            CREATE TABLE IF NOT EXISTS tasks (
                id            TEXT PRIMARY KEY,
                task_plan_id  TEXT NOT NULL REFERENCES task_plans(id),
                description   TEXT NOT NULL,
                agent_name    TEXT NOT NULL,
                status        TEXT NOT NULL,
                result        TEXT,
                task_log_json TEXT NOT NULL,
                created_at    TEXT NOT NULL,
                completed_at  TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_plan
                ON tasks(task_plan_id, created_at);

            CREATE TABLE IF NOT EXISTS feedbacks (
                id         TEXT PRIMARY KEY,
                message_id TEXT NOT NULL REFERENCES messages(id),
                user_id    TEXT NOT NULL,
                feedback   TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(message_id, user_id)
            );",
        )?;
        Ok(())
    }

    /// Lock the connection for one repository operation. Called from inside
    /// `spawn_blocking` only.
    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn
            .lock()
            .map_err(|e| DbError(format!("lock: {e}")))
    }

    /// Health check: execute a trivial query.
    pub fn health_check(&self) -> bool {
        self.conn
            .lock()
            .map(|c| c.execute_batch("SELECT 1").is_ok())
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Timestamp column format
// ---------------------------------------------------------------------------

/// RFC 3339 with fixed nanosecond width, so lexicographic order is time order.
pub(crate) fn format_ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_ts(s: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DbError(format!("timestamp '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;
    use tempfile::TempDir;

    fn temp_db() -> (TempDir, Database) {
        let tmp = TempDir::new().unwrap();
        let db = Database::open(&tmp.path().join("concierge.db")).unwrap();
        (tmp, db)
    }

    #[test]
    fn open_creates_db_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/concierge.db");
        Database::open(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn health_check_passes() {
        let (_tmp, db) = temp_db();
        assert!(db.health_check());
    }

    #[test]
    fn open_idempotent_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("concierge.db");
        {
            let db = Database::open(&path).unwrap();
            assert!(db.health_check());
        }
        // Reopen — schema init must be safe with IF NOT EXISTS
        let db2 = Database::open(&path).unwrap();
        assert!(db2.health_check());
    }

    #[test]
    fn schema_has_all_tables() {
        let (_tmp, db) = temp_db();
        let conn = db.conn().unwrap();
        for table in &[
            "chat_sessions",
            "messages",
            "task_plans",
            "tasks",
            "feedbacks",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    params![table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "table '{}' should exist", table);
        }
    }

    #[test]
    fn feedback_unique_key_enforced() {
        let (_tmp, db) = temp_db();
        let conn = db.conn().unwrap();
        conn.execute(
            "INSERT INTO chat_sessions (id, user_id, channel_id, created_at, updated_at)
             VALUES ('s', 'u', 'c', 't', 't')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO messages (id, chat_session_id, role, content, created_at)
             VALUES ('m', 's', 'assistant', 'x', 't')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO feedbacks (id, message_id, user_id, feedback, created_at, updated_at)
             VALUES ('f1', 'm', 'u', 'good', 't', 't')",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO feedbacks (id, message_id, user_id, feedback, created_at, updated_at)
             VALUES ('f2', 'm', 'u', 'bad', 't', 't')",
            [],
        );
        assert!(dup.is_err(), "duplicate (message_id, user_id) should fail");
    }

    #[test]
    fn timestamp_format_roundtrips_and_orders() {
        let now = Utc::now();
        let later = now + chrono::Duration::nanoseconds(1500);
        let a = format_ts(now);
        let b = format_ts(later);
        assert!(a < b, "lexicographic order must match time order");
        assert_eq!(parse_ts(&a).unwrap(), now);
        assert_eq!(parse_ts(&b).unwrap(), later);
    }

    #[test]
    fn parse_ts_rejects_garbage() {
        assert!(parse_ts("not a time").is_err());
    }
}
