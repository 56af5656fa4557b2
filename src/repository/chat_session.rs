//! Chat-session persistence: one-transaction upsert save, joined reconstruction.

use std::sync::Arc;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::domain::{AgentKind, ChatSession, Message, Role, Task, TaskLog, TaskPlan, TaskStatus};
use crate::repository::db::{format_ts, parse_ts, Database, DbError};
use crate::repository::RepositoryError;

/// Persists sessions with their messages, plans, and tasks.
#[derive(Clone)]
pub struct ChatSessionRepository {
    db: Arc<Database>,
}

// ---------------------------------------------------------------------------
// Flat rows (domain ↔ SQL bridge; everything Send for spawn_blocking)
// ---------------------------------------------------------------------------

struct SessionRow {
    id: String,
    thread_id: Option<String>,
    user_id: String,
    channel_id: String,
    created_at: String,
    updated_at: String,
}

struct MessageRow {
    id: String,
    role: String,
    content: String,
    created_at: String,
}

struct PlanRow {
    id: String,
    message_id: String,
    tasks: Vec<TaskRow>,
}

struct TaskRow {
    id: String,
    description: String,
    agent_name: String,
    status: String,
    result: Option<String>,
    task_log_json: String,
    created_at: String,
    completed_at: Option<String>,
}

impl ChatSessionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Upsert the whole session in one transaction: session row (update
    /// timestamp on conflict), non-SYSTEM messages (update on id), plans
    /// (insert-or-nothing), tasks (update status/result/log/completed_at).
    pub async fn save(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        let session_row = SessionRow {
            id: session.id().to_string(),
            thread_id: session.thread_id().map(str::to_string),
            user_id: session.user_id().to_string(),
            channel_id: session.channel_id().to_string(),
            created_at: format_ts(session.created_at()),
            updated_at: format_ts(chrono::Utc::now()),
        };

        let message_rows: Vec<MessageRow> = session
            .messages()
            .iter()
            .filter(|m| m.role() != Role::System)
            .map(|m| MessageRow {
                id: m.id().to_string(),
                role: m.role().as_str().to_string(),
                content: m.content().to_string(),
                created_at: format_ts(m.created_at()),
            })
            .collect();

        let plan_rows: Vec<PlanRow> = session
            .task_plans()
            .iter()
            .map(|plan| PlanRow {
                id: plan.id().to_string(),
                message_id: plan.message_id().to_string(),
                tasks: plan
                    .tasks()
                    .iter()
                    .map(|task| TaskRow {
                        id: task.id().to_string(),
                        description: task.description().to_string(),
                        agent_name: task.agent().as_str().to_string(),
                        status: task.status().as_str().to_string(),
                        result: task.result().map(str::to_string),
                        task_log_json: task.log().to_json().to_string(),
                        created_at: format_ts(task.created_at()),
                        completed_at: task.completed_at().map(format_ts),
                    })
                    .collect(),
            })
            .collect();

        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || save_rows(&db, &session_row, &message_rows, &plan_rows))
            .await
            .map_err(|e| RepositoryError::Save(format!("spawn_blocking: {e}")))?
            .map_err(|e| RepositoryError::Save(e.to_string()))
    }

    /// Load a session with messages ordered by creation time and plans with
    /// their tasks rehydrated from `task_log_json`. `None` for an unknown id.
    pub async fn find_by_id(&self, session_id: &str) -> Result<Option<ChatSession>, RepositoryError> {
        let db = Arc::clone(&self.db);
        let id = session_id.to_string();
        let rows = tokio::task::spawn_blocking(move || load_rows(&db, &id))
            .await
            .map_err(|e| RepositoryError::Fetch(format!("spawn_blocking: {e}")))?
            .map_err(|e| RepositoryError::Fetch(e.to_string()))?;

        let Some((session_row, message_rows, plan_rows)) = rows else {
            return Ok(None);
        };

        rows_to_session(session_row, message_rows, plan_rows)
            .map(Some)
            .map_err(RepositoryError::Fetch)
    }
}

// ---------------------------------------------------------------------------
// Blocking SQL
// ---------------------------------------------------------------------------

fn save_rows(
    db: &Database,
    session: &SessionRow,
    messages: &[MessageRow],
    plans: &[PlanRow],
) -> Result<(), DbError> {
    let conn = db.conn()?;
    conn.execute_batch("BEGIN;")?;

    let result = save_rows_inner(&conn, session, messages, plans);
    match result {
        Ok(()) => {
            conn.execute_batch("COMMIT;")?;
            Ok(())
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK;");
            Err(e.into())
        }
    }
}

fn save_rows_inner(
    conn: &Connection,
    session: &SessionRow,
    messages: &[MessageRow],
    plans: &[PlanRow],
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO chat_sessions (id, thread_id, user_id, channel_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET updated_at = excluded.updated_at",
        params![
            session.id,
            session.thread_id,
            session.user_id,
            session.channel_id,
            session.created_at,
            session.updated_at,
        ],
    )?;

    for msg in messages {
        conn.execute(
            "INSERT INTO messages (id, chat_session_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 role = excluded.role,
                 content = excluded.content",
            params![msg.id, session.id, msg.role, msg.content, msg.created_at],
        )?;
    }

    let plan_created_at = format_ts(chrono::Utc::now());
    for plan in plans {
        conn.execute(
            "INSERT INTO task_plans (id, chat_session_id, message_id, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO NOTHING",
            params![plan.id, session.id, plan.message_id, plan_created_at],
        )?;

        for task in &plan.tasks {
            conn.execute(
                "INSERT INTO tasks (
                     id, task_plan_id, description, agent_name,
                     status, result, task_log_json, created_at, completed_at
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                     status = excluded.status,
                     result = excluded.result,
                     task_log_json = excluded.task_log_json,
                     completed_at = excluded.completed_at",
                params![
                    task.id,
                    plan.id,
                    task.description,
                    task.agent_name,
                    task.status,
                    task.result,
                    task.task_log_json,
                    task.created_at,
                    task.completed_at,
                ],
            )?;
        }
    }

    Ok(())
}

type LoadedRows = (SessionRow, Vec<MessageRow>, Vec<PlanRow>);

fn load_rows(db: &Database, session_id: &str) -> Result<Option<LoadedRows>, DbError> {
    let conn = db.conn()?;

    let session_row = match conn.query_row(
        "SELECT id, thread_id, user_id, channel_id, created_at, updated_at
         FROM chat_sessions WHERE id = ?1",
        params![session_id],
        |row| {
            Ok(SessionRow {
                id: row.get(0)?,
                thread_id: row.get(1)?,
                user_id: row.get(2)?,
                channel_id: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            })
        },
    ) {
        Ok(row) => row,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut stmt = conn.prepare(
        "SELECT id, role, content, created_at
         FROM messages
         WHERE chat_session_id = ?1
         ORDER BY created_at ASC, rowid ASC",
    )?;
    let message_rows: Vec<MessageRow> = stmt
        .query_map(params![session_id], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                role: row.get(1)?,
                content: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<Result<_, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT id, message_id
         FROM task_plans
         WHERE chat_session_id = ?1
         ORDER BY created_at ASC, rowid ASC",
    )?;
    let plan_heads: Vec<(String, String)> = stmt
        .query_map(params![session_id], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<Result<_, _>>()?;

    let mut plan_rows = Vec::with_capacity(plan_heads.len());
    for (plan_id, message_id) in plan_heads {
        let mut stmt = conn.prepare(
            "SELECT id, description, agent_name, status, result, task_log_json,
                    created_at, completed_at
             FROM tasks
             WHERE task_plan_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let tasks: Vec<TaskRow> = stmt
            .query_map(params![plan_id], |row| {
                Ok(TaskRow {
                    id: row.get(0)?,
                    description: row.get(1)?,
                    agent_name: row.get(2)?,
                    status: row.get(3)?,
                    result: row.get(4)?,
                    task_log_json: row.get(5)?,
                    created_at: row.get(6)?,
                    completed_at: row.get(7)?,
                })
            })?
            .collect::<Result<_, _>>()?;

        plan_rows.push(PlanRow {
            id: plan_id,
            message_id,
            tasks,
        });
    }

    Ok(Some((session_row, message_rows, plan_rows)))
}

// ---------------------------------------------------------------------------
// Rows → domain
// ---------------------------------------------------------------------------

fn rows_to_session(
    session_row: SessionRow,
    message_rows: Vec<MessageRow>,
    plan_rows: Vec<PlanRow>,
) -> Result<ChatSession, String> {
    let mut messages = Vec::with_capacity(message_rows.len());
    for row in message_rows {
        // Only user/assistant turns are part of the history.
        let role = match Role::parse(&row.role) {
            Some(Role::User) => Role::User,
            Some(Role::Assistant) => Role::Assistant,
            _ => continue,
        };
        let message = Message::reconstruct(
            parse_uuid(&row.id)?,
            role,
            &row.content,
            parse_ts(&row.created_at).map_err(|e| e.to_string())?,
        )
        .map_err(|e| e.to_string())?;
        messages.push(message);
    }

    let mut task_plans = Vec::with_capacity(plan_rows.len());
    for plan_row in plan_rows {
        let mut tasks = Vec::with_capacity(plan_row.tasks.len());
        for row in plan_row.tasks {
            let agent = AgentKind::parse(&row.agent_name).map_err(|e| e.to_string())?;
            let status = TaskStatus::parse(&row.status)
                .ok_or_else(|| format!("unknown task status '{}'", row.status))?;
            let log_value: serde_json::Value = serde_json::from_str(&row.task_log_json)
                .map_err(|e| format!("task_log_json: {e}"))?;
            let log = TaskLog::from_json(agent, &log_value)
                .map_err(|e| format!("task_log_json: {e}"))?;

            let task = Task::reconstruct(
                parse_uuid(&row.id)?,
                &row.description,
                agent,
                status,
                row.result,
                log,
                parse_ts(&row.created_at).map_err(|e| e.to_string())?,
                row.completed_at
                    .as_deref()
                    .map(parse_ts)
                    .transpose()
                    .map_err(|e| e.to_string())?,
            )
            .map_err(|e| e.to_string())?;
            tasks.push(task);
        }

        let plan = TaskPlan::reconstruct(
            parse_uuid(&plan_row.id)?,
            parse_uuid(&plan_row.message_id)?,
            tasks,
        )
        .map_err(|e| e.to_string())?;
        task_plans.push(plan);
    }

    Ok(ChatSession::reconstruct(
        &session_row.id,
        session_row.thread_id.as_deref(),
        &session_row.user_id,
        &session_row.channel_id,
        messages,
        task_plans,
        parse_ts(&session_row.created_at).map_err(|e| e.to_string())?,
        parse_ts(&session_row.updated_at).map_err(|e| e.to_string())?,
    ))
}

fn parse_uuid(s: &str) -> Result<Uuid, String> {
    Uuid::parse_str(s).map_err(|e| format!("uuid '{s}': {e}"))
}
