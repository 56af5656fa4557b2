//! Feedback persistence: keyed upsert on (message_id, user_id).

use std::sync::Arc;

use rusqlite::params;
use uuid::Uuid;

use crate::domain::{Feedback, FeedbackKind};
use crate::repository::db::{format_ts, parse_ts, Database, DbError};
use crate::repository::RepositoryError;

#[derive(Clone)]
pub struct FeedbackRepository {
    db: Arc<Database>,
}

struct FeedbackRow {
    id: String,
    message_id: String,
    user_id: String,
    feedback: String,
    created_at: String,
    updated_at: String,
}

impl FeedbackRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn find_by_message_and_user(
        &self,
        message_id: Uuid,
        user_id: &str,
    ) -> Result<Option<Feedback>, RepositoryError> {
        let db = Arc::clone(&self.db);
        let message_id_s = message_id.to_string();
        let user_id_s = user_id.to_string();

        let row = tokio::task::spawn_blocking(move || -> Result<Option<FeedbackRow>, DbError> {
            let conn = db.conn()?;
            match conn.query_row(
                "SELECT id, message_id, user_id, feedback, created_at, updated_at
                 FROM feedbacks
                 WHERE message_id = ?1 AND user_id = ?2",
                params![message_id_s, user_id_s],
                |row| {
                    Ok(FeedbackRow {
                        id: row.get(0)?,
                        message_id: row.get(1)?,
                        user_id: row.get(2)?,
                        feedback: row.get(3)?,
                        created_at: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                },
            ) {
                Ok(row) => Ok(Some(row)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(|e| RepositoryError::Fetch(format!("spawn_blocking: {e}")))?
        .map_err(|e| RepositoryError::Fetch(e.to_string()))?;

        row.map(row_to_feedback)
            .transpose()
            .map_err(RepositoryError::Fetch)
    }

    /// Insert, or on the (message_id, user_id) key update polarity and
    /// update timestamp.
    pub async fn save(&self, feedback: &Feedback) -> Result<(), RepositoryError> {
        let db = Arc::clone(&self.db);
        let row = FeedbackRow {
            id: feedback.id().to_string(),
            message_id: feedback.message_id().to_string(),
            user_id: feedback.user_id().to_string(),
            feedback: feedback.kind().as_str().to_string(),
            created_at: format_ts(feedback.created_at()),
            updated_at: format_ts(feedback.updated_at()),
        };

        tokio::task::spawn_blocking(move || -> Result<(), DbError> {
            let conn = db.conn()?;
            conn.execute(
                "INSERT INTO feedbacks (id, message_id, user_id, feedback, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(message_id, user_id) DO UPDATE SET
                     feedback = excluded.feedback,
                     updated_at = excluded.updated_at",
                params![
                    row.id,
                    row.message_id,
                    row.user_id,
                    row.feedback,
                    row.created_at,
                    row.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::Save(format!("spawn_blocking: {e}")))?
        .map_err(|e| RepositoryError::Save(e.to_string()))
    }
}

fn row_to_feedback(row: FeedbackRow) -> Result<Feedback, String> {
    let kind = FeedbackKind::parse(&row.feedback)
        .ok_or_else(|| format!("unknown feedback '{}'", row.feedback))?;
    Ok(Feedback::reconstruct(
        Uuid::parse_str(&row.id).map_err(|e| e.to_string())?,
        &row.user_id,
        Uuid::parse_str(&row.message_id).map_err(|e| e.to_string())?,
        kind,
        parse_ts(&row.created_at).map_err(|e| e.to_string())?,
        parse_ts(&row.updated_at).map_err(|e| e.to_string())?,
    ))
}
