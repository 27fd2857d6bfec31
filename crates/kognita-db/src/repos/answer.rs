//! Answer repository — raw submitted content, kept apart from scored
//! results.
//!
//! Each submission leaves one answer row per selected choice (multiple
//! choice) or one free-text row (typing), linked to its session through
//! `session_answers` so answer content and scores stay independently
//! queryable.

use chrono::Utc;

use kognita_core::entities::TaskAnswer;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime};
use crate::service::KognitaService;

impl KognitaService {
    /// Record a multiple-choice selection.
    pub(crate) async fn create_choice_answer_on(
        &self,
        conn: &libsql::Connection,
        choice_id: i64,
    ) -> Result<i64, DatabaseError> {
        conn.execute(
            "INSERT INTO task_answers (choice_id, created_at) VALUES (?1, ?2)",
            libsql::params![choice_id, Utc::now().to_rfc3339()],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    /// Record a free-text answer. The text is assumed pre-sanitized.
    pub(crate) async fn create_text_answer_on(
        &self,
        conn: &libsql::Connection,
        answer: &str,
    ) -> Result<i64, DatabaseError> {
        conn.execute(
            "INSERT INTO task_answers (answer, created_at) VALUES (?1, ?2)",
            libsql::params![answer, Utc::now().to_rfc3339()],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    /// Attach an answer to its session.
    pub(crate) async fn link_session_answer_on(
        &self,
        conn: &libsql::Connection,
        session_id: i64,
        task_answer_id: i64,
    ) -> Result<(), DatabaseError> {
        conn.execute(
            "INSERT INTO session_answers (session_id, task_answer_id) VALUES (?1, ?2)",
            libsql::params![session_id, task_answer_id],
        )
        .await?;
        Ok(())
    }

    /// All answers recorded in a session, in submission order.
    pub async fn session_answers(&self, session_id: i64) -> Result<Vec<TaskAnswer>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT a.id, a.choice_id, a.answer, a.created_at
                 FROM task_answers a
                 JOIN session_answers sa ON sa.task_answer_id = a.id
                 WHERE sa.session_id = ?1
                 ORDER BY a.id",
                libsql::params![session_id],
            )
            .await?;
        let mut answers = Vec::new();
        while let Some(row) = rows.next().await? {
            answers.push(TaskAnswer {
                id: row.get(0)?,
                choice_id: row.get::<Option<i64>>(1)?,
                answer: get_opt_string(&row, 2)?,
                created_at: parse_datetime(&row.get::<String>(3)?)?,
            });
        }
        Ok(answers)
    }
}
