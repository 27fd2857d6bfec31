//! Task-result store — scored submission history and the spaced-repetition
//! candidate query.
//!
//! Results are append-mostly: a new submission for the same (user, task) in
//! a different session inserts a new row. Within one session a slot has at
//! most one result (`UNIQUE(session_id, task_id)`); the typing path rewrites
//! that row through [`KognitaService::update_result`] until the slot
//! completes.

use chrono::Utc;

use kognita_core::entities::{Task, TaskResult};
use kognita_core::enums::UpdateOutcome;
use kognita_core::responses::ExamCompletion;
use kognita_core::scoring;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_optional_datetime};
use crate::repos::catalog::row_to_task;
use crate::service::KognitaService;

/// Only results at or below this score are in the "flow zone" and eligible
/// for spaced-repetition re-practice.
const FLOW_SCORE_THRESHOLD: f64 = 0.8;

const RESULT_COLS: &str =
    "id, user_id, task_id, session_id, result_score, time_used, revisit_at, is_set_manually, created_at";

/// The scored outcome of one submission, as handed to the result store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskSubmission {
    pub task_id: i64,
    /// Normalized score; clamped to `[0, 1]` on write.
    pub score: f64,
    pub time_used: Option<f64>,
}

fn row_to_result(row: &libsql::Row) -> Result<TaskResult, DatabaseError> {
    Ok(TaskResult {
        id: row.get(0)?,
        user_id: row.get(1)?,
        task_id: row.get(2)?,
        session_id: row.get::<Option<i64>>(3)?,
        result_score: row.get(4)?,
        time_used: row.get::<Option<f64>>(5)?,
        revisit_at: parse_optional_datetime(get_opt_string(row, 6)?.as_deref())?,
        is_set_manually: row.get::<i64>(7)? != 0,
        created_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

impl KognitaService {
    /// Insert a new result row. Never overwrites prior history.
    ///
    /// The revisit date is derived from the (clamped) score via the
    /// spaced-repetition curve.
    pub(crate) async fn create_result_on(
        &self,
        conn: &libsql::Connection,
        submission: TaskSubmission,
        user_id: i64,
        session_id: i64,
    ) -> Result<TaskResult, DatabaseError> {
        let now = Utc::now();
        let score = submission.score.clamp(0.0, 1.0);
        let revisit = scoring::revisit_date(score, now);

        conn.execute(
            "INSERT INTO task_results
             (user_id, task_id, session_id, result_score, time_used, revisit_at, is_set_manually, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
            libsql::params![
                user_id,
                submission.task_id,
                session_id,
                score,
                submission.time_used,
                revisit.to_rfc3339(),
                now.to_rfc3339()
            ],
        )
        .await?;

        Ok(TaskResult {
            id: conn.last_insert_rowid(),
            user_id,
            task_id: submission.task_id,
            session_id: Some(session_id),
            result_score: score,
            time_used: submission.time_used,
            revisit_at: Some(revisit),
            is_set_manually: false,
            created_at: now,
        })
    }

    /// Public entry for recording a result outside a submission transaction
    /// (e.g., moderator backfill tooling).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the insert fails, including the unique
    /// violation when the (session, task) slot already holds a result.
    pub async fn create_result(
        &self,
        submission: TaskSubmission,
        user_id: i64,
        session_id: i64,
    ) -> Result<TaskResult, DatabaseError> {
        self.create_result_on(self.db().conn(), submission, user_id, session_id)
            .await
    }

    /// Idempotent upsert for the typing-task paths: rewrite the slot's
    /// result if one exists, insert otherwise.
    ///
    /// Returns which branch fired so the caller can decide whether to run
    /// the completion transition — only a `Created` outcome advances the
    /// session.
    pub(crate) async fn update_result_on(
        &self,
        conn: &libsql::Connection,
        submission: TaskSubmission,
        user_id: i64,
        session_id: i64,
    ) -> Result<(UpdateOutcome, TaskResult), DatabaseError> {
        let mut rows = conn
            .query(
                "SELECT id FROM task_results WHERE session_id = ?1 AND task_id = ?2",
                libsql::params![session_id, submission.task_id],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            let result = self
                .create_result_on(conn, submission, user_id, session_id)
                .await?;
            return Ok((UpdateOutcome::Created, result));
        };

        let id: i64 = row.get(0)?;
        let now = Utc::now();
        let score = submission.score.clamp(0.0, 1.0);
        let revisit = scoring::revisit_date(score, now);
        conn.execute(
            "UPDATE task_results SET result_score = ?1, time_used = ?2, revisit_at = ?3
             WHERE id = ?4",
            libsql::params![
                score,
                submission.time_used,
                revisit.to_rfc3339(),
                id
            ],
        )
        .await?;

        let mut rows = conn
            .query(
                &format!("SELECT {RESULT_COLS} FROM task_results WHERE id = ?1"),
                libsql::params![id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok((UpdateOutcome::Updated, row_to_result(&row)?))
    }

    /// See [`Self::update_result_on`].
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if either branch's write fails.
    pub async fn update_result(
        &self,
        submission: TaskSubmission,
        user_id: i64,
        session_id: i64,
    ) -> Result<(UpdateOutcome, TaskResult), DatabaseError> {
        self.update_result_on(self.db().conn(), submission, user_id, session_id)
            .await
    }

    /// The spaced-repetition candidate for this user inside this practice
    /// session's scope, or `None` when nothing is due.
    ///
    /// Candidate = the task whose *latest* result for this user sits in the
    /// flow zone (score ≤ 0.8), scoped to the session's subtopics and task
    /// kinds, excluding results recorded in this same session, soft-deleted
    /// tasks, and tasks already assigned here. Highest score first, then
    /// recency — material the learner almost knows surfaces before material
    /// never seen (which the uniform branch covers instead).
    pub(crate) async fn space_repetition_candidate_on(
        &self,
        conn: &libsql::Connection,
        user_id: i64,
        session_id: i64,
    ) -> Result<Option<Task>, DatabaseError> {
        let mut rows = conn
            .query(
                "SELECT t.id, t.subtopic_id, t.kind, t.question, t.created_at, t.deleted_at
                 FROM task_results r
                 JOIN (SELECT MAX(id) AS id FROM task_results WHERE user_id = ?1 GROUP BY task_id)
                      latest ON latest.id = r.id
                 JOIN tasks t ON t.id = r.task_id
                 JOIN session_subtopics ss
                      ON ss.subtopic_id = t.subtopic_id AND ss.session_id = ?2
                 JOIN sessions s ON s.id = ?2
                 WHERE (r.session_id IS NULL OR r.session_id != ?2)
                   AND t.deleted_at IS NULL
                   AND r.result_score <= ?3
                   AND (s.use_typing_tasks IS NULL
                        OR s.use_typing_tasks = 1
                        OR t.kind != 'typing')
                   AND (s.use_multiple_choice_tasks IS NULL
                        OR s.use_multiple_choice_tasks = 1
                        OR t.kind != 'multiple_choice')
                   AND t.id NOT IN (SELECT task_id FROM session_tasks WHERE session_id = ?2)
                 ORDER BY r.result_score DESC, r.created_at DESC
                 LIMIT 1",
                libsql::params![user_id, session_id, FLOW_SCORE_THRESHOLD],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_task(&row)?)),
            None => Ok(None),
        }
    }

    /// See [`Self::space_repetition_candidate_on`].
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn space_repetition_candidate(
        &self,
        user_id: i64,
        session_id: i64,
    ) -> Result<Option<Task>, DatabaseError> {
        self.space_repetition_candidate_on(self.db().conn(), user_id, session_id)
            .await
    }

    /// Completed-task counts per exam for this user, for listing screens.
    /// Exams without any completed tasks report zero.
    pub async fn completion_in_exams(
        &self,
        exam_ids: &[i64],
        user_id: i64,
    ) -> Result<Vec<ExamCompletion>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT s.exam_id, COUNT(st.task_id)
                 FROM sessions s
                 JOIN session_tasks st ON st.session_id = s.id AND st.is_completed = 1
                 WHERE s.user_id = ?1 AND s.kind = 'exam' AND s.exam_id IS NOT NULL
                 GROUP BY s.exam_id",
                libsql::params![user_id],
            )
            .await?;

        let mut counts = std::collections::HashMap::new();
        while let Some(row) = rows.next().await? {
            counts.insert(row.get::<i64>(0)?, row.get::<i64>(1)?);
        }

        Ok(exam_ids
            .iter()
            .map(|&exam_id| ExamCompletion {
                exam_id,
                completed_count: counts.get(&exam_id).copied().unwrap_or(0),
            })
            .collect())
    }

    /// The latest result for a (user, task) pair, across all sessions.
    pub async fn last_result(
        &self,
        task_id: i64,
        user_id: i64,
    ) -> Result<Option<TaskResult>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {RESULT_COLS} FROM task_results
                     WHERE task_id = ?1 AND user_id = ?2
                     ORDER BY created_at DESC, id DESC LIMIT 1"
                ),
                libsql::params![task_id, user_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_result(&row)?)),
            None => Ok(None),
        }
    }

    /// The latest result per task for this user, ordered by revisit date.
    pub async fn results_overview(&self, user_id: i64) -> Result<Vec<TaskResult>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {RESULT_COLS} FROM task_results r
                     JOIN (SELECT MAX(id) AS id FROM task_results WHERE user_id = ?1
                           GROUP BY task_id) latest ON latest.id = r.id
                     ORDER BY r.revisit_at"
                ),
                libsql::params![user_id],
            )
            .await?;
        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(row_to_result(&row)?);
        }
        Ok(results)
    }
}
