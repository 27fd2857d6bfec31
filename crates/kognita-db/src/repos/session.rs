//! Session repository — the lifecycle mechanics shared by all three
//! variants.
//!
//! State machine: `created → active → ended`. A session becomes active when
//! its first task is assigned and ends when `ended_at` is set; there is no
//! way back out of `ended`. The owning user is fixed at creation and every
//! mutating operation is gated on it.

use chrono::Utc;

use kognita_core::entities::{Session, SessionVariant};
use kognita_core::enums::{SessionKind, SessionState};
use kognita_core::responses::{SessionResultRow, TaskContent};

use crate::error::DatabaseError;
use crate::helpers::{get_flag, get_opt_string, parse_datetime, parse_optional_datetime};
use crate::service::KognitaService;

const SESSION_COLS: &str = "id, user_id, kind, number_of_task_goal, created_at, ended_at, \
     use_typing_tasks, use_multiple_choice_tasks, exam_id, note_session_id";

fn row_to_session(row: &libsql::Row) -> Result<Session, DatabaseError> {
    let id: i64 = row.get(0)?;
    let kind = match row.get::<String>(2)?.as_str() {
        "practice" => SessionVariant::Practice {
            use_typing_tasks: get_flag(row, 6)?,
            use_multiple_choice_tasks: get_flag(row, 7)?,
        },
        "exam" => SessionVariant::Exam {
            exam_id: row.get::<Option<i64>>(8)?.ok_or_else(|| {
                DatabaseError::InvalidState(format!("exam session {id} has no exam_id"))
            })?,
        },
        "recap" => SessionVariant::Recap {
            note_session_id: row.get::<Option<i64>>(9)?.ok_or_else(|| {
                DatabaseError::InvalidState(format!("recap session {id} has no note_session_id"))
            })?,
        },
        other => {
            return Err(DatabaseError::Query(format!(
                "Unknown session kind '{other}'"
            )));
        }
    };
    Ok(Session {
        id,
        user_id: row.get(1)?,
        number_of_task_goal: row.get(3)?,
        created_at: parse_datetime(&row.get::<String>(4)?)?,
        ended_at: parse_optional_datetime(get_opt_string(row, 5)?.as_deref())?,
        kind,
    })
}

impl KognitaService {
    /// Insert the base session row for any variant. Caller supplies the
    /// surrounding transaction.
    pub(crate) async fn insert_session_on(
        &self,
        conn: &libsql::Connection,
        user_id: i64,
        number_of_task_goal: i64,
        variant: &SessionVariant,
    ) -> Result<Session, DatabaseError> {
        let now = Utc::now();
        let (use_typing, use_choice, exam_id, note_session_id) = match *variant {
            SessionVariant::Practice {
                use_typing_tasks,
                use_multiple_choice_tasks,
            } => (
                Some(i64::from(use_typing_tasks)),
                Some(i64::from(use_multiple_choice_tasks)),
                None,
                None,
            ),
            SessionVariant::Exam { exam_id } => (None, None, Some(exam_id), None),
            SessionVariant::Recap { note_session_id } => (None, None, None, Some(note_session_id)),
        };

        conn.execute(
            "INSERT INTO sessions
             (user_id, kind, number_of_task_goal, created_at,
              use_typing_tasks, use_multiple_choice_tasks, exam_id, note_session_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            libsql::params![
                user_id,
                variant.kind().as_str(),
                number_of_task_goal,
                now.to_rfc3339(),
                use_typing,
                use_choice,
                exam_id,
                note_session_id
            ],
        )
        .await?;

        Ok(Session {
            id: conn.last_insert_rowid(),
            user_id,
            number_of_task_goal,
            created_at: now,
            ended_at: None,
            kind: *variant,
        })
    }

    /// Fetch a session by id. Soft-deleted sessions are invisible.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown or deleted id.
    pub async fn session(&self, session_id: i64) -> Result<Session, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SESSION_COLS} FROM sessions
                     WHERE id = ?1 AND deleted_at IS NULL"
                ),
                libsql::params![session_id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or(DatabaseError::not_found("session", session_id))?;
        row_to_session(&row)
    }

    /// Ownership guard: does `session_id` exist and belong to `user_id`?
    ///
    /// A nonexistent session answers `false`, not an error.
    pub async fn session_with(&self, session_id: i64, user_id: i64) -> Result<bool, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT user_id FROM sessions WHERE id = ?1 AND deleted_at IS NULL",
                libsql::params![session_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? == user_id),
            None => Ok(false),
        }
    }

    /// Number of tasks ever assigned to the session.
    pub(crate) async fn assigned_count_on(
        &self,
        conn: &libsql::Connection,
        session_id: i64,
        kind: SessionKind,
    ) -> Result<i64, DatabaseError> {
        let table = assignment_table(kind);
        let mut rows = conn
            .query(
                &format!("SELECT COUNT(*) FROM {table} WHERE session_id = ?1"),
                libsql::params![session_id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get(0)?)
    }

    /// Number of completed tasks in the session.
    async fn completed_count(&self, session_id: i64, kind: SessionKind) -> Result<i64, DatabaseError> {
        let sql = match kind {
            SessionKind::Practice | SessionKind::Exam => {
                "SELECT COUNT(*) FROM session_tasks WHERE session_id = ?1 AND is_completed = 1"
            }
            SessionKind::Recap => {
                "SELECT COUNT(*) FROM recap_tasks WHERE session_id = ?1 AND completed_at IS NOT NULL"
            }
        };
        let mut rows = self
            .db()
            .conn()
            .query(sql, libsql::params![session_id])
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get(0)?)
    }

    /// The task at the highest assigned index — the one the learner is
    /// currently working on.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` if the session has never had a
    /// task assigned: an active session always has at least one, so this is
    /// an invariant violation, not a caller mistake.
    pub async fn current_active_task(&self, session_id: i64) -> Result<TaskContent, DatabaseError> {
        let session = self.session(session_id).await?;
        let table = assignment_table(session.kind.kind());
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT task_id FROM {table} WHERE session_id = ?1
                     ORDER BY idx DESC LIMIT 1"
                ),
                libsql::params![session_id],
            )
            .await?;
        let row = rows.next().await?.ok_or_else(|| {
            DatabaseError::InvalidState(format!("session {session_id} has no assigned task"))
        })?;
        let task_id: i64 = row.get(0)?;
        self.task_content(task_id).await
    }

    /// The task assigned at a specific index (1-based for practice/exam,
    /// 0-based for recap).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no task sits at that index.
    pub async fn task_at(&self, session_id: i64, index: i64) -> Result<TaskContent, DatabaseError> {
        let session = self.session(session_id).await?;
        let table = assignment_table(session.kind.kind());
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT task_id FROM {table} WHERE session_id = ?1 AND idx = ?2"),
                libsql::params![session_id, index],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or(DatabaseError::not_found("assigned task at index", index))?;
        let task_id: i64 = row.get(0)?;
        self.task_content(task_id).await
    }

    /// Percent of the session goal completed, rounded to the nearest whole
    /// number. Deliberately unclamped: completing 6 of a 5-task goal reports
    /// 120.
    pub async fn goal_progress(&self, session_id: i64) -> Result<i64, DatabaseError> {
        let session = self.session(session_id).await?;
        if session.number_of_task_goal <= 0 {
            return Ok(0);
        }
        let completed = self
            .completed_count(session_id, session.kind.kind())
            .await?;
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let percent =
            ((completed * 100) as f64 / session.number_of_task_goal as f64).round() as i64;
        Ok(percent)
    }

    /// Raise the session's task goal by the configured step.
    ///
    /// # Errors
    ///
    /// `DatabaseError::NotFound` for an unknown session,
    /// `DatabaseError::Forbidden` when `user_id` is not the owner.
    pub async fn extend_session(&self, session_id: i64, user_id: i64) -> Result<(), DatabaseError> {
        let session = self.session(session_id).await?;
        if session.user_id != user_id {
            return Err(DatabaseError::Forbidden);
        }
        self.db()
            .conn()
            .execute(
                "UPDATE sessions SET number_of_task_goal = number_of_task_goal + ?1 WHERE id = ?2",
                libsql::params![self.config().extend_step, session_id],
            )
            .await?;
        tracing::debug!(session_id, step = self.config().extend_step, "session goal extended");
        Ok(())
    }

    /// End a session. Idempotent: ending an already-ended session returns it
    /// unchanged, with its original end timestamp.
    ///
    /// # Errors
    ///
    /// `DatabaseError::NotFound` for an unknown session,
    /// `DatabaseError::Forbidden` when `user_id` is not the owner.
    pub async fn end_session(&self, session_id: i64, user_id: i64) -> Result<Session, DatabaseError> {
        let session = self.session(session_id).await?;
        if session.user_id != user_id {
            return Err(DatabaseError::Forbidden);
        }
        if session.ended_at.is_some() {
            return Ok(session);
        }
        let now = Utc::now();
        self.db()
            .conn()
            .execute(
                "UPDATE sessions SET ended_at = ?1 WHERE id = ?2 AND ended_at IS NULL",
                libsql::params![now.to_rfc3339(), session_id],
            )
            .await?;
        tracing::debug!(session_id, "session ended");
        Ok(Session {
            ended_at: Some(now),
            ..session
        })
    }

    /// Derive the lifecycle state from storage.
    pub async fn session_state(&self, session_id: i64) -> Result<SessionState, DatabaseError> {
        let session = self.session(session_id).await?;
        let assigned = self
            .assigned_count_on(self.db().conn(), session_id, session.kind.kind())
            .await?;
        Ok(session.state(assigned))
    }

    /// Ordered result rows for the post-session review screen.
    ///
    /// # Errors
    ///
    /// `DatabaseError::Forbidden` when `user_id` is not the owner.
    pub async fn results_for_session(
        &self,
        session_id: i64,
        user_id: i64,
    ) -> Result<Vec<SessionResultRow>, DatabaseError> {
        let session = self.session(session_id).await?;
        if session.user_id != user_id {
            return Err(DatabaseError::Forbidden);
        }
        let table = assignment_table(session.kind.kind());
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT tp.name, a.idx, t.question, r.result_score, r.time_used,
                            r.revisit_at, r.created_at
                     FROM {table} a
                     JOIN tasks t ON t.id = a.task_id
                     JOIN subtopics sub ON sub.id = t.subtopic_id
                     JOIN topics tp ON tp.id = sub.topic_id
                     JOIN task_results r ON r.task_id = a.task_id AND r.session_id = a.session_id
                     WHERE a.session_id = ?1
                     ORDER BY a.idx"
                ),
                libsql::params![session_id],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(SessionResultRow {
                topic_name: row.get(0)?,
                task_index: row.get(1)?,
                question: row.get(2)?,
                score: row.get(3)?,
                time_used: row.get::<Option<f64>>(4)?,
                revisit_at: parse_optional_datetime(get_opt_string(&row, 5)?.as_deref())?,
                answered_at: parse_datetime(&row.get::<String>(6)?)?,
            });
        }
        Ok(results)
    }

    /// Close dangling practice sessions: sessions that produced results get
    /// ended at their last result's timestamp, sessions that never did are
    /// soft-deleted.
    pub async fn clean_sessions(&self) -> Result<(), DatabaseError> {
        let conn = self.db().conn();
        let mut rows = conn
            .query(
                "SELECT id FROM sessions
                 WHERE kind = 'practice' AND ended_at IS NULL AND deleted_at IS NULL",
                (),
            )
            .await?;
        let mut dangling = Vec::new();
        while let Some(row) = rows.next().await? {
            dangling.push(row.get::<i64>(0)?);
        }

        for session_id in dangling {
            let mut rows = conn
                .query(
                    "SELECT created_at FROM task_results WHERE session_id = ?1
                     ORDER BY created_at DESC, id DESC LIMIT 1",
                    libsql::params![session_id],
                )
                .await?;
            match rows.next().await? {
                Some(row) => {
                    let last: String = row.get(0)?;
                    conn.execute(
                        "UPDATE sessions SET ended_at = ?1 WHERE id = ?2",
                        libsql::params![last, session_id],
                    )
                    .await?;
                }
                None => {
                    tracing::warn!(session_id, "soft-deleting practice session with no results");
                    conn.execute(
                        "UPDATE sessions SET deleted_at = ?1 WHERE id = ?2",
                        libsql::params![Utc::now().to_rfc3339(), session_id],
                    )
                    .await?;
                }
            }
        }
        Ok(())
    }

    /// The pivot's task id at `index`, requiring the slot to be open.
    /// Used by the multiple-choice locate step.
    pub(crate) async fn uncompleted_pivot_at_on(
        &self,
        conn: &libsql::Connection,
        session_id: i64,
        index: i64,
    ) -> Result<i64, DatabaseError> {
        let mut rows = conn
            .query(
                "SELECT task_id FROM session_tasks
                 WHERE session_id = ?1 AND idx = ?2 AND is_completed = 0",
                libsql::params![session_id, index],
            )
            .await?;
        let row = rows.next().await?.ok_or_else(|| {
            DatabaseError::BadRequest(format!(
                "no uncompleted task at index {index} in session {session_id}"
            ))
        })?;
        Ok(row.get(0)?)
    }

    /// The pivot's task id at `index`, completed or not. Used by the typing
    /// locate step, where re-answering an open slot is legal.
    pub(crate) async fn pivot_at_on(
        &self,
        conn: &libsql::Connection,
        session_id: i64,
        index: i64,
    ) -> Result<i64, DatabaseError> {
        let mut rows = conn
            .query(
                "SELECT task_id FROM session_tasks WHERE session_id = ?1 AND idx = ?2",
                libsql::params![session_id, index],
            )
            .await?;
        let row = rows.next().await?.ok_or_else(|| {
            DatabaseError::BadRequest(format!(
                "no task at index {index} in session {session_id}"
            ))
        })?;
        Ok(row.get(0)?)
    }

    /// Atomically claim the pivot at `index` as completed.
    ///
    /// The conditional write is the concurrency control for racing
    /// submissions to the same slot: exactly one claims it, the other sees
    /// zero affected rows and fails as a replay.
    pub(crate) async fn complete_pivot_on(
        &self,
        conn: &libsql::Connection,
        session_id: i64,
        index: i64,
    ) -> Result<(), DatabaseError> {
        let affected = conn
            .execute(
                "UPDATE session_tasks SET is_completed = 1
                 WHERE session_id = ?1 AND idx = ?2 AND is_completed = 0",
                libsql::params![session_id, index],
            )
            .await?;
        if affected == 0 {
            return Err(DatabaseError::BadRequest(format!(
                "task at index {index} in session {session_id} is already completed"
            )));
        }
        Ok(())
    }
}

/// Which table holds a variant's assignment rows.
const fn assignment_table(kind: SessionKind) -> &'static str {
    match kind {
        SessionKind::Practice | SessionKind::Exam => "session_tasks",
        SessionKind::Recap => "recap_tasks",
    }
}
