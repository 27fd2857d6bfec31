//! Practice-session repository: creation, the weighted assignment lottery,
//! and the submission pipeline for both task kinds.
//!
//! Assignment is lazy — one task ahead of the learner. After every
//! completed task the lottery runs again: with probability
//! `1 - spaced_repetition_bias` it picks uniformly from the unassigned
//! eligible pool, otherwise it asks the result store for a due
//! spaced-repetition candidate and falls back to the uniform pool when
//! nothing is due. An empty pool is not an error; the session just stops
//! growing.

use rand::Rng;
use rand::seq::SliceRandom;

use kognita_core::entities::{Session, SessionVariant};
use kognita_core::enums::{AssignmentOutcome, SessionKind, TaskKind, UpdateOutcome};
use kognita_core::evaluate::evaluate_choices;
use kognita_core::responses::SubmissionFeedback;
use kognita_core::scoring;
use kognita_core::submit::{PracticeSessionInput, SubmitChoices, SubmitTyping};

use crate::error::DatabaseError;
use crate::repos::task_result::TaskSubmission;
use crate::service::KognitaService;

impl KognitaService {
    /// Start a practice session over a set of subtopics.
    ///
    /// Validates the input, creates the session row and its subtopic links,
    /// and assigns the first task, all in one transaction. A pool with
    /// nothing assignable fails the creation outright — a session that can
    /// never hold a task is a caller mistake, not an exhausted one.
    ///
    /// # Errors
    ///
    /// `DatabaseError::BadRequest` for an empty subtopic set, a
    /// non-positive goal, no enabled task kind, or an empty task pool;
    /// `DatabaseError::NotFound` for an unknown subtopic id.
    pub async fn create_practice_session(
        &self,
        input: &PracticeSessionInput,
        user_id: i64,
    ) -> Result<Session, DatabaseError> {
        if input.subtopic_ids.is_empty() {
            return Err(DatabaseError::BadRequest(
                "practice session needs at least one subtopic".to_string(),
            ));
        }
        if input.number_of_task_goal <= 0 {
            return Err(DatabaseError::BadRequest(
                "number of task goal must be positive".to_string(),
            ));
        }
        if !input.use_typing_tasks && !input.use_multiple_choice_tasks {
            return Err(DatabaseError::BadRequest(
                "at least one task kind must be enabled".to_string(),
            ));
        }
        for &subtopic_id in &input.subtopic_ids {
            self.require_subtopic(subtopic_id).await?;
        }

        let tx = self.db().conn().transaction().await?;
        let session = self
            .insert_session_on(
                &tx,
                user_id,
                input.number_of_task_goal,
                &SessionVariant::Practice {
                    use_typing_tasks: input.use_typing_tasks,
                    use_multiple_choice_tasks: input.use_multiple_choice_tasks,
                },
            )
            .await?;
        for &subtopic_id in &input.subtopic_ids {
            tx.execute(
                "INSERT OR IGNORE INTO session_subtopics (session_id, subtopic_id) VALUES (?1, ?2)",
                libsql::params![session.id, subtopic_id],
            )
            .await?;
        }

        let outcome = self.assign_practice_task_on(&tx, &session).await?;
        if !outcome.is_assigned() {
            tx.rollback().await?;
            return Err(DatabaseError::BadRequest(
                "selected subtopics contain no assignable task".to_string(),
            ));
        }
        tx.commit().await?;

        tracing::debug!(session_id = session.id, user_id, "practice session created");
        Ok(session)
    }

    /// Run the assignment lottery once and append the picked task, if any.
    pub(crate) async fn assign_practice_task_on(
        &self,
        conn: &libsql::Connection,
        session: &Session,
    ) -> Result<AssignmentOutcome, DatabaseError> {
        if !matches!(session.kind, SessionVariant::Practice { .. }) {
            return Err(DatabaseError::InvalidState(format!(
                "practice assignment on {} session {}",
                session.kind.kind(),
                session.id
            )));
        }

        let try_repetition = {
            let mut rng = self.rng();
            rng.gen_range(0.0..1.0) < self.config().spaced_repetition_bias
        };

        if try_repetition {
            if let Some(task) = self
                .space_repetition_candidate_on(conn, session.user_id, session.id)
                .await?
            {
                let index = self
                    .assigned_count_on(conn, session.id, SessionKind::Practice)
                    .await?
                    + 1;
                conn.execute(
                    "INSERT INTO session_tasks (session_id, task_id, idx) VALUES (?1, ?2, ?3)",
                    libsql::params![session.id, task.id, index],
                )
                .await?;
                tracing::debug!(
                    session_id = session.id,
                    task_id = task.id,
                    index,
                    "assigned spaced-repetition task"
                );
                return Ok(AssignmentOutcome::Assigned {
                    task_id: task.id,
                    index,
                });
            }
        }

        self.assign_uncompleted_task_on(conn, session).await
    }

    /// Uniform pick from the unassigned eligible pool.
    pub(crate) async fn assign_uncompleted_task_on(
        &self,
        conn: &libsql::Connection,
        session: &Session,
    ) -> Result<AssignmentOutcome, DatabaseError> {
        let SessionVariant::Practice {
            use_typing_tasks,
            use_multiple_choice_tasks,
        } = session.kind
        else {
            return Err(DatabaseError::InvalidState(format!(
                "practice assignment on {} session {}",
                session.kind.kind(),
                session.id
            )));
        };

        let mut rows = conn
            .query(
                "SELECT t.id FROM tasks t
                 JOIN session_subtopics ss ON ss.subtopic_id = t.subtopic_id
                 WHERE ss.session_id = ?1
                   AND t.deleted_at IS NULL
                   AND (?2 = 1 OR t.kind != 'typing')
                   AND (?3 = 1 OR t.kind != 'multiple_choice')
                   AND t.id NOT IN (SELECT task_id FROM session_tasks WHERE session_id = ?1)",
                libsql::params![
                    session.id,
                    i64::from(use_typing_tasks),
                    i64::from(use_multiple_choice_tasks)
                ],
            )
            .await?;
        let mut pool = Vec::new();
        while let Some(row) = rows.next().await? {
            pool.push(row.get::<i64>(0)?);
        }

        let picked = {
            let mut rng = self.rng();
            pool.choose(&mut *rng).copied()
        };
        let Some(task_id) = picked else {
            tracing::debug!(session_id = session.id, "practice pool exhausted");
            return Ok(AssignmentOutcome::Exhausted);
        };

        let index = self
            .assigned_count_on(conn, session.id, SessionKind::Practice)
            .await?
            + 1;
        conn.execute(
            "INSERT INTO session_tasks (session_id, task_id, idx) VALUES (?1, ?2, ?3)",
            libsql::params![session.id, task_id, index],
        )
        .await?;
        tracing::debug!(
            session_id = session.id,
            task_id,
            index,
            "assigned random task"
        );
        Ok(AssignmentOutcome::Assigned { task_id, index })
    }

    /// Submit a multiple-choice answer to the task at `submit.task_index`.
    ///
    /// Authorize → locate (open slot only) → evaluate → record result and
    /// answers → claim completion → assign the next task → report progress.
    /// The record/complete/assign steps share one transaction; losing the
    /// completion race rolls everything back.
    ///
    /// # Errors
    ///
    /// `DatabaseError::Forbidden` for a non-owner, `BadRequest` for a wrong
    /// session kind, an ended session, a missing or completed slot, or a
    /// non-multiple-choice task at the index.
    pub async fn submit_practice_choices(
        &self,
        session_id: i64,
        submit: &SubmitChoices,
        user_id: i64,
    ) -> Result<SubmissionFeedback, DatabaseError> {
        let session = self.session(session_id).await?;
        if session.user_id != user_id {
            return Err(DatabaseError::Forbidden);
        }
        if !matches!(session.kind, SessionVariant::Practice { .. }) {
            return Err(DatabaseError::BadRequest(format!(
                "session {session_id} is not a practice session"
            )));
        }
        if session.ended_at.is_some() {
            return Err(DatabaseError::BadRequest(format!(
                "session {session_id} has ended"
            )));
        }

        let conn = self.db().conn();
        let task_id = self
            .uncompleted_pivot_at_on(conn, session_id, submit.task_index)
            .await?;
        let content = self.task_content(task_id).await?;
        if content.task.kind != TaskKind::MultipleChoice {
            return Err(DatabaseError::BadRequest(format!(
                "task at index {} is not multiple-choice",
                submit.task_index
            )));
        }
        let evaluation = evaluate_choices(&submit.choice_ids, &content.choices);

        let tx = conn.transaction().await?;
        self.create_result_on(
            &tx,
            TaskSubmission {
                task_id,
                score: evaluation.forgiving_score,
                time_used: submit.time_used,
            },
            user_id,
            session_id,
        )
        .await?;
        for &choice_id in &submit.choice_ids {
            let answer_id = self.create_choice_answer_on(&tx, choice_id).await?;
            self.link_session_answer_on(&tx, session_id, answer_id)
                .await?;
        }
        self.complete_pivot_on(&tx, session_id, submit.task_index)
            .await?;
        let outcome = self.assign_practice_task_on(&tx, &session).await?;
        tx.commit().await?;

        if !outcome.is_assigned() {
            tracing::debug!(session_id, "no further task after submission");
        }

        let progress = self.goal_progress(session_id).await?;
        Ok(SubmissionFeedback {
            score: evaluation.forgiving_score,
            progress,
            evaluation: Some(evaluation),
        })
    }

    /// Submit a typing-task self-assessment for the task at
    /// `submit.task_index`.
    ///
    /// The result write is an idempotent upsert: re-answering the slot
    /// before it completes rewrites the stored score and does NOT advance
    /// the session again. Only the first write records the answer, claims
    /// completion, and assigns the next task.
    ///
    /// # Errors
    ///
    /// `DatabaseError::Forbidden` for a non-owner, `BadRequest` for a wrong
    /// session kind, an ended session, a missing slot, or a
    /// non-typing task at the index.
    pub async fn submit_practice_typing(
        &self,
        session_id: i64,
        submit: &SubmitTyping,
        user_id: i64,
    ) -> Result<SubmissionFeedback, DatabaseError> {
        let session = self.session(session_id).await?;
        if session.user_id != user_id {
            return Err(DatabaseError::Forbidden);
        }
        if !matches!(session.kind, SessionVariant::Practice { .. }) {
            return Err(DatabaseError::BadRequest(format!(
                "session {session_id} is not a practice session"
            )));
        }
        if session.ended_at.is_some() {
            return Err(DatabaseError::BadRequest(format!(
                "session {session_id} has ended"
            )));
        }

        let conn = self.db().conn();
        let task_id = self.pivot_at_on(conn, session_id, submit.task_index).await?;
        let task = self.task(task_id).await?;
        if task.kind != TaskKind::Typing {
            return Err(DatabaseError::BadRequest(format!(
                "task at index {} is not a typing task",
                submit.task_index
            )));
        }

        let score = scoring::compress(submit.knowledge, &(0.0..=4.0));
        let tx = conn.transaction().await?;
        let (outcome, result) = self
            .update_result_on(
                &tx,
                TaskSubmission {
                    task_id,
                    score,
                    time_used: submit.time_used,
                },
                user_id,
                session_id,
            )
            .await?;

        if outcome == UpdateOutcome::Created {
            let answer_id = self.create_text_answer_on(&tx, &submit.answer).await?;
            self.link_session_answer_on(&tx, session_id, answer_id)
                .await?;
            self.complete_pivot_on(&tx, session_id, submit.task_index)
                .await?;
            let assignment = self.assign_practice_task_on(&tx, &session).await?;
            if !assignment.is_assigned() {
                tracing::debug!(session_id, "no further task after submission");
            }
        }
        tx.commit().await?;

        let progress = self.goal_progress(session_id).await?;
        Ok(SubmissionFeedback {
            score: result.result_score,
            progress,
            evaluation: None,
        })
    }
}
