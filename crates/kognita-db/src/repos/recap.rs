//! Lecture-note recap repository: incremental random assignment from a
//! note-taking session's notes.
//!
//! Two tasks are assigned up front so the learner always sees one task
//! ahead; every submission assigns one more. Indices are 0-based, unlike
//! the 1-based practice/exam pivot. Running out of notes is a quiet no-op —
//! recap sessions legitimately drain their material.

use chrono::Utc;
use rand::seq::SliceRandom;

use kognita_core::entities::{Session, SessionVariant};
use kognita_core::enums::{AssignmentOutcome, SessionKind, UpdateOutcome};
use kognita_core::responses::SubmissionFeedback;
use kognita_core::scoring;
use kognita_core::submit::{RecapSessionInput, SubmitTyping};

use crate::error::DatabaseError;
use crate::repos::task_result::TaskSubmission;
use crate::service::KognitaService;

impl KognitaService {
    /// Start a recap session over a note-taking session's notes.
    ///
    /// Pre-assigns `recap_initial_assignments` tasks (two, by default).
    /// A note-taking session with fewer notes than that simply starts
    /// smaller; with none, it starts empty.
    ///
    /// # Errors
    ///
    /// `DatabaseError::BadRequest` for a non-positive goal,
    /// `DatabaseError::NotFound` for an unknown note-taking session,
    /// `DatabaseError::Forbidden` when the note-taking session belongs to
    /// someone else.
    pub async fn create_recap_session(
        &self,
        input: &RecapSessionInput,
        user_id: i64,
    ) -> Result<Session, DatabaseError> {
        if input.number_of_task_goal <= 0 {
            return Err(DatabaseError::BadRequest(
                "number of task goal must be positive".to_string(),
            ));
        }
        let note_session = self.note_session(input.note_session_id).await?;
        if note_session.user_id != user_id {
            return Err(DatabaseError::Forbidden);
        }

        let tx = self.db().conn().transaction().await?;
        let session = self
            .insert_session_on(
                &tx,
                user_id,
                input.number_of_task_goal,
                &SessionVariant::Recap {
                    note_session_id: input.note_session_id,
                },
            )
            .await?;
        for _ in 0..self.config().recap_initial_assignments {
            let outcome = self.assign_recap_task_on(&tx, &session).await?;
            if !outcome.is_assigned() {
                break;
            }
        }
        tx.commit().await?;

        tracing::debug!(
            session_id = session.id,
            note_session_id = input.note_session_id,
            "recap session created"
        );
        Ok(session)
    }

    /// Assign one random not-yet-assigned note task, if any remain.
    ///
    /// The new row's index is the current assignment count (0-based).
    pub(crate) async fn assign_recap_task_on(
        &self,
        conn: &libsql::Connection,
        session: &Session,
    ) -> Result<AssignmentOutcome, DatabaseError> {
        let SessionVariant::Recap { note_session_id } = session.kind else {
            return Err(DatabaseError::InvalidState(format!(
                "recap assignment on {} session {}",
                session.kind.kind(),
                session.id
            )));
        };

        let mut rows = conn
            .query(
                "SELECT ln.task_id FROM lecture_notes ln
                 JOIN tasks t ON t.id = ln.task_id
                 WHERE ln.note_session_id = ?1
                   AND t.deleted_at IS NULL
                   AND ln.task_id NOT IN
                       (SELECT task_id FROM recap_tasks WHERE session_id = ?2)",
                libsql::params![note_session_id, session.id],
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
            tracing::debug!(session_id = session.id, "recap notes exhausted");
            return Ok(AssignmentOutcome::Exhausted);
        };

        let index = self
            .assigned_count_on(conn, session.id, SessionKind::Recap)
            .await?;
        conn.execute(
            "INSERT INTO recap_tasks (session_id, task_id, idx, created_at) VALUES (?1, ?2, ?3, ?4)",
            libsql::params![session.id, task_id, index, Utc::now().to_rfc3339()],
        )
        .await?;
        tracing::debug!(
            session_id = session.id,
            task_id,
            index,
            "assigned recap task"
        );
        Ok(AssignmentOutcome::Assigned { task_id, index })
    }

    /// Submit a recap answer for the note task at `submit.task_index`
    /// (0-based).
    ///
    /// Result writes are idempotent upserts; only the first write records
    /// the answer, stamps `completed_at`, and assigns the next note.
    ///
    /// # Errors
    ///
    /// `DatabaseError::Forbidden` for a non-owner, `BadRequest` for a wrong
    /// session kind, an ended session, or a missing slot.
    pub async fn submit_recap(
        &self,
        session_id: i64,
        submit: &SubmitTyping,
        user_id: i64,
    ) -> Result<SubmissionFeedback, DatabaseError> {
        let session = self.session(session_id).await?;
        if session.user_id != user_id {
            return Err(DatabaseError::Forbidden);
        }
        if !matches!(session.kind, SessionVariant::Recap { .. }) {
            return Err(DatabaseError::BadRequest(format!(
                "session {session_id} is not a recap session"
            )));
        }
        if session.ended_at.is_some() {
            return Err(DatabaseError::BadRequest(format!(
                "session {session_id} has ended"
            )));
        }

        let conn = self.db().conn();
        let mut rows = conn
            .query(
                "SELECT task_id FROM recap_tasks WHERE session_id = ?1 AND idx = ?2",
                libsql::params![session_id, submit.task_index],
            )
            .await?;
        let row = rows.next().await?.ok_or_else(|| {
            DatabaseError::BadRequest(format!(
                "no task at index {} in session {session_id}",
                submit.task_index
            ))
        })?;
        let task_id: i64 = row.get(0)?;

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
            let affected = tx
                .execute(
                    "UPDATE recap_tasks SET completed_at = ?1
                     WHERE session_id = ?2 AND idx = ?3 AND completed_at IS NULL",
                    libsql::params![Utc::now().to_rfc3339(), session_id, submit.task_index],
                )
                .await?;
            if affected == 0 {
                tx.rollback().await?;
                return Err(DatabaseError::BadRequest(format!(
                    "task at index {} in session {session_id} is already completed",
                    submit.task_index
                )));
            }
            let assignment = self.assign_recap_task_on(&tx, &session).await?;
            if !assignment.is_assigned() {
                tracing::debug!(session_id, "no further note task after submission");
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{fixture, test_service, test_service_with_seed};
    use pretty_assertions::assert_eq;

    async fn note_session_with_notes(svc: &KognitaService, user_id: i64, n: usize) -> i64 {
        let fx = fixture(svc).await;
        let note_session = svc.create_note_session(user_id).await.unwrap();
        for i in 0..n {
            svc.create_lecture_note(note_session.id, fx.subtopic, &format!("note {i}"))
                .await
                .unwrap();
        }
        note_session.id
    }

    #[tokio::test]
    async fn creation_preassigns_two_tasks_zero_based() {
        let svc = test_service_with_seed(41).await;
        let note_session_id = note_session_with_notes(&svc, 42, 4).await;

        let session = svc
            .create_recap_session(
                &RecapSessionInput {
                    note_session_id,
                    number_of_task_goal: 3,
                },
                42,
            )
            .await
            .unwrap();

        let mut rows = svc
            .db()
            .conn()
            .query(
                "SELECT idx FROM recap_tasks WHERE session_id = ?1 ORDER BY idx",
                libsql::params![session.id],
            )
            .await
            .unwrap();
        let mut indices = Vec::new();
        while let Some(row) = rows.next().await.unwrap() {
            indices.push(row.get::<i64>(0).unwrap());
        }
        assert_eq!(indices, vec![0, 1]);
    }

    #[tokio::test]
    async fn creation_with_one_note_assigns_one() {
        let svc = test_service_with_seed(43).await;
        let note_session_id = note_session_with_notes(&svc, 42, 1).await;

        let session = svc
            .create_recap_session(
                &RecapSessionInput {
                    note_session_id,
                    number_of_task_goal: 2,
                },
                42,
            )
            .await
            .unwrap();

        let mut rows = svc
            .db()
            .conn()
            .query(
                "SELECT COUNT(*) FROM recap_tasks WHERE session_id = ?1",
                libsql::params![session.id],
            )
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn creation_checks_note_session_ownership() {
        let svc = test_service().await;
        let note_session_id = note_session_with_notes(&svc, 42, 2).await;

        assert!(matches!(
            svc.create_recap_session(
                &RecapSessionInput {
                    note_session_id,
                    number_of_task_goal: 2,
                },
                99,
            )
            .await,
            Err(DatabaseError::Forbidden)
        ));
        assert!(matches!(
            svc.create_recap_session(
                &RecapSessionInput {
                    note_session_id: 777,
                    number_of_task_goal: 2,
                },
                42,
            )
            .await,
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn submission_advances_one_note_ahead() {
        let svc = test_service_with_seed(47).await;
        let note_session_id = note_session_with_notes(&svc, 42, 4).await;
        let session = svc
            .create_recap_session(
                &RecapSessionInput {
                    note_session_id,
                    number_of_task_goal: 4,
                },
                42,
            )
            .await
            .unwrap();

        let feedback = svc
            .submit_recap(
                session.id,
                &SubmitTyping {
                    task_index: 0,
                    answer: "recalled it".to_string(),
                    knowledge: 3.2,
                    time_used: Some(5.0),
                },
                42,
            )
            .await
            .unwrap();
        assert!((feedback.score - 0.8).abs() < f64::EPSILON);
        assert_eq!(feedback.progress, 25);

        // Two pre-assigned plus one more after the submission.
        let mut rows = svc
            .db()
            .conn()
            .query(
                "SELECT COUNT(*) FROM recap_tasks WHERE session_id = ?1",
                libsql::params![session.id],
            )
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn notes_never_assigned_twice_and_exhaustion_is_quiet() {
        let svc = test_service_with_seed(53).await;
        let note_session_id = note_session_with_notes(&svc, 42, 2).await;
        let session = svc
            .create_recap_session(
                &RecapSessionInput {
                    note_session_id,
                    number_of_task_goal: 2,
                },
                42,
            )
            .await
            .unwrap();

        // Both notes assigned at creation; submitting both drains the pool
        // without ever erroring.
        for index in 0..2 {
            svc.submit_recap(
                session.id,
                &SubmitTyping {
                    task_index: index,
                    answer: format!("note answer {index}"),
                    knowledge: 4.0,
                    time_used: None,
                },
                42,
            )
            .await
            .unwrap();
        }

        let mut rows = svc
            .db()
            .conn()
            .query(
                "SELECT task_id FROM recap_tasks WHERE session_id = ?1 ORDER BY idx",
                libsql::params![session.id],
            )
            .await
            .unwrap();
        let mut assigned = Vec::new();
        while let Some(row) = rows.next().await.unwrap() {
            assigned.push(row.get::<i64>(0).unwrap());
        }
        assert_eq!(assigned.len(), 2);
        let unique: std::collections::HashSet<_> = assigned.iter().collect();
        assert_eq!(unique.len(), 2, "a note must not be assigned twice");

        assert_eq!(svc.goal_progress(session.id).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn recap_resubmission_does_not_double_count() {
        let svc = test_service_with_seed(59).await;
        let note_session_id = note_session_with_notes(&svc, 42, 3).await;
        let session = svc
            .create_recap_session(
                &RecapSessionInput {
                    note_session_id,
                    number_of_task_goal: 3,
                },
                42,
            )
            .await
            .unwrap();

        for _ in 0..2 {
            svc.submit_recap(
                session.id,
                &SubmitTyping {
                    task_index: 0,
                    answer: "same slot".to_string(),
                    knowledge: 2.0,
                    time_used: None,
                },
                42,
            )
            .await
            .unwrap();
        }

        // One completion, one extra assignment beyond the pre-assigned two.
        let mut rows = svc
            .db()
            .conn()
            .query(
                "SELECT COUNT(*) FROM recap_tasks
                 WHERE session_id = ?1 AND completed_at IS NOT NULL",
                libsql::params![session.id],
            )
            .await
            .unwrap();
        let completed: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(completed, 1);

        let mut rows = svc
            .db()
            .conn()
            .query(
                "SELECT COUNT(*) FROM recap_tasks WHERE session_id = ?1",
                libsql::params![session.id],
            )
            .await
            .unwrap();
        let total: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(total, 3);
    }
}
