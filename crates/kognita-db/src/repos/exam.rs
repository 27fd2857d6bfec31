//! Exam-session repository: eager creation over a fixed task pool and the
//! submission pipeline.
//!
//! The whole task list is materialized at creation — shuffled once with the
//! service RNG, indexed from 1 — and never grows. The goal starts at
//! `min(exam_goal_cap, task count)`; `extend` raises it by the same step as
//! practice sessions.

use rand::seq::SliceRandom;

use kognita_core::entities::{Session, SessionVariant};
use kognita_core::enums::{TaskKind, UpdateOutcome};
use kognita_core::evaluate::evaluate_choices;
use kognita_core::responses::SubmissionFeedback;
use kognita_core::scoring;
use kognita_core::submit::{SubmitChoices, SubmitTyping};

use crate::error::DatabaseError;
use crate::repos::task_result::TaskSubmission;
use crate::service::KognitaService;

impl KognitaService {
    /// Start an exam session: assign every task of the exam in one batch.
    ///
    /// # Errors
    ///
    /// `DatabaseError::BadRequest` when the exam holds no tasks (this also
    /// covers unknown exam ids — an exam the engine cannot see has no
    /// tasks).
    pub async fn create_exam_session(
        &self,
        exam_id: i64,
        user_id: i64,
    ) -> Result<Session, DatabaseError> {
        let mut task_ids = self.exam_task_ids(exam_id).await?;
        if task_ids.is_empty() {
            return Err(DatabaseError::BadRequest(format!(
                "exam {exam_id} contains no tasks"
            )));
        }

        // Shuffled once here, so the order is fixed for the session's whole
        // life but varies between sessions.
        {
            let mut rng = self.rng();
            task_ids.shuffle(&mut *rng);
        }

        #[allow(clippy::cast_possible_wrap)]
        let goal = self.config().exam_goal_cap.min(task_ids.len() as i64);

        let tx = self.db().conn().transaction().await?;
        let session = self
            .insert_session_on(&tx, user_id, goal, &SessionVariant::Exam { exam_id })
            .await?;
        for (position, task_id) in task_ids.iter().enumerate() {
            #[allow(clippy::cast_possible_wrap)]
            let index = position as i64 + 1;
            tx.execute(
                "INSERT INTO session_tasks (session_id, task_id, idx) VALUES (?1, ?2, ?3)",
                libsql::params![session.id, *task_id, index],
            )
            .await?;
        }
        tx.commit().await?;

        tracing::debug!(
            session_id = session.id,
            exam_id,
            task_count = task_ids.len(),
            "exam session created"
        );
        Ok(session)
    }

    /// Submit a multiple-choice answer inside an exam session.
    ///
    /// Same pipeline as practice, minus the re-assignment step: the pool is
    /// fixed.
    ///
    /// # Errors
    ///
    /// `DatabaseError::Forbidden` for a non-owner, `BadRequest` for a wrong
    /// session kind, a missing or completed slot, or a non-multiple-choice
    /// task at the index.
    pub async fn submit_exam_choices(
        &self,
        session_id: i64,
        submit: &SubmitChoices,
        user_id: i64,
    ) -> Result<SubmissionFeedback, DatabaseError> {
        let session = self.session(session_id).await?;
        if session.user_id != user_id {
            return Err(DatabaseError::Forbidden);
        }
        if !matches!(session.kind, SessionVariant::Exam { .. }) {
            return Err(DatabaseError::BadRequest(format!(
                "session {session_id} is not an exam session"
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
        tx.commit().await?;

        let progress = self.goal_progress(session_id).await?;
        Ok(SubmissionFeedback {
            score: evaluation.forgiving_score,
            progress,
            evaluation: Some(evaluation),
        })
    }

    /// Submit a typing-task self-assessment inside an exam session.
    ///
    /// Idempotent upsert semantics as in practice; no re-assignment.
    ///
    /// # Errors
    ///
    /// `DatabaseError::Forbidden` for a non-owner, `BadRequest` for a wrong
    /// session kind, a missing slot, or a non-typing task at the index.
    pub async fn submit_exam_typing(
        &self,
        session_id: i64,
        submit: &SubmitTyping,
        user_id: i64,
    ) -> Result<SubmissionFeedback, DatabaseError> {
        let session = self.session(session_id).await?;
        if session.user_id != user_id {
            return Err(DatabaseError::Forbidden);
        }
        if !matches!(session.kind, SessionVariant::Exam { .. }) {
            return Err(DatabaseError::BadRequest(format!(
                "session {session_id} is not an exam session"
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
    use kognita_core::enums::TaskKind;
    use pretty_assertions::assert_eq;

    async fn exam_with_typing_tasks(
        svc: &KognitaService,
        subject: i64,
        subtopic: i64,
        n: usize,
    ) -> i64 {
        let exam = svc.create_exam(subject, "midterm").await.unwrap();
        for i in 0..n {
            let task = svc
                .create_task(subtopic, TaskKind::Typing, &format!("exam task {i}"))
                .await
                .unwrap();
            svc.add_exam_task(exam.id, task.id).await.unwrap();
        }
        exam.id
    }

    #[tokio::test]
    async fn empty_exam_is_bad_request() {
        let svc = test_service().await;
        let fx = fixture(&svc).await;
        let exam = svc.create_exam(fx.subject, "empty").await.unwrap();

        assert!(matches!(
            svc.create_exam_session(exam.id, 42).await,
            Err(DatabaseError::BadRequest(_))
        ));
        // Unknown exam ids fail the same way.
        assert!(matches!(
            svc.create_exam_session(9999, 42).await,
            Err(DatabaseError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn creation_assigns_all_tasks_and_caps_goal() {
        let svc = test_service().await;
        let fx = fixture(&svc).await;
        let exam_id = exam_with_typing_tasks(&svc, fx.subject, fx.subtopic, 3).await;

        let session = svc.create_exam_session(exam_id, 42).await.unwrap();
        assert_eq!(session.number_of_task_goal, 3, "goal = min(5, 3)");

        // All three tasks assigned at creation, indices 1..=3.
        let mut rows = svc
            .db()
            .conn()
            .query(
                "SELECT idx FROM session_tasks WHERE session_id = ?1 ORDER BY idx",
                libsql::params![session.id],
            )
            .await
            .unwrap();
        let mut indices = Vec::new();
        while let Some(row) = rows.next().await.unwrap() {
            indices.push(row.get::<i64>(0).unwrap());
        }
        assert_eq!(indices, vec![1, 2, 3]);

        // A large exam is capped at the configured goal.
        let big_exam = exam_with_typing_tasks(&svc, fx.subject, fx.subtopic, 8).await;
        let big_session = svc.create_exam_session(big_exam, 42).await.unwrap();
        assert_eq!(big_session.number_of_task_goal, 5, "goal = min(5, 8)");
    }

    #[tokio::test]
    async fn shuffle_is_reproducible_under_a_seed() {
        let fx_order = |seed: u64| async move {
            let svc = test_service_with_seed(seed).await;
            let fx = fixture(&svc).await;
            let exam_id = exam_with_typing_tasks(&svc, fx.subject, fx.subtopic, 5).await;
            let session = svc.create_exam_session(exam_id, 42).await.unwrap();
            let mut order = Vec::new();
            let mut rows = svc
                .db()
                .conn()
                .query(
                    "SELECT task_id FROM session_tasks WHERE session_id = ?1 ORDER BY idx",
                    libsql::params![session.id],
                )
                .await
                .unwrap();
            while let Some(row) = rows.next().await.unwrap() {
                order.push(row.get::<i64>(0).unwrap());
            }
            order
        };

        assert_eq!(fx_order(99).await, fx_order(99).await);
    }

    #[tokio::test]
    async fn typing_submission_completes_once() {
        let svc = test_service_with_seed(31).await;
        let fx = fixture(&svc).await;
        let exam_id = exam_with_typing_tasks(&svc, fx.subject, fx.subtopic, 3).await;
        let session = svc.create_exam_session(exam_id, 42).await.unwrap();

        let first = svc
            .submit_exam_typing(
                session.id,
                &SubmitTyping {
                    task_index: 1,
                    answer: "answer one".to_string(),
                    knowledge: 4.0,
                    time_used: Some(30.0),
                },
                42,
            )
            .await
            .unwrap();
        assert!((first.score - 1.0).abs() < f64::EPSILON);
        // goal 3, 1 completed → 33
        assert_eq!(first.progress, 33);

        // Retry rewrites the result, does not double-complete.
        let retry = svc
            .submit_exam_typing(
                session.id,
                &SubmitTyping {
                    task_index: 1,
                    answer: "changed my mind".to_string(),
                    knowledge: 2.0,
                    time_used: None,
                },
                42,
            )
            .await
            .unwrap();
        assert!((retry.score - 0.5).abs() < f64::EPSILON);
        assert_eq!(retry.progress, 33);

        let mut rows = svc
            .db()
            .conn()
            .query(
                "SELECT COUNT(*) FROM session_tasks
                 WHERE session_id = ?1 AND is_completed = 1",
                libsql::params![session.id],
            )
            .await
            .unwrap();
        let completed: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(completed, 1);
    }

    #[tokio::test]
    async fn choice_submission_evaluates_and_locks_the_slot() {
        let svc = test_service().await;
        let fx = fixture(&svc).await;
        let exam = svc.create_exam(fx.subject, "quiz").await.unwrap();
        svc.add_exam_task(exam.id, fx.mc_task).await.unwrap();
        let session = svc.create_exam_session(exam.id, 42).await.unwrap();

        let feedback = svc
            .submit_exam_choices(
                session.id,
                &SubmitChoices {
                    task_index: 1,
                    choice_ids: vec![fx.correct_choice, fx.correct_choice_2],
                    time_used: Some(14.0),
                },
                42,
            )
            .await
            .unwrap();
        assert!((feedback.score - 1.0).abs() < f64::EPSILON);
        assert_eq!(feedback.progress, 100);

        // The completed slot rejects a second answer.
        assert!(matches!(
            svc.submit_exam_choices(
                session.id,
                &SubmitChoices {
                    task_index: 1,
                    choice_ids: vec![fx.wrong_choice],
                    time_used: None,
                },
                42,
            )
            .await,
            Err(DatabaseError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn extend_applies_to_exam_sessions() {
        let svc = test_service().await;
        let fx = fixture(&svc).await;
        let exam_id = exam_with_typing_tasks(&svc, fx.subject, fx.subtopic, 8).await;
        let session = svc.create_exam_session(exam_id, 42).await.unwrap();

        svc.extend_session(session.id, 42).await.unwrap();
        let extended = svc.session(session.id).await.unwrap();
        assert_eq!(extended.number_of_task_goal, 10);

        assert!(matches!(
            svc.extend_session(session.id, 1).await,
            Err(DatabaseError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn ownership_gate_on_exam_submission() {
        let svc = test_service().await;
        let fx = fixture(&svc).await;
        let exam_id = exam_with_typing_tasks(&svc, fx.subject, fx.subtopic, 2).await;
        let session = svc.create_exam_session(exam_id, 42).await.unwrap();

        let result = svc
            .submit_exam_typing(
                session.id,
                &SubmitTyping {
                    task_index: 1,
                    answer: "not mine".to_string(),
                    knowledge: 4.0,
                    time_used: None,
                },
                7,
            )
            .await;
        assert!(matches!(result, Err(DatabaseError::Forbidden)));
    }

    #[tokio::test]
    async fn completion_counts_flow_into_exam_listing() {
        let svc = test_service_with_seed(37).await;
        let fx = fixture(&svc).await;
        let exam_id = exam_with_typing_tasks(&svc, fx.subject, fx.subtopic, 3).await;
        let other_exam = exam_with_typing_tasks(&svc, fx.subject, fx.subtopic, 2).await;
        let session = svc.create_exam_session(exam_id, 42).await.unwrap();

        for index in 1..=2 {
            svc.submit_exam_typing(
                session.id,
                &SubmitTyping {
                    task_index: index,
                    answer: format!("answer {index}"),
                    knowledge: 3.0,
                    time_used: None,
                },
                42,
            )
            .await
            .unwrap();
        }

        let completions = svc
            .completion_in_exams(&[exam_id, other_exam], 42)
            .await
            .unwrap();
        assert_eq!(completions.len(), 2);
        assert_eq!(completions[0].exam_id, exam_id);
        assert_eq!(completions[0].completed_count, 2);
        assert_eq!(completions[1].completed_count, 0);
    }
}
