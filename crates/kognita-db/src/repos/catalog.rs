//! Catalog repository — subjects, topics, subtopics, tasks, choices, exams,
//! and lecture notes.
//!
//! This is the narrow surface the session engine consumes from the
//! authoring side of the platform: creation is fixture-grade (no rich
//! editing), lookups are exactly what assignment and result listing need.

use chrono::Utc;

use kognita_core::entities::{Exam, LectureNote, NoteTakingSession, Subject, Subtopic, Task, TaskChoice, Topic};
use kognita_core::enums::TaskKind;
use kognita_core::responses::TaskContent;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_optional_datetime};
use crate::service::KognitaService;

const TASK_COLS: &str = "id, subtopic_id, kind, question, created_at, deleted_at";

pub(crate) fn row_to_task(row: &libsql::Row) -> Result<Task, DatabaseError> {
    let kind = match row.get::<String>(2)?.as_str() {
        "multiple_choice" => TaskKind::MultipleChoice,
        "typing" => TaskKind::Typing,
        other => {
            return Err(DatabaseError::Query(format!("Unknown task kind '{other}'")));
        }
    };
    Ok(Task {
        id: row.get(0)?,
        subtopic_id: row.get(1)?,
        kind,
        question: row.get(3)?,
        created_at: parse_datetime(&row.get::<String>(4)?)?,
        deleted_at: parse_optional_datetime(get_opt_string(row, 5)?.as_deref())?,
    })
}

impl KognitaService {
    pub async fn create_subject(&self, name: &str) -> Result<Subject, DatabaseError> {
        self.db()
            .conn()
            .execute(
                "INSERT INTO subjects (name) VALUES (?1)",
                libsql::params![name],
            )
            .await?;
        Ok(Subject {
            id: self.db().last_insert_rowid(),
            name: name.to_string(),
        })
    }

    pub async fn create_topic(&self, subject_id: i64, name: &str) -> Result<Topic, DatabaseError> {
        self.db()
            .conn()
            .execute(
                "INSERT INTO topics (subject_id, name) VALUES (?1, ?2)",
                libsql::params![subject_id, name],
            )
            .await?;
        Ok(Topic {
            id: self.db().last_insert_rowid(),
            subject_id,
            name: name.to_string(),
        })
    }

    pub async fn create_subtopic(
        &self,
        topic_id: i64,
        name: &str,
    ) -> Result<Subtopic, DatabaseError> {
        self.db()
            .conn()
            .execute(
                "INSERT INTO subtopics (topic_id, name) VALUES (?1, ?2)",
                libsql::params![topic_id, name],
            )
            .await?;
        Ok(Subtopic {
            id: self.db().last_insert_rowid(),
            topic_id,
            name: name.to_string(),
        })
    }

    /// Check that a subtopic exists.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` when it does not.
    pub async fn require_subtopic(&self, subtopic_id: i64) -> Result<(), DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT id FROM subtopics WHERE id = ?1",
                libsql::params![subtopic_id],
            )
            .await?;
        if rows.next().await?.is_none() {
            return Err(DatabaseError::not_found("subtopic", subtopic_id));
        }
        Ok(())
    }

    pub async fn create_task(
        &self,
        subtopic_id: i64,
        kind: TaskKind,
        question: &str,
    ) -> Result<Task, DatabaseError> {
        let now = Utc::now();
        self.db()
            .conn()
            .execute(
                "INSERT INTO tasks (subtopic_id, kind, question, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                libsql::params![subtopic_id, kind.as_str(), question, now.to_rfc3339()],
            )
            .await?;
        Ok(Task {
            id: self.db().last_insert_rowid(),
            subtopic_id,
            kind,
            question: question.to_string(),
            created_at: now,
            deleted_at: None,
        })
    }

    pub async fn create_choice(
        &self,
        task_id: i64,
        content: &str,
        is_correct: bool,
    ) -> Result<TaskChoice, DatabaseError> {
        self.db()
            .conn()
            .execute(
                "INSERT INTO task_choices (task_id, content, is_correct) VALUES (?1, ?2, ?3)",
                libsql::params![task_id, content, i64::from(is_correct)],
            )
            .await?;
        Ok(TaskChoice {
            id: self.db().last_insert_rowid(),
            task_id,
            content: content.to_string(),
            is_correct,
        })
    }

    /// Soft-delete a task. Its result history stays; every assignment pool
    /// excludes it from now on.
    pub async fn soft_delete_task(&self, task_id: i64) -> Result<(), DatabaseError> {
        let affected = self
            .db()
            .conn()
            .execute(
                "UPDATE tasks SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
                libsql::params![Utc::now().to_rfc3339(), task_id],
            )
            .await?;
        if affected == 0 {
            return Err(DatabaseError::not_found("task", task_id));
        }
        Ok(())
    }

    /// Fetch a task row.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown id.
    pub async fn task(&self, task_id: i64) -> Result<Task, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {TASK_COLS} FROM tasks WHERE id = ?1"),
                libsql::params![task_id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or(DatabaseError::not_found("task", task_id))?;
        row_to_task(&row)
    }

    /// A task shaped for rendering: the row plus its choices (empty for
    /// typing tasks).
    pub async fn task_content(&self, task_id: i64) -> Result<TaskContent, DatabaseError> {
        let task = self.task(task_id).await?;
        let choices = self.choices_for(task_id).await?;
        Ok(TaskContent { task, choices })
    }

    /// All choices of a multiple-choice task, in authoring order.
    pub async fn choices_for(&self, task_id: i64) -> Result<Vec<TaskChoice>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT id, task_id, content, is_correct FROM task_choices
                 WHERE task_id = ?1 ORDER BY id",
                libsql::params![task_id],
            )
            .await?;
        let mut choices = Vec::new();
        while let Some(row) = rows.next().await? {
            choices.push(TaskChoice {
                id: row.get(0)?,
                task_id: row.get(1)?,
                content: row.get(2)?,
                is_correct: row.get::<i64>(3)? != 0,
            });
        }
        Ok(choices)
    }

    pub async fn create_exam(&self, subject_id: i64, name: &str) -> Result<Exam, DatabaseError> {
        self.db()
            .conn()
            .execute(
                "INSERT INTO exams (subject_id, name) VALUES (?1, ?2)",
                libsql::params![subject_id, name],
            )
            .await?;
        Ok(Exam {
            id: self.db().last_insert_rowid(),
            subject_id,
            name: name.to_string(),
        })
    }

    pub async fn add_exam_task(&self, exam_id: i64, task_id: i64) -> Result<(), DatabaseError> {
        self.db()
            .conn()
            .execute(
                "INSERT INTO exam_tasks (exam_id, task_id) VALUES (?1, ?2)",
                libsql::params![exam_id, task_id],
            )
            .await?;
        Ok(())
    }

    /// All task ids belonging to an exam, excluding soft-deleted tasks, in
    /// authoring order.
    pub async fn exam_task_ids(&self, exam_id: i64) -> Result<Vec<i64>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT et.task_id FROM exam_tasks et
                 JOIN tasks t ON t.id = et.task_id
                 WHERE et.exam_id = ?1 AND t.deleted_at IS NULL
                 ORDER BY et.rowid",
                libsql::params![exam_id],
            )
            .await?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    pub async fn create_note_session(
        &self,
        user_id: i64,
    ) -> Result<NoteTakingSession, DatabaseError> {
        self.db()
            .conn()
            .execute(
                "INSERT INTO note_sessions (user_id, created_at) VALUES (?1, ?2)",
                libsql::params![user_id, Utc::now().to_rfc3339()],
            )
            .await?;
        Ok(NoteTakingSession {
            id: self.db().last_insert_rowid(),
            user_id,
        })
    }

    /// Fetch a note-taking session.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown id.
    pub async fn note_session(&self, id: i64) -> Result<NoteTakingSession, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT id, user_id FROM note_sessions WHERE id = ?1",
                libsql::params![id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or(DatabaseError::not_found("note_session", id))?;
        Ok(NoteTakingSession {
            id: row.get(0)?,
            user_id: row.get(1)?,
        })
    }

    /// Create a lecture note: a typing task wrapped with a note row tying it
    /// to its note-taking session.
    pub async fn create_lecture_note(
        &self,
        note_session_id: i64,
        subtopic_id: i64,
        question: &str,
    ) -> Result<LectureNote, DatabaseError> {
        let task = self
            .create_task(subtopic_id, TaskKind::Typing, question)
            .await?;
        self.db()
            .conn()
            .execute(
                "INSERT INTO lecture_notes (task_id, note_session_id) VALUES (?1, ?2)",
                libsql::params![task.id, note_session_id],
            )
            .await?;
        Ok(LectureNote {
            task_id: task.id,
            note_session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::helpers::test_service;
    use kognita_core::enums::TaskKind;

    #[tokio::test]
    async fn create_and_fetch_task() {
        let svc = test_service().await;
        let subject = svc.create_subject("maths").await.unwrap();
        let topic = svc.create_topic(subject.id, "algebra").await.unwrap();
        let subtopic = svc.create_subtopic(topic.id, "equations").await.unwrap();
        let task = svc
            .create_task(subtopic.id, TaskKind::Typing, "solve x + 1 = 2")
            .await
            .unwrap();

        let fetched = svc.task(task.id).await.unwrap();
        assert_eq!(fetched.question, "solve x + 1 = 2");
        assert_eq!(fetched.kind, TaskKind::Typing);
        assert!(fetched.deleted_at.is_none());
    }

    #[tokio::test]
    async fn task_content_carries_choices() {
        let svc = test_service().await;
        let subject = svc.create_subject("maths").await.unwrap();
        let topic = svc.create_topic(subject.id, "algebra").await.unwrap();
        let subtopic = svc.create_subtopic(topic.id, "equations").await.unwrap();
        let task = svc
            .create_task(subtopic.id, TaskKind::MultipleChoice, "pick 2")
            .await
            .unwrap();
        svc.create_choice(task.id, "1", false).await.unwrap();
        svc.create_choice(task.id, "2", true).await.unwrap();

        let content = svc.task_content(task.id).await.unwrap();
        assert_eq!(content.choices.len(), 2);
        assert!(content.choices[1].is_correct);
    }

    #[tokio::test]
    async fn soft_delete_marks_task() {
        let svc = test_service().await;
        let subject = svc.create_subject("maths").await.unwrap();
        let topic = svc.create_topic(subject.id, "algebra").await.unwrap();
        let subtopic = svc.create_subtopic(topic.id, "equations").await.unwrap();
        let task = svc
            .create_task(subtopic.id, TaskKind::Typing, "q")
            .await
            .unwrap();

        svc.soft_delete_task(task.id).await.unwrap();
        let fetched = svc.task(task.id).await.unwrap();
        assert!(fetched.deleted_at.is_some());
    }

    #[tokio::test]
    async fn exam_task_ids_skip_deleted() {
        let svc = test_service().await;
        let subject = svc.create_subject("maths").await.unwrap();
        let topic = svc.create_topic(subject.id, "algebra").await.unwrap();
        let subtopic = svc.create_subtopic(topic.id, "equations").await.unwrap();
        let exam = svc.create_exam(subject.id, "midterm").await.unwrap();

        let keep = svc
            .create_task(subtopic.id, TaskKind::Typing, "keep")
            .await
            .unwrap();
        let removed = svc
            .create_task(subtopic.id, TaskKind::Typing, "drop")
            .await
            .unwrap();
        svc.add_exam_task(exam.id, keep.id).await.unwrap();
        svc.add_exam_task(exam.id, removed.id).await.unwrap();
        svc.soft_delete_task(removed.id).await.unwrap();

        assert_eq!(svc.exam_task_ids(exam.id).await.unwrap(), vec![keep.id]);
    }
}
