//! View types returned to the transport layer.
//!
//! Shaped for rendering: question content plus a kind discriminator, never
//! another user's answers.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{Task, TaskChoice};
use crate::evaluate::ChoiceEvaluation;

/// A task as presented inside a session: the task row plus its choices.
///
/// `choices` is empty for typing tasks; dispatch on `task.kind`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TaskContent {
    pub task: Task,
    pub choices: Vec<TaskChoice>,
}

/// What a submission returns: the recorded score, the freshly recomputed
/// goal progress, and (for multiple-choice) the per-choice evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SubmissionFeedback {
    /// The score that was persisted for this submission.
    pub score: f64,
    /// Percent of the session goal completed. Not clamped; a session that
    /// completes more tasks than its goal reports above 100.
    pub progress: i64,
    pub evaluation: Option<ChoiceEvaluation>,
}

/// One row of the post-session review screen.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SessionResultRow {
    pub topic_name: String,
    pub task_index: i64,
    pub question: String,
    pub score: f64,
    pub time_used: Option<f64>,
    pub revisit_at: Option<DateTime<Utc>>,
    pub answered_at: DateTime<Utc>,
}

/// Completed-task count for one exam, for listing screens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ExamCompletion {
    pub exam_id: i64,
    pub completed_count: i64,
}
