//! Submission and session-creation payloads accepted from the transport
//! layer.
//!
//! Free-text answers are assumed sanitized before they reach this crate.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for starting a practice session.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PracticeSessionInput {
    /// Subtopics the session draws tasks from. Must be non-empty.
    pub subtopic_ids: Vec<i64>,
    pub number_of_task_goal: i64,
    pub use_typing_tasks: bool,
    pub use_multiple_choice_tasks: bool,
}

/// Parameters for starting a lecture-note recap session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RecapSessionInput {
    pub note_session_id: i64,
    pub number_of_task_goal: i64,
}

/// A multiple-choice answer for the task at `task_index`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SubmitChoices {
    /// 1-based index into the session's assigned task list.
    pub task_index: i64,
    pub choice_ids: Vec<i64>,
    /// Seconds spent answering, if the client measured it.
    pub time_used: Option<f64>,
}

/// A typing-task answer for the task at `task_index`.
///
/// `knowledge` is the learner's self-assessment on the 0–4 band; it is
/// compressed into the stored `[0, 1]` score.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SubmitTyping {
    pub task_index: i64,
    pub answer: String,
    pub knowledge: f64,
    pub time_used: Option<f64>,
}
