use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::TaskKind;

/// A single answerable question belonging to a subtopic.
///
/// Soft-deleted tasks keep their result history but are excluded from every
/// assignment pool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    pub subtopic_id: i64,
    pub kind: TaskKind,
    pub question: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// One selectable alternative of a multiple-choice task.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TaskChoice {
    pub id: i64,
    pub task_id: i64,
    pub content: String,
    pub is_correct: bool,
}
