use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A scored submission outcome for one (user, task, session) event.
///
/// Append-mostly history: a new submission for the same (user, task) in a
/// different session creates a new row. The latest row per (user, task)
/// determines the next revisit date and feeds the spaced-repetition
/// candidate query.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TaskResult {
    pub id: i64,
    pub user_id: i64,
    pub task_id: i64,
    pub session_id: Option<i64>,
    /// Normalized score in `[0, 1]`.
    pub result_score: f64,
    /// Seconds spent answering, when the client reported it.
    pub time_used: Option<f64>,
    /// When this task should be re-surfaced, from the revisit curve.
    pub revisit_at: Option<DateTime<Utc>>,
    /// Set when a moderator entered the score by hand.
    pub is_set_manually: bool,
    pub created_at: DateTime<Utc>,
}
