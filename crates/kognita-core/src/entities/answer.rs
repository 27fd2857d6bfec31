use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Raw answer content for a single submission, kept separate from the scored
/// [`TaskResult`](crate::entities::TaskResult) so answers and results stay
/// independently queryable.
///
/// Exactly one of `choice_id` (multiple-choice selection) and `answer`
/// (sanitized free text) is set. Answers attach to their session through a
/// `session_answers` join row.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TaskAnswer {
    pub id: i64,
    pub choice_id: Option<i64>,
    pub answer: Option<String>,
    pub created_at: DateTime<Utc>,
}
