use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{SessionKind, SessionState};

/// One user's attempt at practicing, testing, or reviewing a bounded set of
/// tasks.
///
/// The three variants share the base identity and lifecycle columns; the
/// variant payload is carried inline as a tagged union rather than as a
/// joined specialization row. The owning user never changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    /// Target number of completed tasks. A soft goal: completing more than
    /// this is allowed and progress above 100% is reported as-is.
    pub number_of_task_goal: i64,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Variant payload, flattened so the wire shape carries a single
    /// top-level `kind` discriminator.
    #[serde(flatten)]
    pub kind: SessionVariant,
}

/// Variant-specific session payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionVariant {
    /// Lazy random/spaced-repetition assignment over a set of subtopics.
    Practice {
        use_typing_tasks: bool,
        use_multiple_choice_tasks: bool,
    },
    /// Fixed task list drawn from an exam at creation time.
    Exam { exam_id: i64 },
    /// Incremental random assignment from a note-taking session's notes.
    Recap { note_session_id: i64 },
}

impl SessionVariant {
    #[must_use]
    pub const fn kind(&self) -> SessionKind {
        match self {
            Self::Practice { .. } => SessionKind::Practice,
            Self::Exam { .. } => SessionKind::Exam,
            Self::Recap { .. } => SessionKind::Recap,
        }
    }
}

impl Session {
    /// Derive the lifecycle state from the end timestamp and the number of
    /// tasks ever assigned.
    #[must_use]
    pub const fn state(&self, assigned_count: i64) -> SessionState {
        if self.ended_at.is_some() {
            SessionState::Ended
        } else if assigned_count > 0 {
            SessionState::Active
        } else {
            SessionState::Created
        }
    }
}

/// Ordered pivot row linking a practice or exam session to one of its tasks.
///
/// `index` starts at 1 and is gapless per session; `(session_id, task_id)`
/// is unique. The current task is the row with the highest index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SessionTask {
    pub session_id: i64,
    pub task_id: i64,
    pub index: i64,
    pub is_completed: bool,
}

/// Assignment row for a recap session. Zero-based index, completion carried
/// as a timestamp rather than a flag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RecapTask {
    pub session_id: i64,
    pub task_id: i64,
    pub index: i64,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::SessionState;

    fn practice_session(ended: bool) -> Session {
        Session {
            id: 1,
            user_id: 7,
            number_of_task_goal: 5,
            created_at: Utc::now(),
            ended_at: ended.then(Utc::now),
            kind: SessionVariant::Practice {
                use_typing_tasks: true,
                use_multiple_choice_tasks: true,
            },
        }
    }

    #[test]
    fn state_derivation() {
        assert_eq!(practice_session(false).state(0), SessionState::Created);
        assert_eq!(practice_session(false).state(3), SessionState::Active);
        assert_eq!(practice_session(true).state(3), SessionState::Ended);
    }

    #[test]
    fn variant_serializes_with_kind_tag() {
        use pretty_assertions::assert_eq;

        let session = practice_session(false);
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["kind"], "practice");
        assert_eq!(json["use_typing_tasks"], true);

        let recovered: Session = serde_json::from_value(json).unwrap();
        assert_eq!(recovered, session);
    }

    #[test]
    fn variant_kind_discriminator() {
        assert_eq!(
            SessionVariant::Exam { exam_id: 2 }.kind(),
            SessionKind::Exam
        );
        assert_eq!(
            SessionVariant::Recap { note_session_id: 9 }.kind(),
            SessionKind::Recap
        );
    }
}
