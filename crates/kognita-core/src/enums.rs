//! Kind and state enums for the Kognita session engine.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.
//! `SessionState` provides `allowed_next_states()` to enforce valid transitions
//! at the application layer.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// SessionKind
// ---------------------------------------------------------------------------

/// Discriminator for the three session variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Practice,
    Exam,
    Recap,
}

impl SessionKind {
    /// Return the string representation used in SQL storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Practice => "practice",
            Self::Exam => "exam",
            Self::Recap => "recap",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TaskKind
// ---------------------------------------------------------------------------

/// The two answerable task types.
///
/// Multiple-choice tasks are machine-evaluated against their correct choice
/// set; typing tasks are self-assessed by the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    MultipleChoice,
    Typing,
}

impl TaskKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::Typing => "typing",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Lifecycle state of a session.
///
/// ```text
/// created → active → ended
/// created → ended
/// ```
///
/// The state is derived from storage (assignment count and end timestamp),
/// never stored directly. There is no transition out of `Ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Active,
    Ended,
}

impl SessionState {
    /// Valid next states from the current state.
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Created => &[Self::Active, Self::Ended],
            Self::Active => &[Self::Ended],
            Self::Ended => &[],
        }
    }

    /// Check whether transitioning to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AssignmentOutcome
// ---------------------------------------------------------------------------

/// Result of running a task-assignment policy.
///
/// `Exhausted` is ordinary control flow, not an error: a session whose
/// eligible pool has run dry simply gets no next task. Callers in the
/// submission pipeline treat it as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum AssignmentOutcome {
    /// A new task was appended to the session at `index`.
    Assigned { task_id: i64, index: i64 },
    /// No eligible task remains for this session.
    Exhausted,
}

impl AssignmentOutcome {
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        matches!(self, Self::Assigned { .. })
    }
}

// ---------------------------------------------------------------------------
// UpdateOutcome
// ---------------------------------------------------------------------------

/// Which branch an idempotent result upsert took.
///
/// The typing-task submission path only advances the session state machine
/// (answer row, completion mark, next assignment) when the write `Created`
/// a fresh result; an `Updated` outcome means a re-answer of a slot that is
/// still open and must not double-count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    Created,
    Updated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_state_transitions() {
        assert!(SessionState::Created.can_transition_to(SessionState::Active));
        assert!(SessionState::Created.can_transition_to(SessionState::Ended));
        assert!(SessionState::Active.can_transition_to(SessionState::Ended));
        assert!(!SessionState::Ended.can_transition_to(SessionState::Active));
        assert!(!SessionState::Ended.can_transition_to(SessionState::Created));
        assert!(SessionState::Ended.allowed_next_states().is_empty());
    }

    #[test]
    fn kind_strings_match_storage() {
        assert_eq!(SessionKind::Practice.as_str(), "practice");
        assert_eq!(TaskKind::MultipleChoice.as_str(), "multiple_choice");
        assert_eq!(TaskKind::Typing.to_string(), "typing");
    }

    #[test]
    fn assignment_outcome_is_assigned() {
        assert!(
            AssignmentOutcome::Assigned {
                task_id: 1,
                index: 1
            }
            .is_assigned()
        );
        assert!(!AssignmentOutcome::Exhausted.is_assigned());
    }
}
