//! Repository methods, implemented as `impl KognitaService` blocks.
//!
//! - `catalog` — subjects/topics/subtopics, tasks and choices, exams,
//!   note-taking sessions and lecture notes (the collaborator surface).
//! - `session` — lifecycle mechanics shared by all three session variants.
//! - `practice` — practice sessions: weighted lazy assignment + submissions.
//! - `exam` — exam sessions: eager fixed pool + submissions.
//! - `recap` — lecture-note recap sessions: incremental assignment.
//! - `task_result` — the scored-result store and spaced-repetition queries.
//! - `answer` — raw answer rows and their session links.

pub mod answer;
pub mod catalog;
pub mod exam;
pub mod practice;
pub mod recap;
pub mod session;
pub mod task_result;
