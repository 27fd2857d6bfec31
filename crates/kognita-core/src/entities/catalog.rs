//! Catalog ancestry and collaborator entities.
//!
//! Subjects, topics, subtopics, exams, and lecture notes are authored
//! elsewhere; the session engine only reads them to scope task pools and to
//! join ancestry names into result listings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Subject {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Topic {
    pub id: i64,
    pub subject_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Subtopic {
    pub id: i64,
    pub topic_id: i64,
    pub name: String,
}

/// A closed collection of tasks taken as a timed test.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Exam {
    pub id: i64,
    pub subject_id: i64,
    pub name: String,
}

/// A lecture-note-taking session owned by one user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct NoteTakingSession {
    pub id: i64,
    pub user_id: i64,
}

/// A lecture note wraps a task row (shared id) and belongs to a note-taking
/// session. Recap sessions draw their assignment pool from these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct LectureNote {
    pub task_id: i64,
    pub note_session_id: i64,
}
