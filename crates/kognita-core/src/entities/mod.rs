//! Entity structs for the Kognita domain objects.
//!
//! Each entity maps to a table in the libSQL database. All structs derive
//! `Serialize`, `Deserialize`, and `JsonSchema` for JSON roundtrip and
//! schema generation.

mod answer;
mod catalog;
mod result;
mod session;
mod task;

pub use answer::TaskAnswer;
pub use catalog::{Exam, LectureNote, NoteTakingSession, Subject, Subtopic, Topic};
pub use result::TaskResult;
pub use session::{RecapTask, Session, SessionTask, SessionVariant};
pub use task::{Task, TaskChoice};
