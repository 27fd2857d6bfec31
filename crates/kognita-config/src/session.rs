//! Session engine tuning knobs.
//!
//! The defaults reproduce the production behavior: a 2-in-3 bias toward
//! spaced-repetition review, +5 goal extensions, exam sessions capped at a
//! 5-task goal, and two tasks pre-assigned to recap sessions.

use serde::{Deserialize, Serialize};

const fn default_bias() -> f64 {
    2.0 / 3.0
}

const fn default_extend_step() -> i64 {
    5
}

const fn default_exam_goal_cap() -> i64 {
    5
}

const fn default_recap_initial_assignments() -> u32 {
    2
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Probability that practice assignment consults the spaced-repetition
    /// candidate query before falling back to a uniform random pick.
    #[serde(default = "default_bias")]
    pub spaced_repetition_bias: f64,

    /// How much `extend` raises a session's task goal.
    #[serde(default = "default_extend_step")]
    pub extend_step: i64,

    /// Exam sessions never start with a goal above this, however many tasks
    /// the exam holds.
    #[serde(default = "default_exam_goal_cap")]
    pub exam_goal_cap: i64,

    /// Number of tasks assigned to a recap session at creation.
    #[serde(default = "default_recap_initial_assignments")]
    pub recap_initial_assignments: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            spaced_repetition_bias: default_bias(),
            extend_step: default_extend_step(),
            exam_goal_cap: default_exam_goal_cap(),
            recap_initial_assignments: default_recap_initial_assignments(),
        }
    }
}
