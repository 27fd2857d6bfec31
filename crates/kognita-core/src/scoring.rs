//! Score compression and the spaced-repetition revisit curve.
//!
//! Pure functions, safe to call from any task. The curve re-surfaces weak
//! material quickly and pushes well-known material far out:
//!
//! ```text
//! score < 0.2        → 1 day
//! 0.2 ≤ score < 0.4  → 3 days
//! 0.4 ≤ score < 0.6  → 7 days
//! 0.6 ≤ score < 0.8  → 16 days
//! 0.8 ≤ score ≤ 1.0  → 30 days
//! ```

use chrono::{DateTime, Duration, Utc};
use std::ops::RangeInclusive;

/// Rescale a raw band value into `[0, 1]`.
///
/// Used when a typing task's self-assessed knowledge value (reported on the
/// 0–4 band) must be stored compatibly with the continuous result score.
/// Monotone non-decreasing in `score`; values outside the band clamp to the
/// nearest bound. A degenerate band (upper ≤ lower) compresses to 0.
#[must_use]
pub fn compress(score: f64, range: &RangeInclusive<f64>) -> f64 {
    let span = range.end() - range.start();
    if span <= 0.0 {
        return 0.0;
    }
    ((score - range.start()) / span).clamp(0.0, 1.0)
}

/// Days until a task with this normalized score should be revisited.
///
/// Monotone non-decreasing on `[0, 1]`. Scores outside the unit interval
/// fall into the catch-all 1-day bucket.
#[must_use]
pub fn days_until_review(score: f64) -> u32 {
    if (0.8..=1.0).contains(&score) {
        30
    } else if (0.6..0.8).contains(&score) {
        16
    } else if (0.4..0.6).contains(&score) {
        7
    } else if (0.2..0.4).contains(&score) {
        3
    } else {
        1
    }
}

/// The absolute revisit date for a result scored `score` at `now`.
#[must_use]
pub fn revisit_date(score: f64, now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(i64::from(days_until_review(score)))
}
