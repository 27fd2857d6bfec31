//! Multiple-choice answer evaluation.
//!
//! Given the learner's selected choice ids and the task's full choice set,
//! produce a per-choice breakdown plus two scores:
//!
//! - **forgiving** — `correct selections / total correct choices`; wrong
//!   extra selections cost nothing.
//! - **unforgiving** — wrong selections subtract from the correct count
//!   before dividing, floored at zero.
//!
//! Both are always computed; which one is persisted is the caller's call.
//! The breakdown also lists correct choices the learner missed, so a review
//! screen can highlight the full answer key.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::TaskChoice;

/// Verdict for one choice id that appears in the evaluation breakdown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ChoiceVerdict {
    pub choice_id: i64,
    pub is_correct: bool,
}

/// Full evaluation of a multiple-choice submission.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ChoiceEvaluation {
    pub choices: Vec<ChoiceVerdict>,
    pub forgiving_score: f64,
    pub unforgiving_score: f64,
}

/// Evaluate `selected` choice ids against the task's choice set.
///
/// Duplicate selections of the same correct choice count once; the
/// duplicates land in the breakdown as incorrect. A task with no correct
/// choices scores zero under both modes.
#[must_use]
pub fn evaluate_choices(selected: &[i64], choices: &[TaskChoice]) -> ChoiceEvaluation {
    let mut missing: Vec<&TaskChoice> = choices.iter().filter(|c| c.is_correct).collect();
    let total_correct = missing.len();

    let mut number_correct = 0usize;
    let mut number_incorrect = 0usize;
    let mut verdicts = Vec::with_capacity(selected.len() + total_correct);

    for &choice_id in selected {
        if let Some(pos) = missing.iter().position(|c| c.id == choice_id) {
            number_correct += 1;
            missing.remove(pos);
            verdicts.push(ChoiceVerdict {
                choice_id,
                is_correct: true,
            });
        } else {
            number_incorrect += 1;
            verdicts.push(ChoiceVerdict {
                choice_id,
                is_correct: false,
            });
        }
    }

    // Unselected correct choices still show up in the breakdown.
    verdicts.extend(missing.iter().map(|c| ChoiceVerdict {
        choice_id: c.id,
        is_correct: true,
    }));

    let (forgiving, unforgiving) = if total_correct == 0 {
        (0.0, 0.0)
    } else {
        #[allow(clippy::cast_precision_loss)]
        let denom = total_correct as f64;
        #[allow(clippy::cast_precision_loss)]
        let forgiving = number_correct as f64 / denom;
        #[allow(clippy::cast_precision_loss)]
        let unforgiving = number_correct.saturating_sub(number_incorrect) as f64 / denom;
        (forgiving, unforgiving)
    };

    ChoiceEvaluation {
        choices: verdicts,
        forgiving_score: forgiving,
        unforgiving_score: unforgiving,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice(id: i64, is_correct: bool) -> TaskChoice {
        TaskChoice {
            id,
            task_id: 1,
            content: format!("choice {id}"),
            is_correct,
        }
    }

    fn three_of_four() -> Vec<TaskChoice> {
        vec![
            choice(1, true),
            choice(2, true),
            choice(3, true),
            choice(4, false),
        ]
    }

    #[test]
    fn all_correct_selected_scores_one() {
        let eval = evaluate_choices(&[1, 2, 3], &three_of_four());
        assert!((eval.forgiving_score - 1.0).abs() < f64::EPSILON);
        assert!((eval.unforgiving_score - 1.0).abs() < f64::EPSILON);
        assert!(eval.choices.iter().all(|v| v.is_correct));
    }

    #[test]
    fn forgiving_ignores_wrong_extras() {
        let eval = evaluate_choices(&[1, 2, 4], &three_of_four());
        assert!((eval.forgiving_score - 2.0 / 3.0).abs() < 1e-9);
        assert!((eval.unforgiving_score - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn unforgiving_floors_at_zero() {
        let choices = vec![choice(1, true), choice(2, false), choice(3, false)];
        let eval = evaluate_choices(&[2, 3], &choices);
        assert!((eval.forgiving_score - 0.0).abs() < f64::EPSILON);
        assert!((eval.unforgiving_score - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn breakdown_lists_missed_correct_choices() {
        let eval = evaluate_choices(&[1], &three_of_four());
        let ids: Vec<i64> = eval.choices.iter().map(|v| v.choice_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(eval.choices.iter().all(|v| v.is_correct));
        assert!((eval.forgiving_score - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_selection_counts_once() {
        let eval = evaluate_choices(&[1, 1], &three_of_four());
        assert!((eval.forgiving_score - 1.0 / 3.0).abs() < 1e-9);
        // Second occurrence is an incorrect verdict.
        assert_eq!(
            eval.choices
                .iter()
                .filter(|v| v.choice_id == 1 && !v.is_correct)
                .count(),
            1
        );
    }

    #[test]
    fn no_correct_choices_scores_zero() {
        let choices = vec![choice(1, false)];
        let eval = evaluate_choices(&[1], &choices);
        assert!((eval.forgiving_score - 0.0).abs() < f64::EPSILON);
        assert!((eval.unforgiving_score - 0.0).abs() < f64::EPSILON);
    }
}
