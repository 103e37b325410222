// src/grading/aggregate.rs

use crate::grading::grader::GradingOutcome;

/// Totals over the per-question outcomes of one submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    /// Percentage of gradeable questions answered fully correctly, 2 decimals.
    pub score: f64,
    pub correct_count: u32,
    pub gradeable_count: u32,
}

/// Reduces outcomes to a score.
///
/// Only gradeable outcomes enter the denominator, and only outcomes at full
/// marks count as correct: an essay scored 83 lowers the score like a wrong
/// answer. With nothing gradeable the score is 0.
pub fn aggregate(outcomes: &[GradingOutcome]) -> Aggregate {
    let gradeable_count = outcomes.iter().filter(|o| o.is_gradeable).count() as u32;
    let correct_count = outcomes.iter().filter(|o| o.is_correct()).count() as u32;

    let score = if gradeable_count == 0 {
        0.0
    } else {
        round2(100.0 * correct_count as f64 / gradeable_count as f64)
    };

    Aggregate {
        score,
        correct_count,
        gradeable_count,
    }
}

/// Rounds to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: &str, raw_score: f64, is_gradeable: bool) -> GradingOutcome {
        GradingOutcome {
            question_id: id.to_string(),
            raw_score,
            is_gradeable,
            feedback: None,
            timed_out: false,
        }
    }

    #[test]
    fn empty_gradeable_set_scores_zero() {
        let totals = aggregate(&[outcome("1", 0.0, false), outcome("2", 0.0, false)]);
        assert_eq!(totals.score, 0.0);
        assert_eq!(totals.gradeable_count, 0);
        assert_eq!(totals.correct_count, 0);

        assert_eq!(aggregate(&[]).score, 0.0);
    }

    #[test]
    fn partial_open_ended_score_is_not_correct() {
        let totals = aggregate(&[
            outcome("1", 100.0, true),
            outcome("2", 83.0, true),
            outcome("3", 0.0, false),
        ]);

        assert_eq!(totals.gradeable_count, 2);
        assert_eq!(totals.correct_count, 1);
        assert_eq!(totals.score, 50.0);
    }

    #[test]
    fn score_is_rounded_to_two_decimals() {
        let totals = aggregate(&[
            outcome("1", 100.0, true),
            outcome("2", 0.0, true),
            outcome("3", 0.0, true),
        ]);
        assert_eq!(totals.score, 33.33);

        let totals = aggregate(&[
            outcome("1", 100.0, true),
            outcome("2", 100.0, true),
            outcome("3", 0.0, true),
        ]);
        assert_eq!(totals.score, 66.67);
    }

    #[test]
    fn order_of_outcomes_does_not_matter() {
        let mut outcomes = vec![
            outcome("1", 100.0, true),
            outcome("2", 0.0, true),
            outcome("3", 100.0, false),
            outcome("4", 100.0, true),
        ];
        let forward = aggregate(&outcomes);
        outcomes.reverse();
        assert_eq!(aggregate(&outcomes), forward);
    }
}
