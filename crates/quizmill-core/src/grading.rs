//! Grading: outcome classification and score arithmetic.
//!
//! Multiple-choice grading is purely local (selection vs the shuffled
//! correct index). Open-ended grading applies the verdict vector returned
//! by the remote comparison oracle. Either way the result is created once
//! per attempt and never mutated.

use serde::{Deserialize, Serialize};

use crate::answers::AnswerSheet;
use crate::shuffle::ShuffledQuestion;

/// Verdict for a single question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Correct,
    Incorrect,
}

/// The graded outcome of one submission. Immutable once created;
/// re-submission is disallowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    /// Per-question verdicts, in set order.
    pub outcomes: Vec<Outcome>,
    /// Count of correct answers.
    pub score: usize,
    /// Total question count.
    pub total: usize,
    /// `score / total * 100`, rounded to two decimals.
    pub percentage: f64,
}

impl GradingResult {
    fn from_outcomes(outcomes: Vec<Outcome>) -> Self {
        let total = outcomes.len();
        let score = outcomes.iter().filter(|o| **o == Outcome::Correct).count();
        GradingResult {
            outcomes,
            score,
            total,
            percentage: percentage(score, total),
        }
    }

    /// Indices of incorrectly answered questions, in set order. These are
    /// pre-shuffle (original) indices since question order is preserved.
    pub fn incorrect_indices(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| **o == Outcome::Incorrect)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Two-decimal percentage: `round(score / total * 100, 2)`.
pub fn percentage(score: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (score as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
}

/// Grade a multiple-choice attempt locally.
///
/// A question is correct iff the user's selected option index equals the
/// shuffled correct index. Requires a complete answer sheet.
pub fn grade_multiple_choice(
    questions: &[ShuffledQuestion],
    sheet: &AnswerSheet,
) -> GradingResult {
    assert_eq!(questions.len(), sheet.len(), "sheet/question length mismatch");
    let outcomes = questions
        .iter()
        .enumerate()
        .map(|(index, q)| match sheet.choice(index) {
            Some(selected) if selected == q.correct_index => Outcome::Correct,
            _ => Outcome::Incorrect,
        })
        .collect();
    GradingResult::from_outcomes(outcomes)
}

/// Build a grading result from the oracle's parallel verdict vector.
pub fn grade_from_oracle(verdicts: &[bool]) -> GradingResult {
    let outcomes = verdicts
        .iter()
        .map(|&ok| if ok { Outcome::Correct } else { Outcome::Incorrect })
        .collect();
    GradingResult::from_outcomes(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionKind;

    fn shuffled(correct_index: usize, original_index: usize) -> ShuffledQuestion {
        ShuffledQuestion {
            text: format!("q{original_index}"),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_index,
            original_index,
        }
    }

    #[test]
    fn mc_grading_matches_correct_index() {
        let questions = vec![shuffled(1, 0), shuffled(0, 1), shuffled(2, 2)];
        let mut sheet = AnswerSheet::new(QuestionKind::MultipleChoice, 3);
        sheet.set_choice(0, 1); // correct
        sheet.set_choice(1, 2); // incorrect
        sheet.set_choice(2, 2); // correct

        let result = grade_multiple_choice(&questions, &sheet);
        assert_eq!(
            result.outcomes,
            vec![Outcome::Correct, Outcome::Incorrect, Outcome::Correct]
        );
        assert_eq!(result.score, 2);
        assert_eq!(result.total, 3);
        assert_eq!(result.incorrect_indices(), vec![1]);
    }

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert_eq!(percentage(18, 24), 75.00);
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(0, 5), 0.0);
        assert_eq!(percentage(5, 5), 100.0);
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn oracle_verdicts_map_to_outcomes() {
        let result = grade_from_oracle(&[true, false, true, true]);
        assert_eq!(result.score, 3);
        assert_eq!(result.percentage, 75.00);
        assert_eq!(result.incorrect_indices(), vec![1]);
    }
}
