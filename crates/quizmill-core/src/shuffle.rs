//! Answer-option randomization.
//!
//! Options are shuffled uniformly once per attempt, then every "catch-all"
//! option (e.g. "Aucune de ces réponses.") is moved to the tail with a
//! stable partition: relative order is preserved on both sides of the
//! split. Only the initial permutation is random; the move-to-tail step is
//! deterministic given the shuffled order.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::McQuestion;

/// Catch-all answer strings that must always render after all substantive
/// options, regardless of shuffle outcome. These are the exact strings the
/// question bank emits.
pub const CATCH_ALL_ANSWERS: [&str; 11] = [
    "Aucune de ces réponses.",
    "Toutes les réponses ci-dessus",
    "Aucune des réponses ci-dessus",
    "Pas de réponse correcte",
    "Toutes ces réponses",
    "Toute ces réponses",
    "Aucune de ces réponses",
    "Toutes les réponses ci-dessus.",
    "Aucune des réponses ci-dessus.",
    "Pas de réponse correcte.",
    "Toutes ces réponses.",
];

/// Whether an option belongs to the fixed catch-all set.
pub fn is_catch_all(option: &str) -> bool {
    CATCH_ALL_ANSWERS.contains(&option)
}

/// A question with its options shuffled for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffledQuestion {
    /// The question text.
    pub text: String,
    /// Permutation of `[correct_answer, ...distractors]`, catch-all
    /// options last.
    pub options: Vec<String>,
    /// Index of the correct answer within `options`.
    pub correct_index: usize,
    /// Index of the question in the loaded (pre-shuffle) set.
    pub original_index: usize,
}

/// Shuffle one question's options and pin catch-all options to the tail.
pub fn shuffle_question<R: Rng>(
    question: &McQuestion,
    original_index: usize,
    rng: &mut R,
) -> ShuffledQuestion {
    let mut options: Vec<String> = Vec::with_capacity(1 + question.distractors.len());
    options.push(question.correct_answer.clone());
    options.extend(question.distractors.iter().cloned());
    options.shuffle(rng);

    // Stable partition: substantive options first, catch-alls last, each
    // group keeping its shuffled relative order.
    let (mut substantive, tail): (Vec<String>, Vec<String>) =
        options.into_iter().partition(|o| !is_catch_all(o));
    substantive.extend(tail);
    let options = substantive;

    let correct_index = options
        .iter()
        .position(|o| *o == question.correct_answer)
        .expect("correct answer is always one of the options");

    ShuffledQuestion {
        text: question.text.clone(),
        options,
        correct_index,
        original_index,
    }
}

/// Shuffle a whole question set. Done once per attempt; recomputed only if
/// the underlying set changes.
pub fn shuffle_questions<R: Rng>(questions: &[McQuestion], rng: &mut R) -> Vec<ShuffledQuestion> {
    questions
        .iter()
        .enumerate()
        .map(|(index, q)| shuffle_question(q, index, rng))
        .collect()
}
