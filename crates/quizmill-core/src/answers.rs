//! In-progress answer tracking for one evaluation attempt.

use serde::{Deserialize, Serialize};

use crate::model::QuestionKind;

/// The user's selections, one slot per question. Starts all-unanswered and
/// fills monotonically; nothing clears a slot except [`AnswerSheet::reset`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerSheet {
    /// Selected option index per question (post-shuffle index).
    MultipleChoice { selections: Vec<Option<usize>> },
    /// Free-text response per question.
    Open { responses: Vec<String> },
}

impl AnswerSheet {
    pub fn new(kind: QuestionKind, len: usize) -> Self {
        match kind {
            QuestionKind::MultipleChoice => AnswerSheet::MultipleChoice {
                selections: vec![None; len],
            },
            QuestionKind::Open => AnswerSheet::Open {
                responses: vec![String::new(); len],
            },
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AnswerSheet::MultipleChoice { selections } => selections.len(),
            AnswerSheet::Open { responses } => responses.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record a multiple-choice selection. Overwrites exactly one slot.
    ///
    /// Panics on an out-of-range index or on an open-ended sheet; both are
    /// programmer errors, not runtime conditions.
    pub fn set_choice(&mut self, question_index: usize, option_index: usize) {
        match self {
            AnswerSheet::MultipleChoice { selections } => {
                selections[question_index] = Some(option_index);
            }
            AnswerSheet::Open { .. } => panic!("set_choice on an open-ended answer sheet"),
        }
    }

    /// Record a free-text response. Overwrites exactly one slot.
    ///
    /// Panics on an out-of-range index or on a multiple-choice sheet.
    pub fn set_text(&mut self, question_index: usize, response: impl Into<String>) {
        match self {
            AnswerSheet::Open { responses } => {
                responses[question_index] = response.into();
            }
            AnswerSheet::MultipleChoice { .. } => {
                panic!("set_text on a multiple-choice answer sheet")
            }
        }
    }

    /// True iff every slot is answered: a selection for multiple-choice,
    /// a non-blank (after trimming) response for open-ended.
    pub fn is_complete(&self) -> bool {
        match self {
            AnswerSheet::MultipleChoice { selections } => {
                selections.iter().all(|s| s.is_some())
            }
            AnswerSheet::Open { responses } => {
                responses.iter().all(|r| !r.trim().is_empty())
            }
        }
    }

    /// Clear every slot back to unanswered.
    pub fn reset(&mut self) {
        match self {
            AnswerSheet::MultipleChoice { selections } => {
                selections.iter_mut().for_each(|s| *s = None);
            }
            AnswerSheet::Open { responses } => {
                responses.iter_mut().for_each(String::clear);
            }
        }
    }

    /// The selected option index, if this is a multiple-choice sheet.
    pub fn choice(&self, question_index: usize) -> Option<usize> {
        match self {
            AnswerSheet::MultipleChoice { selections } => selections[question_index],
            AnswerSheet::Open { .. } => None,
        }
    }

    /// The free-text response, if this is an open-ended sheet.
    pub fn text(&self, question_index: usize) -> Option<&str> {
        match self {
            AnswerSheet::Open { responses } => Some(&responses[question_index]),
            AnswerSheet::MultipleChoice { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_incomplete_and_fills() {
        let mut sheet = AnswerSheet::new(QuestionKind::MultipleChoice, 3);
        assert!(!sheet.is_complete());

        sheet.set_choice(0, 2);
        sheet.set_choice(2, 1);
        assert!(!sheet.is_complete());

        sheet.set_choice(1, 0);
        assert!(sheet.is_complete());
        assert_eq!(sheet.choice(0), Some(2));
    }

    #[test]
    fn overwrite_replaces_one_slot() {
        let mut sheet = AnswerSheet::new(QuestionKind::MultipleChoice, 2);
        sheet.set_choice(0, 1);
        sheet.set_choice(0, 3);
        assert_eq!(sheet.choice(0), Some(3));
        assert_eq!(sheet.choice(1), None);
    }

    #[test]
    fn open_completion_requires_non_blank() {
        let mut sheet = AnswerSheet::new(QuestionKind::Open, 2);
        sheet.set_text(0, "An actual answer");
        sheet.set_text(1, "   ");
        assert!(!sheet.is_complete());

        sheet.set_text(1, "Done");
        assert!(sheet.is_complete());
    }

    #[test]
    fn reset_clears_everything() {
        let mut sheet = AnswerSheet::new(QuestionKind::Open, 1);
        sheet.set_text(0, "answer");
        assert!(sheet.is_complete());
        sheet.reset();
        assert!(!sheet.is_complete());
        assert_eq!(sheet.text(0), Some(""));
    }

    #[test]
    #[should_panic]
    fn out_of_range_index_panics() {
        let mut sheet = AnswerSheet::new(QuestionKind::MultipleChoice, 1);
        sheet.set_choice(5, 0);
    }

    #[test]
    #[should_panic]
    fn wrong_kind_panics() {
        let mut sheet = AnswerSheet::new(QuestionKind::Open, 1);
        sheet.set_choice(0, 0);
    }
}
