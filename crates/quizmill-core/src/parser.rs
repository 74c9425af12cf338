//! Wire-payload validation for question and reference tuples.
//!
//! The backend ships questions as arrays of string tuples:
//! `[text, correct, ...distractors]` for multiple-choice, `[text, correct]`
//! for open-ended, `[text, reference]` for references. Everything is
//! validated here, once, at the boundary; the rest of the crate only sees
//! the typed records from [`crate::model`]. A malformed tuple is an error,
//! never a silently-skipped entry.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::model::{McQuestion, OpenQuestion, QuestionKind, QuestionSet};

fn tuple_strings(entry: &Value, index: usize) -> Result<Vec<String>> {
    let items = entry
        .as_array()
        .with_context(|| format!("entry {index}: expected an array tuple"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_str()
                .map(str::to_owned)
                .with_context(|| format!("entry {index}, field {i}: expected a string"))
        })
        .collect()
}

/// Parse a multiple-choice payload: `[[text, correct, ...distractors], ...]`.
///
/// Each tuple needs a non-blank question, a non-blank correct answer, and
/// at least one distractor.
pub fn parse_mc_payload(payload: &Value) -> Result<Vec<McQuestion>> {
    let entries = payload
        .as_array()
        .context("question payload is not an array")?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let fields = tuple_strings(entry, index)?;
            anyhow::ensure!(
                fields.len() >= 3,
                "entry {index}: multiple-choice tuple needs question, answer and at least one distractor (got {} fields)",
                fields.len()
            );
            let mut fields = fields.into_iter();
            let text = fields.next().unwrap_or_default();
            let correct_answer = fields.next().unwrap_or_default();
            anyhow::ensure!(!text.trim().is_empty(), "entry {index}: blank question text");
            anyhow::ensure!(
                !correct_answer.trim().is_empty(),
                "entry {index}: blank correct answer"
            );
            Ok(McQuestion {
                text,
                correct_answer,
                distractors: fields.collect(),
            })
        })
        .collect()
}

/// Parse an open-ended payload: `[[text, correct], ...]`.
///
/// Extra tuple fields (some backends append a dataframe id) are ignored.
pub fn parse_open_payload(payload: &Value) -> Result<Vec<OpenQuestion>> {
    let entries = payload
        .as_array()
        .context("question payload is not an array")?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let fields = tuple_strings(entry, index)?;
            anyhow::ensure!(
                fields.len() >= 2,
                "entry {index}: open tuple needs question and reference answer (got {} fields)",
                fields.len()
            );
            let mut fields = fields.into_iter();
            let text = fields.next().unwrap_or_default();
            let correct_answer = fields.next().unwrap_or_default();
            anyhow::ensure!(!text.trim().is_empty(), "entry {index}: blank question text");
            anyhow::ensure!(
                !correct_answer.trim().is_empty(),
                "entry {index}: blank reference answer"
            );
            Ok(OpenQuestion {
                text,
                correct_answer,
            })
        })
        .collect()
}

/// Parse a reference payload: `[[question_text, reference_text], ...]`.
pub fn parse_reference_payload(payload: &Value) -> Result<Vec<(String, String)>> {
    let entries = payload
        .as_array()
        .context("reference payload is not an array")?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let fields = tuple_strings(entry, index)?;
            anyhow::ensure!(
                fields.len() >= 2,
                "entry {index}: reference tuple needs question and reference text"
            );
            let mut fields = fields.into_iter();
            Ok((
                fields.next().unwrap_or_default(),
                fields.next().unwrap_or_default(),
            ))
        })
        .collect()
}

/// Match fetched reference pairs against question texts, in set order.
///
/// Missing entries stay `None`; the caller renders a fallback string.
pub fn match_references(texts: &[String], pairs: &[(String, String)]) -> Vec<Option<String>> {
    texts
        .iter()
        .map(|text| {
            pairs
                .iter()
                .find(|(question, _)| question == text)
                .map(|(_, reference)| reference.clone())
        })
        .collect()
}

/// Load and parse a question tuple file from disk (CLI `validate` and
/// offline runs).
pub fn parse_question_file(path: &Path, kind: QuestionKind) -> Result<QuestionSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question file: {}", path.display()))?;
    parse_question_str(&content, kind)
        .with_context(|| format!("invalid question file: {}", path.display()))
}

/// Parse a question tuple JSON string (useful for testing).
pub fn parse_question_str(content: &str, kind: QuestionKind) -> Result<QuestionSet> {
    let payload: Value = serde_json::from_str(content).context("payload is not valid JSON")?;
    let set = match kind {
        QuestionKind::MultipleChoice => QuestionSet::MultipleChoice {
            questions: parse_mc_payload(&payload)?,
        },
        QuestionKind::Open => QuestionSet::Open {
            questions: parse_open_payload(&payload)?,
        },
    };
    anyhow::ensure!(!set.is_empty(), "question payload is empty");
    Ok(set)
}

/// A warning from question set validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// Index of the offending question, if applicable.
    pub question_index: Option<usize>,
    /// Warning message.
    pub message: String,
}

/// Validate a question set for issues that parse fine but grade badly.
pub fn validate_question_set(set: &QuestionSet) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    // Duplicate question texts break reference lookups for open sets.
    let mut seen = std::collections::HashSet::new();
    for (index, text) in set.texts().iter().enumerate() {
        if !seen.insert(text.clone()) {
            warnings.push(ValidationWarning {
                question_index: Some(index),
                message: format!("duplicate question text: {text}"),
            });
        }
    }

    if let QuestionSet::MultipleChoice { questions } = set {
        for (index, q) in questions.iter().enumerate() {
            if q.distractors.iter().any(|d| d.trim().is_empty()) {
                warnings.push(ValidationWarning {
                    question_index: Some(index),
                    message: "blank distractor".into(),
                });
            }
            if q.distractors.contains(&q.correct_answer) {
                warnings.push(ValidationWarning {
                    question_index: Some(index),
                    message: "a distractor duplicates the correct answer".into(),
                });
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_valid_mc_payload() {
        let payload = json!([
            ["What is 2+2?", "4", "3", "5"],
            ["Capital of France?", "Paris", "Lyon", "Aucune de ces réponses."]
        ]);
        let questions = parse_mc_payload(&payload).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].correct_answer, "4");
        assert_eq!(questions[0].distractors, vec!["3", "5"]);
    }

    #[test]
    fn reject_mc_tuple_without_distractors() {
        let payload = json!([["Question?", "Answer"]]);
        let err = parse_mc_payload(&payload).unwrap_err();
        assert!(err.to_string().contains("distractor"), "{err}");
    }

    #[test]
    fn reject_non_string_fields() {
        let payload = json!([["Question?", 42, "a", "b"]]);
        assert!(parse_mc_payload(&payload).is_err());
    }

    #[test]
    fn reject_blank_question() {
        let payload = json!([["   ", "x", "y", "z"]]);
        assert!(parse_mc_payload(&payload).is_err());
    }

    #[test]
    fn parse_open_ignores_extra_fields() {
        let payload = json!([["Explain supply and demand.", "Prices balance...", "df-17"]]);
        let questions = parse_open_payload(&payload).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct_answer, "Prices balance...");
    }

    #[test]
    fn match_references_keeps_order_and_gaps() {
        let texts = vec!["q1".to_string(), "q2".to_string(), "q3".to_string()];
        let pairs = vec![
            ("q3".to_string(), "ref3".to_string()),
            ("q1".to_string(), "ref1".to_string()),
        ];
        let matched = match_references(&texts, &pairs);
        assert_eq!(
            matched,
            vec![Some("ref1".to_string()), None, Some("ref3".to_string())]
        );
    }

    #[test]
    fn empty_payload_rejected() {
        let result = parse_question_str("[]", QuestionKind::MultipleChoice);
        assert!(result.is_err());
    }

    #[test]
    fn parse_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.json");
        std::fs::write(&path, r#"[["Q?", "right", "wrong"]]"#).unwrap();

        let set = parse_question_file(&path, QuestionKind::MultipleChoice).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn validate_flags_duplicates() {
        let set = QuestionSet::MultipleChoice {
            questions: vec![
                McQuestion {
                    text: "Q".into(),
                    correct_answer: "a".into(),
                    distractors: vec!["a".into()],
                },
                McQuestion {
                    text: "Q".into(),
                    correct_answer: "b".into(),
                    distractors: vec!["c".into()],
                },
            ],
        };
        let warnings = validate_question_set(&set);
        assert!(warnings.iter().any(|w| w.message.contains("duplicate question")));
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("duplicates the correct answer")));
    }
}
