//! Core data model types for quizmill.
//!
//! Question payloads arrive from the backend as untyped tuples; they are
//! validated once at the network boundary (see [`crate::parser`]) and held
//! as these records for the rest of the attempt.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A multiple-choice question as loaded from the question service.
///
/// Identity is positional: the index in the loaded set. Immutable once
/// loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McQuestion {
    /// The question text.
    pub text: String,
    /// The single correct answer.
    pub correct_answer: String,
    /// Incorrect options shown alongside the correct answer.
    pub distractors: Vec<String>,
}

/// An open-ended question: free-text answer judged by the remote oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenQuestion {
    /// The question text.
    pub text: String,
    /// The reference answer the oracle compares against.
    pub correct_answer: String,
}

/// A loaded question set. Never empty once published by the loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionSet {
    MultipleChoice { questions: Vec<McQuestion> },
    Open { questions: Vec<OpenQuestion> },
}

impl QuestionSet {
    pub fn len(&self) -> usize {
        match self {
            QuestionSet::MultipleChoice { questions } => questions.len(),
            QuestionSet::Open { questions } => questions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionSet::MultipleChoice { .. } => QuestionKind::MultipleChoice,
            QuestionSet::Open { .. } => QuestionKind::Open,
        }
    }

    /// Question texts in set order, used for reference lookups and the
    /// open-ended oracle batch.
    pub fn texts(&self) -> Vec<String> {
        match self {
            QuestionSet::MultipleChoice { questions } => {
                questions.iter().map(|q| q.text.clone()).collect()
            }
            QuestionSet::Open { questions } => {
                questions.iter().map(|q| q.text.clone()).collect()
            }
        }
    }
}

/// Which kind of evaluation is being taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    Open,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::MultipleChoice => write!(f, "qcm"),
            QuestionKind::Open => write!(f, "ouverte"),
        }
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "qcm" | "mc" | "multiple-choice" => Ok(QuestionKind::MultipleChoice),
            "ouverte" | "open" => Ok(QuestionKind::Open),
            other => Err(format!("unknown question kind: {other}")),
        }
    }
}

/// Display language for user-facing result text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    En,
    Fr,
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lang::En => write!(f, "en"),
            Lang::Fr => write!(f, "fr"),
        }
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "english" => Ok(Lang::En),
            "fr" | "french" | "francais" | "français" => Ok(Lang::Fr),
            other => Err(format!("unknown language: {other}")),
        }
    }
}

/// Everything the engine needs to know about the current attempt, passed
/// explicitly into the constructor. There is no ambient/global selection
/// state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSession {
    /// Study level identifier (e.g. "L3", "M1"). Required, non-empty.
    pub level: String,
    /// Course name. Required, non-empty.
    pub course: String,
    /// Selected topic. `None` (or empty) requests a course-wide general
    /// question set instead of a topic-scoped one.
    #[serde(default)]
    pub topic: Option<String>,
    /// Whether this attempt is the course-wide "global evaluation" variant,
    /// which additionally triggers remediation planning after grading.
    #[serde(default)]
    pub global: bool,
    /// Whether an initial evaluation has already been recorded for this
    /// course. When false, the first global submission fires a one-time
    /// flag update.
    #[serde(default)]
    pub initial_evaluation_recorded: bool,
    /// Language for encouragement/result text.
    #[serde(default = "default_lang")]
    pub lang: Lang,
}

fn default_lang() -> Lang {
    Lang::En
}

impl EvaluationSession {
    /// Topic normalized so that an empty string means "no topic".
    pub fn topic_or_general(&self) -> Option<&str> {
        match self.topic.as_deref() {
            Some("") | None => None,
            Some(t) => Some(t),
        }
    }

    /// True when the loader must request a general (course-wide) set.
    pub fn is_general(&self) -> bool {
        self.global || self.topic_or_general().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display_and_parse() {
        assert_eq!(QuestionKind::MultipleChoice.to_string(), "qcm");
        assert_eq!(QuestionKind::Open.to_string(), "ouverte");
        assert_eq!(
            "qcm".parse::<QuestionKind>().unwrap(),
            QuestionKind::MultipleChoice
        );
        assert_eq!("open".parse::<QuestionKind>().unwrap(), QuestionKind::Open);
        assert!("essay".parse::<QuestionKind>().is_err());
    }

    #[test]
    fn lang_parse() {
        assert_eq!("fr".parse::<Lang>().unwrap(), Lang::Fr);
        assert_eq!("English".parse::<Lang>().unwrap(), Lang::En);
        assert!("de".parse::<Lang>().is_err());
    }

    #[test]
    fn empty_topic_means_general() {
        let mut session = EvaluationSession {
            level: "L3".into(),
            course: "Marketing".into(),
            topic: Some(String::new()),
            global: false,
            initial_evaluation_recorded: false,
            lang: Lang::Fr,
        };
        assert!(session.is_general());
        assert_eq!(session.topic_or_general(), None);

        session.topic = Some("Chapter 1".into());
        assert!(!session.is_general());
        assert_eq!(session.topic_or_general(), Some("Chapter 1"));

        // Global evaluation is course-wide even with a topic selected.
        session.global = true;
        assert!(session.is_general());
    }

    #[test]
    fn question_set_serde_roundtrip() {
        let set = QuestionSet::MultipleChoice {
            questions: vec![McQuestion {
                text: "What is 2+2?".into(),
                correct_answer: "4".into(),
                distractors: vec!["3".into(), "5".into()],
            }],
        };
        let json = serde_json::to_string(&set).unwrap();
        let back: QuestionSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
        assert_eq!(back.len(), 1);
        assert_eq!(back.kind(), QuestionKind::MultipleChoice);
    }
}
