//! Collaborator traits for the remote evaluation backend.
//!
//! These async traits are implemented by the `quizmill-client` crate
//! against the REST backend, and by in-process mocks in tests. The engine
//! only ever talks to the backend through them.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{McQuestion, OpenQuestion, QuestionKind};

// ---------------------------------------------------------------------------
// Question source
// ---------------------------------------------------------------------------

/// Identifies which question set to load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionQuery {
    /// Study level (e.g. "L3").
    pub level: String,
    /// Course name.
    pub course: String,
    /// Topic scope. `None` requests the course-wide general set.
    #[serde(default)]
    pub topic: Option<String>,
}

/// Supplies question sets. One fetch per call; retrying is the caller's
/// concern.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn load_multiple_choice(
        &self,
        query: &QuestionQuery,
    ) -> anyhow::Result<Vec<McQuestion>>;

    async fn load_open(&self, query: &QuestionQuery) -> anyhow::Result<Vec<OpenQuestion>>;
}

// ---------------------------------------------------------------------------
// Grading oracle
// ---------------------------------------------------------------------------

/// One open-ended answer to be judged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenComparison {
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
}

/// Judges open-ended answers against their reference answers.
///
/// Called once per submission with the entire batch; the result vector is
/// parallel to the input.
#[async_trait]
pub trait AnswerOracle: Send + Sync {
    async fn compare(&self, batch: &[OpenComparison]) -> anyhow::Result<Vec<bool>>;
}

// ---------------------------------------------------------------------------
// Note persistence
// ---------------------------------------------------------------------------

/// Sentinel chapter name the backend expects for course-wide evaluations.
/// The spelling is the backend's, not ours.
pub const GLOBAL_EVALUATION_CHAPTER: &str = "Evalution Globale";

/// An evaluation note to persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRecord {
    pub course: String,
    /// Two-decimal percentage score.
    pub percentage: f64,
    /// Elapsed evaluation time in seconds.
    pub elapsed_secs: u64,
    /// Chapter/topic name, or [`GLOBAL_EVALUATION_CHAPTER`].
    pub chapter: String,
}

/// Persists evaluation outcomes. Failures here are non-fatal to grading.
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn save_note(&self, note: &NoteRecord) -> anyhow::Result<()>;

    /// Flag that the course's initial evaluation has been taken. Fired at
    /// most once per course, on the first global submission.
    async fn record_initial_evaluation(
        &self,
        course: &str,
        kind: QuestionKind,
    ) -> anyhow::Result<()>;

    /// Whether an initial evaluation is already on record for the course.
    async fn initial_evaluation_recorded(&self, course: &str) -> anyhow::Result<bool>;
}

// ---------------------------------------------------------------------------
// Study planner
// ---------------------------------------------------------------------------

/// Request for a generated study plan, grouped by module name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    /// Missed question texts keyed by module name.
    pub questions_by_module: BTreeMap<String, Vec<String>>,
    pub course: String,
    pub level: String,
}

/// Generates per-module study narratives for missed questions.
#[async_trait]
pub trait StudyPlanner: Send + Sync {
    async fn generate(&self, request: &PlanRequest) -> anyhow::Result<BTreeMap<String, String>>;
}

// ---------------------------------------------------------------------------
// Reference source
// ---------------------------------------------------------------------------

/// Fetches `(question_text, reference_text)` pairs for a question folder.
/// Purely informational; partial results are tolerated downstream.
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn fetch(
        &self,
        kind: QuestionKind,
        topic: Option<&str>,
    ) -> anyhow::Result<Vec<(String, String)>>;
}
