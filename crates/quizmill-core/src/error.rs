//! Evaluation error taxonomy.
//!
//! Network-sourced failures are caught at the engine boundary and folded
//! into this taxonomy; none of them escape as raw transport errors. Only
//! load exhaustion is a terminal condition for an attempt — every other
//! failure leaves the attempt in a recoverable or degraded-but-usable
//! state.

use thiserror::Error;

/// Errors surfaced by the evaluation engine.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The question source produced no usable payload within the retry
    /// budget. Terminal for the attempt.
    #[error("question source returned no data after {attempts} attempts")]
    SourceExhausted { attempts: u32 },

    /// A retryable backend failure (question load, reference fetch).
    #[error("transient source error: {0}")]
    TransientSource(String),

    /// The open-ended comparison oracle failed; the attempt returns to
    /// accepting answers and may be resubmitted.
    #[error("grading oracle error: {0}")]
    GradingOracle(String),

    /// Saving the evaluation note failed. The grading result stands.
    #[error("failed to save note: {0}")]
    Persistence(String),

    /// Study-plan generation failed. The grading result stands.
    #[error("study plan generation failed: {0}")]
    Remediation(String),

    /// The backend sent a payload that failed boundary validation.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// An operation was invoked in the wrong attempt state.
    #[error("invalid state: expected {expected}, attempt is {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Submission attempted with unanswered questions.
    #[error("cannot submit: not every question is answered")]
    Incomplete,

    /// Submission attempted while the reference fetch is still in flight.
    #[error("cannot submit while references are being fetched")]
    ReferencesPending,

    /// Submission attempted on an already-graded attempt.
    #[error("attempt is already graded; results are immutable")]
    AlreadyGraded,

    /// The attempt was cancelled via its token.
    #[error("evaluation cancelled")]
    Cancelled,
}

impl EvalError {
    /// Whether this error ends the attempt. Non-fatal errors leave the
    /// computed results (if any) intact and are reported as notices.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EvalError::SourceExhausted { .. } | EvalError::Cancelled
        )
    }
}
