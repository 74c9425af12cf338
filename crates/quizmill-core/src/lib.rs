//! quizmill-core — Evaluation engine, scoring, and collaborator traits.
//!
//! This crate defines the data model, the per-attempt evaluation state
//! machine, and the async traits implemented by the `quizmill-client`
//! crate against the remote course backend.

pub mod answers;
pub mod encouragement;
pub mod engine;
pub mod error;
pub mod grading;
pub mod model;
pub mod parser;
pub mod partition;
pub mod remediation;
pub mod report;
pub mod retry;
pub mod shuffle;
pub mod traits;
