//! REST implementation of the backend collaborator traits.
//!
//! The wire contract follows the course backend as deployed, endpoint
//! spellings included. Question and reference payloads arrive as arrays of
//! tuples and are validated here, at the boundary, through
//! `quizmill_core::parser` before anything downstream sees them.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use quizmill_core::model::{McQuestion, OpenQuestion, QuestionKind};
use quizmill_core::parser::{parse_mc_payload, parse_open_payload, parse_reference_payload};
use quizmill_core::traits::{
    AnswerOracle, NoteRecord, NoteStore, OpenComparison, PlanRequest, QuestionQuery,
    QuestionSource, ReferenceSource, StudyPlanner,
};

use crate::error::BackendError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Folder names the backend keys its question banks by.
fn folder_name(kind: QuestionKind) -> &'static str {
    match kind {
        QuestionKind::MultipleChoice => "QCM",
        QuestionKind::Open => "Ouverte",
    }
}

/// REST client for the evaluation backend. Implements all five collaborator
/// traits against one base URL and one user identity.
pub struct RestBackend {
    base_url: String,
    user_id: String,
    /// When set, multiple-choice sets come from the question generator
    /// endpoint instead of the pre-built data files.
    generated: bool,
    client: reqwest::Client,
}

impl RestBackend {
    pub fn new(base_url: &str, user_id: &str, generated: bool) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id: user_id.to_string(),
            generated,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_json(&self, path: &str, body: &impl Serialize) -> Result<Value, BackendError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        read_json(response).await
    }
}

fn map_transport_error(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout(DEFAULT_TIMEOUT_SECS)
    } else {
        BackendError::NetworkError(e.to_string())
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, BackendError> {
    let status = response.status().as_u16();
    if status == 404 {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::NotFound(body));
    }
    if status >= 400 {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::ApiError {
            status,
            message: body,
        });
    }
    response
        .json()
        .await
        .map_err(|e| BackendError::MalformedPayload(format!("response is not JSON: {e}")))
}

#[derive(Serialize)]
struct GenerateQuestionsRequest<'a> {
    level: &'a str,
    module: &'a str,
    #[serde(rename = "topicsName", skip_serializing_if = "Option::is_none")]
    topics_name: Option<&'a str>,
}

#[derive(Serialize)]
struct FileRequest<'a> {
    #[serde(rename = "fileName")]
    file_name: &'a str,
}

#[derive(Serialize)]
struct CompareRequest<'a> {
    #[serde(rename = "listToCorrect")]
    list_to_correct: Vec<[&'a str; 3]>,
}

#[derive(Deserialize)]
struct CompareResponse {
    results: Vec<Value>,
}

#[derive(Serialize)]
struct SaveNoteRequest<'a> {
    #[serde(rename = "courseName")]
    course_name: &'a str,
    /// Two-decimal string, as the backend stores it.
    note: String,
    time: u64,
    #[serde(rename = "chapterName")]
    chapter_name: &'a str,
}

#[derive(Serialize)]
struct InitialEvaluationRequest<'a> {
    #[serde(rename = "courseName")]
    course_name: &'a str,
    quiz: bool,
    ouverte: bool,
}

#[derive(Serialize)]
struct ReferencesRequest<'a> {
    folder: &'a str,
    #[serde(rename = "fileName", skip_serializing_if = "Option::is_none")]
    file_name: Option<&'a str>,
}

#[derive(Serialize)]
struct PlansRequest<'a> {
    questions: &'a BTreeMap<String, Vec<String>>,
    cours: &'a str,
    level: &'a str,
}

#[async_trait]
impl QuestionSource for RestBackend {
    #[instrument(skip(self, query), fields(course = %query.course))]
    async fn load_multiple_choice(
        &self,
        query: &QuestionQuery,
    ) -> anyhow::Result<Vec<McQuestion>> {
        let payload = if self.generated {
            self.post_json(
                "/evalution",
                &GenerateQuestionsRequest {
                    level: &query.level,
                    module: &query.course,
                    topics_name: query.topic.as_deref(),
                },
            )
            .await?
        } else {
            match &query.topic {
                Some(topic) => {
                    self.post_json("/qcmwithdatafram", &FileRequest { file_name: topic })
                        .await?
                }
                None => {
                    self.post_json("/evalgeneralwithdatafram/QCM", &serde_json::json!({}))
                        .await?
                }
            }
        };

        let questions =
            parse_mc_payload(&payload).map_err(|e| BackendError::MalformedPayload(format!("{e:#}")))?;
        Ok(questions)
    }

    #[instrument(skip(self, query), fields(course = %query.course))]
    async fn load_open(&self, query: &QuestionQuery) -> anyhow::Result<Vec<OpenQuestion>> {
        let payload = match &query.topic {
            Some(topic) => {
                self.post_json("/qouvertewithdatafram", &FileRequest { file_name: topic })
                    .await?
            }
            None => {
                self.post_json("/evalgeneralwithdatafram/Ouverte", &serde_json::json!({}))
                    .await?
            }
        };

        let questions = parse_open_payload(&payload)
            .map_err(|e| BackendError::MalformedPayload(format!("{e:#}")))?;
        Ok(questions)
    }
}

#[async_trait]
impl AnswerOracle for RestBackend {
    #[instrument(skip(self, batch), fields(count = batch.len()))]
    async fn compare(&self, batch: &[OpenComparison]) -> anyhow::Result<Vec<bool>> {
        let list_to_correct: Vec<[&str; 3]> = batch
            .iter()
            .map(|c| {
                [
                    c.question.as_str(),
                    c.user_answer.as_str(),
                    c.correct_answer.as_str(),
                ]
            })
            .collect();

        let payload = self
            .post_json("/compare_answers", &CompareRequest { list_to_correct })
            .await?;

        let response: CompareResponse = serde_json::from_value(payload)
            .map_err(|e| BackendError::MalformedPayload(format!("compare response: {e}")))?;

        response
            .results
            .iter()
            .map(|v| match v {
                Value::Bool(b) => Ok(*b),
                Value::String(s) => Ok(s.eq_ignore_ascii_case("true")),
                other => Err(BackendError::MalformedPayload(format!(
                    "verdict is neither bool nor string: {other}"
                ))
                .into()),
            })
            .collect()
    }
}

#[async_trait]
impl NoteStore for RestBackend {
    #[instrument(skip(self, note), fields(course = %note.course))]
    async fn save_note(&self, note: &NoteRecord) -> anyhow::Result<()> {
        self.post_json(
            &format!("/users/{}/evaluation", self.user_id),
            &SaveNoteRequest {
                course_name: &note.course,
                note: format!("{:.2}", note.percentage),
                time: note.elapsed_secs,
                chapter_name: &note.chapter,
            },
        )
        .await?;
        Ok(())
    }

    async fn record_initial_evaluation(
        &self,
        course: &str,
        kind: QuestionKind,
    ) -> anyhow::Result<()> {
        self.post_json(
            &format!("/users/{}/add_evaluation_initiale", self.user_id),
            &InitialEvaluationRequest {
                course_name: course,
                quiz: kind == QuestionKind::MultipleChoice,
                ouverte: kind == QuestionKind::Open,
            },
        )
        .await?;
        Ok(())
    }

    async fn initial_evaluation_recorded(&self, course: &str) -> anyhow::Result<bool> {
        let response = self
            .client
            .get(self.url(&format!(
                "/users/{}/get_evaluation_initiale",
                self.user_id
            )))
            .query(&[("courseName", course)])
            .send()
            .await
            .map_err(map_transport_error)?;

        // The backend answers 404 when no record exists.
        match read_json(response).await {
            Ok(_) => Ok(true),
            Err(BackendError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl StudyPlanner for RestBackend {
    #[instrument(skip(self, request), fields(modules = request.questions_by_module.len()))]
    async fn generate(&self, request: &PlanRequest) -> anyhow::Result<BTreeMap<String, String>> {
        let payload = self
            .post_json(
                "/getPlans",
                &PlansRequest {
                    questions: &request.questions_by_module,
                    cours: &request.course,
                    level: &request.level,
                },
            )
            .await?;

        let narratives: BTreeMap<String, String> = serde_json::from_value(payload)
            .map_err(|e| BackendError::MalformedPayload(format!("plans response: {e}")))?;
        Ok(narratives)
    }
}

#[async_trait]
impl ReferenceSource for RestBackend {
    #[instrument(skip(self))]
    async fn fetch(
        &self,
        kind: QuestionKind,
        topic: Option<&str>,
    ) -> anyhow::Result<Vec<(String, String)>> {
        let payload = self
            .post_json(
                "/getReferenceswithdatafram",
                &ReferencesRequest {
                    folder: folder_name(kind),
                    file_name: topic,
                },
            )
            .await?;

        let pairs = parse_reference_payload(&payload)
            .map_err(|e| BackendError::MalformedPayload(format!("{e:#}")))?;
        Ok(pairs)
    }
}
