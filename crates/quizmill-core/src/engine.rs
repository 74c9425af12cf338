//! The per-attempt evaluation state machine.
//!
//! One [`EvaluationEngine`] owns one attempt from question load through
//! grading and, for global evaluations, remediation planning. All backend
//! access goes through the trait objects in [`EngineServices`]; the engine
//! itself holds no network state and is driven by a single caller.
//!
//! State transitions:
//!
//! ```text
//! Loading -> Ready -> Submitting -> Graded -> Remediating -> Remediated
//!    |                    |
//!    v                    v (oracle failure)
//! LoadFailed            Ready
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::answers::AnswerSheet;
use crate::encouragement::encouragement;
use crate::error::EvalError;
use crate::grading::{grade_from_oracle, grade_multiple_choice, GradingResult};
use crate::model::{EvaluationSession, QuestionKind, QuestionSet};
use crate::parser::match_references;
use crate::partition::ModulePartition;
use crate::remediation::{build_plan, RemediationPlan};
use crate::retry::{RetryError, RetryPolicy};
use crate::shuffle::{shuffle_questions, ShuffledQuestion};
use crate::traits::{
    AnswerOracle, NoteRecord, NoteStore, OpenComparison, PlanRequest, QuestionQuery,
    QuestionSource, ReferenceSource, StudyPlanner, GLOBAL_EVALUATION_CHAPTER,
};

/// Where the attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Questions not yet loaded.
    Loading,
    /// The loader exhausted its retry budget. Terminal.
    LoadFailed,
    /// Questions loaded; accepting answers.
    Ready,
    /// A submission is in flight.
    Submitting,
    /// Graded; results are immutable.
    Graded,
    /// Remediation planning is in flight.
    Remediating,
    /// Graded with a remediation plan attached. Terminal.
    Remediated,
}

impl AttemptState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptState::Loading => "loading",
            AttemptState::LoadFailed => "load_failed",
            AttemptState::Ready => "ready",
            AttemptState::Submitting => "submitting",
            AttemptState::Graded => "graded",
            AttemptState::Remediating => "remediating",
            AttemptState::Remediated => "remediated",
        }
    }
}

/// The backend collaborators the engine drives.
#[derive(Clone)]
pub struct EngineServices {
    pub questions: Arc<dyn QuestionSource>,
    pub oracle: Arc<dyn AnswerOracle>,
    pub notes: Arc<dyn NoteStore>,
    pub planner: Arc<dyn StudyPlanner>,
    pub references: Arc<dyn ReferenceSource>,
}

/// What a successful submission hands back to the caller.
#[derive(Debug)]
pub struct SubmissionOutcome {
    pub result: GradingResult,
    /// Score-banded message in the session's language.
    pub message: &'static str,
    pub emoji: &'static str,
    /// Side-effect failures that did not affect grading (note save,
    /// initial-evaluation flag). Never contains fatal errors.
    pub notices: Vec<EvalError>,
}

/// One evaluation attempt.
pub struct EvaluationEngine {
    services: EngineServices,
    session: EvaluationSession,
    kind: QuestionKind,
    retry: RetryPolicy,
    partition: ModulePartition,
    cancel: CancellationToken,

    state: AttemptState,
    questions: Option<QuestionSet>,
    shuffled: Option<Vec<ShuffledQuestion>>,
    sheet: Option<AnswerSheet>,
    /// Per-question reference, indexed by original question index.
    /// `None` until the fetch has completed (or been waived).
    references: Option<Vec<Option<String>>>,
    references_pending: bool,
    result: Option<GradingResult>,
    plan: Option<RemediationPlan>,
    started: Option<Instant>,
}

impl EvaluationEngine {
    pub fn new(session: EvaluationSession, kind: QuestionKind, services: EngineServices) -> Self {
        Self {
            services,
            session,
            kind,
            retry: RetryPolicy::default(),
            partition: ModulePartition::default(),
            cancel: CancellationToken::new(),
            state: AttemptState::Loading,
            questions: None,
            shuffled: None,
            sheet: None,
            references: None,
            references_pending: false,
            result: None,
            plan: None,
            started: None,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_partition(mut self, partition: ModulePartition) -> Self {
        self.partition = partition;
        self
    }

    /// Token that aborts an in-flight load when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn session(&self) -> &EvaluationSession {
        &self.session
    }

    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    pub fn questions(&self) -> Option<&QuestionSet> {
        self.questions.as_ref()
    }

    /// Shuffled presentation order. `None` for open-ended attempts.
    pub fn shuffled_questions(&self) -> Option<&[ShuffledQuestion]> {
        self.shuffled.as_deref()
    }

    pub fn answer_sheet(&self) -> Option<&AnswerSheet> {
        self.sheet.as_ref()
    }

    pub fn grading_result(&self) -> Option<&GradingResult> {
        self.result.as_ref()
    }

    pub fn remediation_plan(&self) -> Option<&RemediationPlan> {
        self.plan.as_ref()
    }

    pub fn references(&self) -> Option<&[Option<String>]> {
        self.references.as_deref()
    }

    fn expect_state(&self, expected: AttemptState) -> Result<(), EvalError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(EvalError::InvalidState {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            })
        }
    }

    /// Load the question set, retrying per the policy. An empty payload
    /// counts as a failed attempt. On exhaustion or cancellation the
    /// attempt transitions to [`AttemptState::LoadFailed`] and stays there.
    pub async fn load(&mut self) -> Result<(), EvalError> {
        self.expect_state(AttemptState::Loading)?;

        let query = QuestionQuery {
            level: self.session.level.clone(),
            course: self.session.course.clone(),
            topic: if self.session.is_general() {
                None
            } else {
                self.session.topic_or_general().map(str::to_owned)
            },
        };

        let kind = self.kind;
        let source = Arc::clone(&self.services.questions);
        let loaded = self
            .retry
            .run(&self.cancel, || {
                let query = query.clone();
                let source = Arc::clone(&source);
                async move {
                    let set = match kind {
                        QuestionKind::MultipleChoice => QuestionSet::MultipleChoice {
                            questions: source.load_multiple_choice(&query).await?,
                        },
                        QuestionKind::Open => QuestionSet::Open {
                            questions: source.load_open(&query).await?,
                        },
                    };
                    if set.is_empty() {
                        anyhow::bail!("backend returned an empty question set");
                    }
                    Ok(set)
                }
            })
            .await;

        let set = match loaded {
            Ok(set) => set,
            Err(RetryError::Cancelled) => {
                self.state = AttemptState::LoadFailed;
                return Err(EvalError::Cancelled);
            }
            Err(RetryError::Exhausted { attempts, last_error }) => {
                warn!(attempts, "question load exhausted: {last_error:#}");
                self.state = AttemptState::LoadFailed;
                return Err(EvalError::SourceExhausted { attempts });
            }
        };

        info!(
            kind = %set.kind(),
            count = set.len(),
            course = %self.session.course,
            "question set loaded"
        );

        if let QuestionSet::MultipleChoice { questions } = &set {
            self.shuffled = Some(shuffle_questions(questions, &mut rand::thread_rng()));
        }
        self.sheet = Some(AnswerSheet::new(self.kind, set.len()));
        self.references_pending = self.session.global;
        self.questions = Some(set);
        self.started = Some(Instant::now());
        self.state = AttemptState::Ready;
        Ok(())
    }

    /// Fetch per-question references. Failures are tolerated: the attempt
    /// continues with no references rather than blocking on them.
    pub async fn fetch_references(&mut self) -> Result<(), EvalError> {
        self.expect_state(AttemptState::Ready)?;
        let texts = match &self.questions {
            Some(set) => set.texts(),
            None => return Err(EvalError::InvalidState {
                expected: "ready",
                actual: self.state.as_str(),
            }),
        };

        let topic = self.session.topic_or_general().map(str::to_owned);
        let fetched = self
            .services
            .references
            .fetch(self.kind, topic.as_deref())
            .await;

        self.references = Some(match fetched {
            Ok(pairs) => match_references(&texts, &pairs),
            Err(e) => {
                warn!("reference fetch failed, continuing without: {e:#}");
                vec![None; texts.len()]
            }
        });
        self.references_pending = false;
        Ok(())
    }

    pub fn set_choice(&mut self, question_index: usize, option_index: usize) -> Result<(), EvalError> {
        self.expect_state(AttemptState::Ready)?;
        if let Some(sheet) = &mut self.sheet {
            sheet.set_choice(question_index, option_index);
        }
        Ok(())
    }

    pub fn set_text(
        &mut self,
        question_index: usize,
        response: impl Into<String>,
    ) -> Result<(), EvalError> {
        self.expect_state(AttemptState::Ready)?;
        if let Some(sheet) = &mut self.sheet {
            sheet.set_text(question_index, response);
        }
        Ok(())
    }

    pub fn reset_answers(&mut self) -> Result<(), EvalError> {
        self.expect_state(AttemptState::Ready)?;
        if let Some(sheet) = &mut self.sheet {
            sheet.reset();
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.sheet.as_ref().is_some_and(AnswerSheet::is_complete)
    }

    /// Grade the attempt. Requires a complete answer sheet; for global
    /// attempts, also requires the reference fetch to have settled.
    ///
    /// Grading itself either succeeds or leaves the attempt back in
    /// `Ready`. The note save and the initial-evaluation flag run after
    /// grading and report their failures through
    /// [`SubmissionOutcome::notices`] without affecting the result.
    pub async fn submit(&mut self) -> Result<SubmissionOutcome, EvalError> {
        match self.state {
            AttemptState::Ready => {}
            AttemptState::Graded | AttemptState::Remediating | AttemptState::Remediated => {
                return Err(EvalError::AlreadyGraded)
            }
            _ => {
                return Err(EvalError::InvalidState {
                    expected: "ready",
                    actual: self.state.as_str(),
                })
            }
        }
        if !self.is_complete() {
            return Err(EvalError::Incomplete);
        }
        if self.references_pending {
            return Err(EvalError::ReferencesPending);
        }

        self.state = AttemptState::Submitting;
        let result = match self.grade().await {
            Ok(result) => result,
            Err(e) => {
                // Grading failed before any result existed; the user's
                // answers are intact, so the attempt can be resubmitted.
                self.state = AttemptState::Ready;
                return Err(e);
            }
        };

        info!(
            score = result.score,
            total = result.total,
            percentage = result.percentage,
            "attempt graded"
        );
        self.result = Some(result.clone());
        self.state = AttemptState::Graded;

        let (message, emoji) =
            encouragement(result.percentage, self.session.lang, &mut rand::thread_rng());

        let mut notices = Vec::new();
        if let Err(e) = self.save_note(&result).await {
            warn!("note save failed: {e}");
            notices.push(e);
        }
        if let Err(e) = self.flag_initial_evaluation().await {
            warn!("initial-evaluation flag update failed: {e}");
            notices.push(e);
        }

        Ok(SubmissionOutcome {
            result,
            message,
            emoji,
            notices,
        })
    }

    async fn grade(&self) -> Result<GradingResult, EvalError> {
        let sheet = self.sheet.as_ref().ok_or(EvalError::Incomplete)?;
        match &self.questions {
            Some(QuestionSet::MultipleChoice { .. }) => {
                let shuffled = self.shuffled.as_deref().unwrap_or(&[]);
                Ok(grade_multiple_choice(shuffled, sheet))
            }
            Some(QuestionSet::Open { questions }) => {
                let batch: Vec<OpenComparison> = questions
                    .iter()
                    .enumerate()
                    .map(|(index, q)| OpenComparison {
                        question: q.text.clone(),
                        user_answer: sheet.text(index).unwrap_or_default().to_string(),
                        correct_answer: q.correct_answer.clone(),
                    })
                    .collect();

                let verdicts = self
                    .services
                    .oracle
                    .compare(&batch)
                    .await
                    .map_err(|e| EvalError::GradingOracle(format!("{e:#}")))?;
                if verdicts.len() != batch.len() {
                    return Err(EvalError::MalformedPayload(format!(
                        "oracle returned {} verdicts for {} answers",
                        verdicts.len(),
                        batch.len()
                    )));
                }
                Ok(grade_from_oracle(&verdicts))
            }
            None => Err(EvalError::Incomplete),
        }
    }

    async fn save_note(&self, result: &GradingResult) -> Result<(), EvalError> {
        let chapter = match self.session.topic_or_general() {
            Some(topic) if !self.session.global => topic.to_string(),
            _ => GLOBAL_EVALUATION_CHAPTER.to_string(),
        };
        let note = NoteRecord {
            course: self.session.course.clone(),
            percentage: result.percentage,
            elapsed_secs: self.started.map(|t| t.elapsed().as_secs()).unwrap_or(0),
            chapter,
        };
        self.services
            .notes
            .save_note(&note)
            .await
            .map_err(|e| EvalError::Persistence(format!("{e:#}")))
    }

    /// First global submission for a course flips the backend's
    /// initial-evaluation flag, once.
    async fn flag_initial_evaluation(&mut self) -> Result<(), EvalError> {
        if !self.session.global || self.session.initial_evaluation_recorded {
            return Ok(());
        }
        self.services
            .notes
            .record_initial_evaluation(&self.session.course, self.kind)
            .await
            .map_err(|e| EvalError::Persistence(format!("{e:#}")))?;
        self.session.initial_evaluation_recorded = true;
        Ok(())
    }

    /// Generate the remediation plan for a graded global attempt.
    ///
    /// On planner failure the attempt falls back to `Graded`: the score
    /// stands, there is just no plan.
    pub async fn remediate(&mut self) -> Result<&RemediationPlan, EvalError> {
        self.expect_state(AttemptState::Graded)?;
        if !self.session.global {
            return Err(EvalError::Remediation(
                "only global evaluations are remediated".to_string(),
            ));
        }
        let result = self.result.as_ref().ok_or(EvalError::AlreadyGraded)?;
        let incorrect = result.incorrect_indices();

        if incorrect.is_empty() {
            debug!("perfect score, empty remediation plan");
            self.plan = Some(RemediationPlan { modules: Vec::new() });
            self.state = AttemptState::Remediated;
            return Ok(self.plan.as_ref().unwrap_or(&EMPTY_PLAN));
        }

        let texts = self.questions.as_ref().map(QuestionSet::texts).unwrap_or_default();
        let grouped = self.partition.group_by_module(&incorrect);
        let questions_by_module: BTreeMap<String, Vec<String>> = grouped
            .iter()
            .map(|(module, indices)| {
                let module_texts = indices
                    .iter()
                    .filter_map(|&i| texts.get(i).cloned())
                    .collect();
                (module.clone(), module_texts)
            })
            .collect();

        let request = PlanRequest {
            questions_by_module,
            course: self.session.course.clone(),
            level: self.session.level.clone(),
        };

        self.state = AttemptState::Remediating;
        let narratives = match self.services.planner.generate(&request).await {
            Ok(narratives) => narratives,
            Err(e) => {
                self.state = AttemptState::Graded;
                return Err(EvalError::Remediation(format!("{e:#}")));
            }
        };

        let references = self.references.clone().unwrap_or_else(|| vec![None; texts.len()]);
        let plan = build_plan(&narratives, &grouped, &references);
        info!(modules = plan.modules.len(), "remediation plan generated");
        self.plan = Some(plan);
        self.state = AttemptState::Remediated;
        Ok(self.plan.as_ref().unwrap_or(&EMPTY_PLAN))
    }
}

static EMPTY_PLAN: RemediationPlan = RemediationPlan { modules: Vec::new() };

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Lang, McQuestion, OpenQuestion};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct MockBackend {
        mc: Vec<McQuestion>,
        open: Vec<OpenQuestion>,
        load_failures: AtomicU32,
        load_calls: AtomicU32,
        verdicts: Mutex<Vec<bool>>,
        oracle_fails: AtomicBool,
        oracle_batches: Mutex<Vec<Vec<OpenComparison>>>,
        note_fails: AtomicBool,
        saved_notes: Mutex<Vec<NoteRecord>>,
        initial_calls: AtomicU32,
        narratives: Mutex<BTreeMap<String, String>>,
        planner_fails: AtomicBool,
        plan_requests: Mutex<Vec<PlanRequest>>,
        reference_pairs: Vec<(String, String)>,
    }

    #[async_trait]
    impl QuestionSource for MockBackend {
        async fn load_multiple_choice(
            &self,
            _query: &QuestionQuery,
        ) -> anyhow::Result<Vec<McQuestion>> {
            let call = self.load_calls.fetch_add(1, Ordering::SeqCst);
            if call < self.load_failures.load(Ordering::SeqCst) {
                anyhow::bail!("service warming up");
            }
            Ok(self.mc.clone())
        }

        async fn load_open(&self, _query: &QuestionQuery) -> anyhow::Result<Vec<OpenQuestion>> {
            let call = self.load_calls.fetch_add(1, Ordering::SeqCst);
            if call < self.load_failures.load(Ordering::SeqCst) {
                anyhow::bail!("service warming up");
            }
            Ok(self.open.clone())
        }
    }

    #[async_trait]
    impl AnswerOracle for MockBackend {
        async fn compare(&self, batch: &[OpenComparison]) -> anyhow::Result<Vec<bool>> {
            if self.oracle_fails.load(Ordering::SeqCst) {
                anyhow::bail!("oracle unavailable");
            }
            self.oracle_batches.lock().unwrap().push(batch.to_vec());
            Ok(self.verdicts.lock().unwrap().clone())
        }
    }

    #[async_trait]
    impl NoteStore for MockBackend {
        async fn save_note(&self, note: &NoteRecord) -> anyhow::Result<()> {
            if self.note_fails.load(Ordering::SeqCst) {
                anyhow::bail!("persistence down");
            }
            self.saved_notes.lock().unwrap().push(note.clone());
            Ok(())
        }

        async fn record_initial_evaluation(
            &self,
            _course: &str,
            _kind: QuestionKind,
        ) -> anyhow::Result<()> {
            self.initial_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn initial_evaluation_recorded(&self, _course: &str) -> anyhow::Result<bool> {
            Ok(self.initial_calls.load(Ordering::SeqCst) > 0)
        }
    }

    #[async_trait]
    impl StudyPlanner for MockBackend {
        async fn generate(
            &self,
            request: &PlanRequest,
        ) -> anyhow::Result<BTreeMap<String, String>> {
            if self.planner_fails.load(Ordering::SeqCst) {
                anyhow::bail!("planner unavailable");
            }
            self.plan_requests.lock().unwrap().push(request.clone());
            Ok(self.narratives.lock().unwrap().clone())
        }
    }

    #[async_trait]
    impl ReferenceSource for MockBackend {
        async fn fetch(
            &self,
            _kind: QuestionKind,
            _topic: Option<&str>,
        ) -> anyhow::Result<Vec<(String, String)>> {
            Ok(self.reference_pairs.clone())
        }
    }

    fn mc_question(n: usize) -> McQuestion {
        McQuestion {
            text: format!("Question {n}?"),
            correct_answer: format!("right-{n}"),
            distractors: vec![format!("wrong-{n}a"), format!("wrong-{n}b")],
        }
    }

    fn services(backend: Arc<MockBackend>) -> EngineServices {
        EngineServices {
            questions: backend.clone(),
            oracle: backend.clone(),
            notes: backend.clone(),
            planner: backend.clone(),
            references: backend,
        }
    }

    fn session() -> EvaluationSession {
        EvaluationSession {
            level: "L3".into(),
            course: "Marketing".into(),
            topic: Some("Chapter 1".into()),
            global: false,
            initial_evaluation_recorded: false,
            lang: Lang::En,
        }
    }

    fn global_session() -> EvaluationSession {
        EvaluationSession {
            topic: None,
            global: true,
            ..session()
        }
    }

    fn answer_all_correct(engine: &mut EvaluationEngine) {
        let correct: Vec<usize> = engine
            .shuffled_questions()
            .unwrap()
            .iter()
            .map(|q| q.correct_index)
            .collect();
        for (i, c) in correct.into_iter().enumerate() {
            engine.set_choice(i, c).unwrap();
        }
    }

    #[tokio::test]
    async fn load_publishes_shuffled_set() {
        let backend = Arc::new(MockBackend {
            mc: (0..8).map(mc_question).collect(),
            ..Default::default()
        });
        let mut engine =
            EvaluationEngine::new(session(), QuestionKind::MultipleChoice, services(backend));

        engine.load().await.unwrap();
        assert_eq!(engine.state(), AttemptState::Ready);
        assert_eq!(engine.questions().unwrap().len(), 8);
        assert_eq!(engine.shuffled_questions().unwrap().len(), 8);
        assert!(!engine.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn load_exhaustion_is_terminal() {
        let backend = Arc::new(MockBackend {
            mc: vec![mc_question(0)],
            load_failures: AtomicU32::new(10),
            ..Default::default()
        });
        let mut engine = EvaluationEngine::new(
            session(),
            QuestionKind::MultipleChoice,
            services(backend.clone()),
        );

        let err = engine.load().await.unwrap_err();
        assert!(matches!(err, EvalError::SourceExhausted { attempts: 4 }));
        assert!(err.is_fatal());
        assert_eq!(engine.state(), AttemptState::LoadFailed);
        assert_eq!(backend.load_calls.load(Ordering::SeqCst), 4);

        // Terminal: a second load is rejected.
        assert!(matches!(
            engine.load().await.unwrap_err(),
            EvalError::InvalidState { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_payload_counts_as_a_failed_attempt() {
        let backend = Arc::new(MockBackend::default()); // mc is empty
        let mut engine = EvaluationEngine::new(
            session(),
            QuestionKind::MultipleChoice,
            services(backend.clone()),
        );

        let err = engine.load().await.unwrap_err();
        assert!(matches!(err, EvalError::SourceExhausted { attempts: 4 }));
        assert_eq!(backend.load_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn load_recovers_within_budget() {
        let backend = Arc::new(MockBackend {
            mc: vec![mc_question(0), mc_question(1)],
            load_failures: AtomicU32::new(3),
            ..Default::default()
        });
        let mut engine = EvaluationEngine::new(
            session(),
            QuestionKind::MultipleChoice,
            services(backend.clone()),
        )
        .with_retry_policy(RetryPolicy {
            max_attempts: 4,
            delay: Duration::from_millis(1),
        });

        engine.load().await.unwrap();
        assert_eq!(engine.state(), AttemptState::Ready);
        assert_eq!(backend.load_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn submit_requires_completion() {
        let backend = Arc::new(MockBackend {
            mc: vec![mc_question(0), mc_question(1)],
            ..Default::default()
        });
        let mut engine =
            EvaluationEngine::new(session(), QuestionKind::MultipleChoice, services(backend));
        engine.load().await.unwrap();
        engine.set_choice(0, 0).unwrap();

        assert!(matches!(
            engine.submit().await.unwrap_err(),
            EvalError::Incomplete
        ));
        assert_eq!(engine.state(), AttemptState::Ready);
    }

    #[tokio::test]
    async fn mc_submission_grades_and_saves_note() {
        let backend = Arc::new(MockBackend {
            mc: (0..4).map(mc_question).collect(),
            ..Default::default()
        });
        let mut engine = EvaluationEngine::new(
            session(),
            QuestionKind::MultipleChoice,
            services(backend.clone()),
        );
        engine.load().await.unwrap();
        answer_all_correct(&mut engine);
        // Miss the last one on purpose.
        let wrong = (engine.shuffled_questions().unwrap()[3].correct_index + 1) % 3;
        engine.set_choice(3, wrong).unwrap();

        let outcome = engine.submit().await.unwrap();
        assert_eq!(outcome.result.score, 3);
        assert_eq!(outcome.result.total, 4);
        assert_eq!(outcome.result.percentage, 75.00);
        assert!(outcome.notices.is_empty());
        assert!(!outcome.message.is_empty());
        assert_eq!(engine.state(), AttemptState::Graded);

        let notes = backend.saved_notes.lock().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].course, "Marketing");
        assert_eq!(notes[0].chapter, "Chapter 1");
        assert_eq!(notes[0].percentage, 75.00);
    }

    #[tokio::test]
    async fn open_submission_batches_the_oracle() {
        let backend = Arc::new(MockBackend {
            open: vec![
                OpenQuestion {
                    text: "Define elasticity.".into(),
                    correct_answer: "Sensitivity of demand to price.".into(),
                },
                OpenQuestion {
                    text: "Define churn.".into(),
                    correct_answer: "Customer loss rate.".into(),
                },
            ],
            verdicts: Mutex::new(vec![true, false]),
            ..Default::default()
        });
        let mut engine =
            EvaluationEngine::new(session(), QuestionKind::Open, services(backend.clone()));
        engine.load().await.unwrap();
        engine.set_text(0, "Demand sensitivity to price changes").unwrap();
        engine.set_text(1, "No idea").unwrap();

        let outcome = engine.submit().await.unwrap();
        assert_eq!(outcome.result.score, 1);
        assert_eq!(outcome.result.incorrect_indices(), vec![1]);

        let batches = backend.oracle_batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[0][1].question, "Define churn.");
        assert_eq!(batches[0][1].user_answer, "No idea");
    }

    #[tokio::test]
    async fn oracle_failure_returns_to_ready() {
        let backend = Arc::new(MockBackend {
            open: vec![OpenQuestion {
                text: "Q?".into(),
                correct_answer: "A".into(),
            }],
            oracle_fails: AtomicBool::new(true),
            verdicts: Mutex::new(vec![true]),
            ..Default::default()
        });
        let mut engine =
            EvaluationEngine::new(session(), QuestionKind::Open, services(backend.clone()));
        engine.load().await.unwrap();
        engine.set_text(0, "answer").unwrap();

        let err = engine.submit().await.unwrap_err();
        assert!(matches!(err, EvalError::GradingOracle(_)));
        assert!(!err.is_fatal());
        assert_eq!(engine.state(), AttemptState::Ready);

        // Answers survived; a resubmit succeeds once the oracle is back.
        backend.oracle_fails.store(false, Ordering::SeqCst);
        let outcome = engine.submit().await.unwrap();
        assert_eq!(outcome.result.score, 1);
    }

    #[tokio::test]
    async fn note_failure_does_not_void_the_grade() {
        let backend = Arc::new(MockBackend {
            mc: vec![mc_question(0)],
            note_fails: AtomicBool::new(true),
            ..Default::default()
        });
        let mut engine =
            EvaluationEngine::new(session(), QuestionKind::MultipleChoice, services(backend));
        engine.load().await.unwrap();
        answer_all_correct(&mut engine);

        let outcome = engine.submit().await.unwrap();
        assert_eq!(outcome.result.percentage, 100.0);
        assert_eq!(outcome.notices.len(), 1);
        assert!(matches!(outcome.notices[0], EvalError::Persistence(_)));
        assert_eq!(engine.state(), AttemptState::Graded);
    }

    #[tokio::test]
    async fn resubmission_is_rejected() {
        let backend = Arc::new(MockBackend {
            mc: vec![mc_question(0)],
            ..Default::default()
        });
        let mut engine =
            EvaluationEngine::new(session(), QuestionKind::MultipleChoice, services(backend));
        engine.load().await.unwrap();
        answer_all_correct(&mut engine);
        engine.submit().await.unwrap();

        assert!(matches!(
            engine.submit().await.unwrap_err(),
            EvalError::AlreadyGraded
        ));
        assert!(matches!(
            engine.set_choice(0, 0).unwrap_err(),
            EvalError::InvalidState { .. }
        ));
    }

    #[tokio::test]
    async fn global_submit_blocks_until_references_settle() {
        let backend = Arc::new(MockBackend {
            mc: vec![mc_question(0)],
            ..Default::default()
        });
        let mut engine = EvaluationEngine::new(
            global_session(),
            QuestionKind::MultipleChoice,
            services(backend),
        );
        engine.load().await.unwrap();
        answer_all_correct(&mut engine);

        assert!(matches!(
            engine.submit().await.unwrap_err(),
            EvalError::ReferencesPending
        ));

        engine.fetch_references().await.unwrap();
        engine.submit().await.unwrap();
        assert_eq!(engine.state(), AttemptState::Graded);
    }

    #[tokio::test]
    async fn first_global_submission_flags_initial_evaluation_once() {
        let backend = Arc::new(MockBackend {
            mc: vec![mc_question(0)],
            ..Default::default()
        });
        let mut engine = EvaluationEngine::new(
            global_session(),
            QuestionKind::MultipleChoice,
            services(backend.clone()),
        );
        engine.load().await.unwrap();
        engine.fetch_references().await.unwrap();
        answer_all_correct(&mut engine);
        engine.submit().await.unwrap();
        assert_eq!(backend.initial_calls.load(Ordering::SeqCst), 1);

        // An attempt whose course already has a record never flags.
        let mut recorded = global_session();
        recorded.initial_evaluation_recorded = true;
        let mut engine2 = EvaluationEngine::new(
            recorded,
            QuestionKind::MultipleChoice,
            services(backend.clone()),
        );
        engine2.load().await.unwrap();
        engine2.fetch_references().await.unwrap();
        answer_all_correct(&mut engine2);
        engine2.submit().await.unwrap();
        assert_eq!(backend.initial_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn global_note_uses_the_sentinel_chapter() {
        let backend = Arc::new(MockBackend {
            mc: vec![mc_question(0)],
            ..Default::default()
        });
        let mut engine = EvaluationEngine::new(
            global_session(),
            QuestionKind::MultipleChoice,
            services(backend.clone()),
        );
        engine.load().await.unwrap();
        engine.fetch_references().await.unwrap();
        answer_all_correct(&mut engine);
        engine.submit().await.unwrap();

        let notes = backend.saved_notes.lock().unwrap();
        assert_eq!(notes[0].chapter, "Evalution Globale");
    }

    #[tokio::test]
    async fn remediation_groups_missed_questions_by_module() {
        let long = "n".repeat(400);
        let backend = Arc::new(MockBackend {
            mc: (0..8).map(mc_question).collect(),
            narratives: Mutex::new(
                [("Module 1".to_string(), long.clone()), ("Module 2".to_string(), "short".to_string())]
                    .into_iter()
                    .collect(),
            ),
            reference_pairs: vec![
                ("Question 0?".to_string(), "See syllabus §1".to_string()),
                ("Question 5?".to_string(), "See syllabus §2".to_string()),
            ],
            ..Default::default()
        });
        let mut engine = EvaluationEngine::new(
            global_session(),
            QuestionKind::MultipleChoice,
            services(backend.clone()),
        );
        engine.load().await.unwrap();
        engine.fetch_references().await.unwrap();
        answer_all_correct(&mut engine);
        // Miss question 0 (Module 1) and question 5 (Module 2).
        for index in [0, 5] {
            let wrong = (engine.shuffled_questions().unwrap()[index].correct_index + 1) % 3;
            engine.set_choice(index, wrong).unwrap();
        }
        engine.submit().await.unwrap();

        let plan = engine.remediate().await.unwrap().clone();
        assert_eq!(engine.state(), AttemptState::Remediated);
        assert_eq!(plan.modules.len(), 2);
        assert_eq!(plan.modules[0].module, "Module 1");
        assert_eq!(plan.modules[0].narrative.as_deref(), Some(long.as_str()));
        assert_eq!(plan.modules[0].references, vec!["See syllabus §1"]);
        assert_eq!(plan.modules[1].narrative, None);
        assert_eq!(plan.modules[1].references, vec!["See syllabus §2"]);

        let requests = backend.plan_requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].questions_by_module["Module 1"],
            vec!["Question 0?"]
        );
        assert_eq!(
            requests[0].questions_by_module["Module 2"],
            vec!["Question 5?"]
        );
    }

    #[tokio::test]
    async fn planner_failure_degrades_to_graded() {
        let backend = Arc::new(MockBackend {
            mc: vec![mc_question(0)],
            planner_fails: AtomicBool::new(true),
            ..Default::default()
        });
        let mut engine = EvaluationEngine::new(
            global_session(),
            QuestionKind::MultipleChoice,
            services(backend),
        );
        engine.load().await.unwrap();
        engine.fetch_references().await.unwrap();
        let wrong = (engine.shuffled_questions().unwrap()[0].correct_index + 1) % 3;
        engine.set_choice(0, wrong).unwrap();
        engine.submit().await.unwrap();

        let err = engine.remediate().await.unwrap_err();
        assert!(matches!(err, EvalError::Remediation(_)));
        assert!(!err.is_fatal());
        assert_eq!(engine.state(), AttemptState::Graded);
        assert!(engine.remediation_plan().is_none());
        assert!(engine.grading_result().is_some());
    }

    #[tokio::test]
    async fn perfect_score_yields_empty_plan() {
        let backend = Arc::new(MockBackend {
            mc: vec![mc_question(0)],
            ..Default::default()
        });
        let mut engine = EvaluationEngine::new(
            global_session(),
            QuestionKind::MultipleChoice,
            services(backend.clone()),
        );
        engine.load().await.unwrap();
        engine.fetch_references().await.unwrap();
        answer_all_correct(&mut engine);
        engine.submit().await.unwrap();

        let plan = engine.remediate().await.unwrap();
        assert!(plan.is_empty());
        assert_eq!(engine.state(), AttemptState::Remediated);
        assert!(backend.plan_requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn topic_attempt_is_not_remediated() {
        let backend = Arc::new(MockBackend {
            mc: vec![mc_question(0)],
            ..Default::default()
        });
        let mut engine =
            EvaluationEngine::new(session(), QuestionKind::MultipleChoice, services(backend));
        engine.load().await.unwrap();
        answer_all_correct(&mut engine);
        engine.submit().await.unwrap();

        assert!(matches!(
            engine.remediate().await.unwrap_err(),
            EvalError::Remediation(_)
        ));
        assert_eq!(engine.state(), AttemptState::Graded);
    }

    #[tokio::test]
    async fn cancellation_aborts_the_load() {
        let backend = Arc::new(MockBackend {
            mc: vec![mc_question(0)],
            load_failures: AtomicU32::new(10),
            ..Default::default()
        });
        let mut engine = EvaluationEngine::new(
            session(),
            QuestionKind::MultipleChoice,
            services(backend),
        );
        engine.cancellation_token().cancel();

        let err = engine.load().await.unwrap_err();
        assert!(matches!(err, EvalError::Cancelled));
        assert_eq!(engine.state(), AttemptState::LoadFailed);
    }
}
