//! Mock backend for testing and offline runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use quizmill_core::model::{McQuestion, OpenQuestion, QuestionKind};
use quizmill_core::traits::{
    AnswerOracle, NoteRecord, NoteStore, OpenComparison, PlanRequest, QuestionQuery,
    QuestionSource, ReferenceSource, StudyPlanner,
};

/// A scriptable in-process backend implementing all five collaborator
/// traits, for engine tests and offline CLI runs.
///
/// Open-ended answers are judged by trimmed, case-insensitive equality
/// unless a verdict script is installed.
#[derive(Default)]
pub struct MockBackend {
    mc_questions: Vec<McQuestion>,
    open_questions: Vec<OpenQuestion>,
    reference_pairs: Vec<(String, String)>,
    /// Fail this many load calls before succeeding.
    load_failures: AtomicU32,
    load_calls: AtomicU32,
    scripted_verdicts: Mutex<Option<Vec<bool>>>,
    saved_notes: Mutex<Vec<NoteRecord>>,
    initial_evaluations: Mutex<Vec<(String, QuestionKind)>>,
    plan_requests: Mutex<Vec<PlanRequest>>,
}

impl MockBackend {
    pub fn new(mc_questions: Vec<McQuestion>, open_questions: Vec<OpenQuestion>) -> Self {
        Self {
            mc_questions,
            open_questions,
            ..Default::default()
        }
    }

    /// A small fixed course, enough for an end-to-end offline run: eight
    /// multiple-choice and four open-ended questions with references.
    pub fn with_sample_course() -> Self {
        let mc_questions = (1..=8)
            .map(|n| McQuestion {
                text: format!("Sample question {n}: which option is correct?"),
                correct_answer: format!("Option A{n}"),
                distractors: vec![
                    format!("Option B{n}"),
                    format!("Option C{n}"),
                    "Aucune de ces réponses.".to_string(),
                ],
            })
            .collect::<Vec<_>>();
        let open_questions = (1..=4)
            .map(|n| OpenQuestion {
                text: format!("Sample open question {n}: explain the concept."),
                correct_answer: format!("Reference explanation {n}"),
            })
            .collect();
        let reference_pairs = mc_questions
            .iter()
            .map(|q| (q.text.clone(), format!("See the course notes for: {}", q.text)))
            .collect();

        Self {
            mc_questions,
            open_questions,
            reference_pairs,
            ..Default::default()
        }
    }

    pub fn with_references(mut self, pairs: Vec<(String, String)>) -> Self {
        self.reference_pairs = pairs;
        self
    }

    /// Fail the first `n` load calls.
    pub fn fail_loads(self, n: u32) -> Self {
        self.load_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Fix the oracle's verdicts instead of judging by equality.
    pub fn script_verdicts(self, verdicts: Vec<bool>) -> Self {
        *self.scripted_verdicts.lock().unwrap() = Some(verdicts);
        self
    }

    pub fn load_calls(&self) -> u32 {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn saved_notes(&self) -> Vec<NoteRecord> {
        self.saved_notes.lock().unwrap().clone()
    }

    pub fn initial_evaluations(&self) -> Vec<(String, QuestionKind)> {
        self.initial_evaluations.lock().unwrap().clone()
    }

    pub fn plan_requests(&self) -> Vec<PlanRequest> {
        self.plan_requests.lock().unwrap().clone()
    }

    fn check_load(&self) -> anyhow::Result<()> {
        let call = self.load_calls.fetch_add(1, Ordering::SeqCst);
        if call < self.load_failures.load(Ordering::SeqCst) {
            anyhow::bail!("scripted load failure {}", call + 1);
        }
        Ok(())
    }
}

#[async_trait]
impl QuestionSource for MockBackend {
    async fn load_multiple_choice(
        &self,
        _query: &QuestionQuery,
    ) -> anyhow::Result<Vec<McQuestion>> {
        self.check_load()?;
        Ok(self.mc_questions.clone())
    }

    async fn load_open(&self, _query: &QuestionQuery) -> anyhow::Result<Vec<OpenQuestion>> {
        self.check_load()?;
        Ok(self.open_questions.clone())
    }
}

#[async_trait]
impl AnswerOracle for MockBackend {
    async fn compare(&self, batch: &[OpenComparison]) -> anyhow::Result<Vec<bool>> {
        if let Some(verdicts) = self.scripted_verdicts.lock().unwrap().clone() {
            return Ok(verdicts);
        }
        Ok(batch
            .iter()
            .map(|c| {
                c.user_answer
                    .trim()
                    .eq_ignore_ascii_case(c.correct_answer.trim())
            })
            .collect())
    }
}

#[async_trait]
impl NoteStore for MockBackend {
    async fn save_note(&self, note: &NoteRecord) -> anyhow::Result<()> {
        self.saved_notes.lock().unwrap().push(note.clone());
        Ok(())
    }

    async fn record_initial_evaluation(
        &self,
        course: &str,
        kind: QuestionKind,
    ) -> anyhow::Result<()> {
        self.initial_evaluations
            .lock()
            .unwrap()
            .push((course.to_string(), kind));
        Ok(())
    }

    async fn initial_evaluation_recorded(&self, course: &str) -> anyhow::Result<bool> {
        Ok(self
            .initial_evaluations
            .lock()
            .unwrap()
            .iter()
            .any(|(c, _)| c == course))
    }
}

#[async_trait]
impl StudyPlanner for MockBackend {
    async fn generate(&self, request: &PlanRequest) -> anyhow::Result<BTreeMap<String, String>> {
        self.plan_requests.lock().unwrap().push(request.clone());
        // Narratives long enough to clear the plan's placeholder filter.
        Ok(request
            .questions_by_module
            .iter()
            .map(|(module, questions)| {
                let narrative = format!(
                    "{module}: review the material behind these questions: {}. {}",
                    questions.join("; "),
                    "Work back through the worked examples, restate each definition in \
                     your own words, and redo the exercises for this module until you \
                     can answer without consulting the notes. Then attempt the practice \
                     set once more and compare your reasoning against the corrections."
                );
                (module.clone(), narrative)
            })
            .collect())
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
