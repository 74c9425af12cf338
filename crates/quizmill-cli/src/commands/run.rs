//! The `quizmill run` command.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use uuid::Uuid;

use quizmill_client::config::{create_backend, load_config_from};
use quizmill_core::engine::{AttemptState, EvaluationEngine};
use quizmill_core::grading::Outcome;
use quizmill_core::model::{EvaluationSession, Lang, QuestionKind, QuestionSet};
use quizmill_core::report::{AttemptSummary, EvaluationReport, QuestionReport};

const REFERENCE_FALLBACK: &str = "Reference not found";

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    level: Option<String>,
    course: String,
    topic: Option<String>,
    kind_str: String,
    global: bool,
    answers_path: PathBuf,
    lang_str: String,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let kind: QuestionKind = kind_str.parse().map_err(anyhow::Error::msg)?;
    let lang: Lang = lang_str.parse().map_err(anyhow::Error::msg)?;
    anyhow::ensure!(!course.trim().is_empty(), "course must not be empty");

    let answers: Vec<String> = {
        let content = std::fs::read_to_string(&answers_path)
            .with_context(|| format!("failed to read answers: {}", answers_path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("answers must be a JSON array of strings: {}", answers_path.display()))?
    };

    let config = load_config_from(config_path.as_deref())?;
    let services = create_backend(&config.backend)?;
    let level = level.unwrap_or_else(|| config.default_level.clone());

    let initial_evaluation_recorded = if global {
        match services.notes.initial_evaluation_recorded(&course).await {
            Ok(recorded) => recorded,
            Err(e) => {
                eprintln!("Warning: could not read initial-evaluation flag: {e:#}");
                false
            }
        }
    } else {
        false
    };

    let session = EvaluationSession {
        level,
        course,
        topic,
        global,
        initial_evaluation_recorded,
        lang,
    };
    let summary = AttemptSummary::from_session(&session, kind);

    let start = Instant::now();
    let mut engine = EvaluationEngine::new(session, kind, services);
    engine.load().await?;
    engine.fetch_references().await?;

    apply_answers(&mut engine, &answers)?;

    let outcome = engine.submit().await?;
    for notice in &outcome.notices {
        eprintln!("Warning: {notice}");
    }

    if global {
        if let Err(e) = engine.remediate().await {
            eprintln!("Warning: {e}");
        }
    }

    print_results(&engine, &outcome.result, outcome.message, outcome.emoji);

    let report = build_report(&engine, summary, start.elapsed().as_secs());
    let output_path = output.unwrap_or_else(|| {
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
        config.output_dir.join(format!("report-{timestamp}.json"))
    });
    report.save_json(&output_path)?;
    eprintln!("Report saved to: {}", output_path.display());

    Ok(())
}

/// Fill the answer sheet from the answers file. Multiple-choice answers are
/// given as option text and resolved against the shuffled options.
fn apply_answers(engine: &mut EvaluationEngine, answers: &[String]) -> Result<()> {
    let total = engine.questions().map(QuestionSet::len).unwrap_or(0);
    anyhow::ensure!(
        answers.len() == total,
        "answers file has {} entries for {} questions",
        answers.len(),
        total
    );

    match engine.kind() {
        QuestionKind::MultipleChoice => {
            let selections: Vec<usize> = {
                let shuffled = engine
                    .shuffled_questions()
                    .context("questions not loaded")?;
                answers
                    .iter()
                    .zip(shuffled)
                    .enumerate()
                    .map(|(index, (answer, question))| {
                        question
                            .options
                            .iter()
                            .position(|o| o == answer)
                            .with_context(|| {
                                format!(
                                    "answer {} ({answer:?}) is not an option of question {:?}; \
                                     options: {:?}",
                                    index + 1,
                                    question.text,
                                    question.options
                                )
                            })
                    })
                    .collect::<Result<_>>()?
            };
            for (index, selection) in selections.into_iter().enumerate() {
                engine.set_choice(index, selection)?;
            }
        }
        QuestionKind::Open => {
            for (index, answer) in answers.iter().enumerate() {
                engine.set_text(index, answer.clone())?;
            }
        }
    }
    Ok(())
}

fn print_results(
    engine: &EvaluationEngine,
    result: &quizmill_core::grading::GradingResult,
    message: &str,
    emoji: &str,
) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Your answer", "Verdict"]);

    let texts = engine.questions().map(QuestionSet::texts).unwrap_or_default();
    for (index, outcome) in result.outcomes.iter().enumerate() {
        let user_answer = user_answer_at(engine, index);
        let verdict = match outcome {
            Outcome::Correct => "correct",
            Outcome::Incorrect => "incorrect",
        };
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(texts.get(index).map(String::as_str).unwrap_or("")),
            Cell::new(user_answer),
            Cell::new(verdict),
        ]);
    }

    println!("{table}");
    println!(
        "\nScore: {}/{} ({:.2}%)",
        result.score, result.total, result.percentage
    );
    println!("{emoji} {message}");

    if let Some(plan) = engine.remediation_plan() {
        if !plan.is_empty() {
            println!("\nStudy plan:");
            for module in &plan.modules {
                println!("  {}", module.module);
                if let Some(narrative) = &module.narrative {
                    println!("    {narrative}");
                }
                for reference in &module.references {
                    println!("    - {reference}");
                }
            }
        }
    }
}

fn user_answer_at(engine: &EvaluationEngine, index: usize) -> String {
    let Some(sheet) = engine.answer_sheet() else {
        return String::new();
    };
    match engine.kind() {
        QuestionKind::MultipleChoice => sheet
            .choice(index)
            .and_then(|selection| {
                engine
                    .shuffled_questions()
                    .and_then(|qs| qs.get(index))
                    .and_then(|q| q.options.get(selection).cloned())
            })
            .unwrap_or_default(),
        QuestionKind::Open => sheet.text(index).unwrap_or_default().to_string(),
    }
}

fn build_report(
    engine: &EvaluationEngine,
    attempt: AttemptSummary,
    duration_secs: u64,
) -> EvaluationReport {
    let result = engine
        .grading_result()
        .cloned()
        .unwrap_or_else(|| quizmill_core::grading::grade_from_oracle(&[]));

    let correct_answers: Vec<String> = match engine.questions() {
        Some(QuestionSet::MultipleChoice { questions }) => {
            questions.iter().map(|q| q.correct_answer.clone()).collect()
        }
        Some(QuestionSet::Open { questions }) => {
            questions.iter().map(|q| q.correct_answer.clone()).collect()
        }
        None => Vec::new(),
    };
    let texts = engine.questions().map(QuestionSet::texts).unwrap_or_default();

    let questions = result
        .outcomes
        .iter()
        .enumerate()
        .map(|(index, outcome)| {
            let reference = match outcome {
                // References are remedial; correct answers don't carry one.
                Outcome::Correct => None,
                Outcome::Incorrect => Some(
                    engine
                        .references()
                        .and_then(|refs| refs.get(index).cloned().flatten())
                        .unwrap_or_else(|| REFERENCE_FALLBACK.to_string()),
                ),
            };
            QuestionReport {
                text: texts.get(index).cloned().unwrap_or_default(),
                user_answer: user_answer_at(engine, index),
                correct_answer: correct_answers.get(index).cloned().unwrap_or_default(),
                outcome: *outcome,
                reference,
            }
        })
        .collect();

    let plan = if engine.state() == AttemptState::Remediated {
        engine.remediation_plan().cloned()
    } else {
        None
    };

    EvaluationReport {
        id: Uuid::new_v4(),
        created_at: chrono::Utc::now(),
        attempt,
        result,
        questions,
        plan,
        duration_secs,
    }
}
