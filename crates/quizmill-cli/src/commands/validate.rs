//! The `quizmill validate` command.

use std::path::PathBuf;

use anyhow::Result;

use quizmill_core::model::QuestionKind;
use quizmill_core::parser::{parse_question_file, validate_question_set};

pub fn execute(questions_path: PathBuf, kind_str: String) -> Result<()> {
    let kind: QuestionKind = kind_str.parse().map_err(anyhow::Error::msg)?;
    let set = parse_question_file(&questions_path, kind)?;

    println!(
        "Question set: {} ({} questions, {kind})",
        questions_path.display(),
        set.len()
    );

    let warnings = validate_question_set(&set);
    for w in &warnings {
        let prefix = w
            .question_index
            .map(|index| format!("  [question {}]", index + 1))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Question set valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
