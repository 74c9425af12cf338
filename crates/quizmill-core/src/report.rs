//! Evaluation report types with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::grading::{GradingResult, Outcome};
use crate::model::{EvaluationSession, QuestionKind};
use crate::remediation::RemediationPlan;

/// A complete record of one graded evaluation attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Summary of the attempt.
    pub attempt: AttemptSummary,
    /// Per-question verdicts and aggregate score.
    pub result: GradingResult,
    /// The questions in set order, with the user's answer and verdict.
    pub questions: Vec<QuestionReport>,
    /// Remediation plan, when one was generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<RemediationPlan>,
    /// Wall-clock duration of the attempt in seconds.
    pub duration_secs: u64,
}

/// Summary of the attempt (without the full question definitions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub level: String,
    pub course: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub kind: QuestionKind,
    pub global: bool,
}

impl AttemptSummary {
    pub fn from_session(session: &EvaluationSession, kind: QuestionKind) -> Self {
        Self {
            level: session.level.clone(),
            course: session.course.clone(),
            topic: session.topic_or_general().map(str::to_owned),
            kind,
            global: session.global,
        }
    }
}

/// One question's line in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionReport {
    pub text: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub outcome: Outcome,
    /// Reference material for this question, when one was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl EvaluationReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: EvaluationReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        let scope = match &self.attempt.topic {
            Some(topic) => topic.clone(),
            None => "course-wide".to_string(),
        };
        md.push_str(&format!(
            "# {} — {} ({})\n\n",
            self.attempt.course, scope, self.attempt.kind
        ));
        md.push_str(&format!(
            "**Score:** {}/{} ({:.2}%) in {} s\n\n",
            self.result.score, self.result.total, self.result.percentage, self.duration_secs
        ));

        md.push_str("| # | Question | Your answer | Correct answer | Verdict |\n");
        md.push_str("|---|----------|-------------|----------------|--------|\n");
        for (index, q) in self.questions.iter().enumerate() {
            let verdict = match q.outcome {
                Outcome::Correct => "✓",
                Outcome::Incorrect => "✗",
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                index + 1,
                q.text,
                q.user_answer,
                q.correct_answer,
                verdict
            ));
        }
        md.push('\n');

        if let Some(plan) = &self.plan {
            md.push_str("## Study plan\n\n");
            for module in &plan.modules {
                md.push_str(&format!("### {}\n\n", module.module));
                if let Some(narrative) = &module.narrative {
                    md.push_str(narrative);
                    md.push_str("\n\n");
                }
                for reference in &module.references {
                    md.push_str(&format!("- {reference}\n"));
                }
                md.push('\n');
            }
        }

        md
    }
}
