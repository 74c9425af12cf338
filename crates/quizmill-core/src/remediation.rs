//! Remediation plan post-processing.
//!
//! After a global evaluation is graded, incorrect answers are grouped by
//! module and sent to the plan-generation service in one batched call. The
//! service answers with a narrative per module; this module filters out
//! placeholder narratives and attaches the per-question references for each
//! module's missed questions.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Narratives at or below this many characters carry no substantive
/// content (the service pads refusals); they are dropped from the plan,
/// though their module's references are kept.
pub const MIN_NARRATIVE_CHARS: usize = 305;

/// Study guidance for one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePlan {
    /// Module display name (e.g. "Module 2").
    pub module: String,
    /// Generated study narrative; `None` when the service produced no
    /// substantive text for this module.
    pub narrative: Option<String>,
    /// References for the module's missed questions, deduplicated in
    /// first-seen order.
    pub references: Vec<String>,
}

/// The full remediation plan for a global evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationPlan {
    pub modules: Vec<ModulePlan>,
}

impl RemediationPlan {
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Assemble the plan from the service's narratives, the incorrect-index
/// grouping, and the per-question references (indexed by original
/// question index; `None` where the reference fetch came up empty).
pub fn build_plan(
    narratives: &BTreeMap<String, String>,
    grouped_incorrect: &BTreeMap<String, Vec<usize>>,
    references: &[Option<String>],
) -> RemediationPlan {
    let modules = narratives
        .iter()
        .map(|(module, narrative)| {
            let narrative = if narrative.chars().count() > MIN_NARRATIVE_CHARS {
                Some(narrative.clone())
            } else {
                None
            };

            let mut seen = HashSet::new();
            let mut module_references = Vec::new();
            for &index in grouped_incorrect.get(module).map(Vec::as_slice).unwrap_or(&[]) {
                if let Some(Some(reference)) = references.get(index) {
                    if seen.insert(reference.clone()) {
                        module_references.push(reference.clone());
                    }
                }
            }

            ModulePlan {
                module: module.clone(),
                narrative,
                references: module_references,
            }
        })
        .collect();

    RemediationPlan { modules }
}
