//! Positional module partition for remediation grouping.
//!
//! General question sets are laid out as fixed-size blocks, one block per
//! course module: questions 0..4 are "Module 1", 4..8 are "Module 2", and
//! so on. The block size is an assumption about how the question bank
//! composes general sets, not a derived invariant, so it is injectable
//! rather than baked into the grouping code.

use std::collections::BTreeMap;

/// Maps a question's original (pre-shuffle) index to a course module.
#[derive(Debug, Clone, Copy)]
pub struct ModulePartition {
    /// Questions per module block in a general question set.
    pub questions_per_module: usize,
}

impl Default for ModulePartition {
    fn default() -> Self {
        Self {
            questions_per_module: 4,
        }
    }
}

impl ModulePartition {
    pub fn new(questions_per_module: usize) -> Self {
        assert!(questions_per_module > 0, "module size must be non-zero");
        Self {
            questions_per_module,
        }
    }

    /// 1-based module number for a question index.
    pub fn module_number(&self, question_index: usize) -> usize {
        question_index / self.questions_per_module + 1
    }

    /// Display name for a module, as the plan service expects it.
    pub fn module_name(&self, question_index: usize) -> String {
        format!("Module {}", self.module_number(question_index))
    }

    /// Group question indices by module name, keeping within-module order.
    ///
    /// `BTreeMap` so module iteration order is stable ("Module 1" before
    /// "Module 2"; module counts here stay single-digit).
    pub fn group_by_module(&self, indices: &[usize]) -> BTreeMap<String, Vec<usize>> {
        let mut grouped: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for &index in indices {
            grouped.entry(self.module_name(index)).or_default().push(index);
        }
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_per_module_by_default() {
        let p = ModulePartition::default();
        assert_eq!(p.module_number(0), 1);
        assert_eq!(p.module_number(3), 1);
        assert_eq!(p.module_number(4), 2);
        assert_eq!(p.module_number(9), 3);
        assert_eq!(p.module_name(9), "Module 3");
    }

    #[test]
    fn grouping_matches_block_layout() {
        let p = ModulePartition::default();
        let grouped = p.group_by_module(&[0, 5, 9]);
        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped["Module 1"], vec![0]);
        assert_eq!(grouped["Module 2"], vec![5]);
        assert_eq!(grouped["Module 3"], vec![9]);
    }

    #[test]
    fn custom_module_size() {
        let p = ModulePartition::new(5);
        assert_eq!(p.module_number(4), 1);
        assert_eq!(p.module_number(5), 2);
    }

    #[test]
    #[should_panic]
    fn zero_module_size_rejected() {
        ModulePartition::new(0);
    }
}
