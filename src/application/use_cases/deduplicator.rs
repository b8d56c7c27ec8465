use crate::domain::generation_config::DedupNormalization;
use crate::domain::test_case::{DesignTechnique, TestCase, TestType};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome {
    pub cases: Vec<TestCase>,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    method: String,
    path: String,
    test_type: TestType,
    design_technique: DesignTechnique,
    title: String,
}

/// Run-wide duplicate filter. Keys only, survivors are never modified.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    normalization: DedupNormalization,
}

impl Deduplicator {
    pub fn new(normalization: DedupNormalization) -> Self {
        Self { normalization }
    }

    /// Keeps the first case seen for every (method, path, type, technique, title) key.
    pub fn dedup(&self, cases: Vec<TestCase>) -> DedupOutcome {
        let total = cases.len();
        let mut seen = HashSet::with_capacity(total);
        let mut kept = Vec::with_capacity(total);

        for case in cases {
            let key = self.key_for(&case);
            if seen.insert(key) {
                kept.push(case);
            } else {
                tracing::debug!(
                    operation = %case.operation,
                    title = %case.title,
                    "duplicate test case removed"
                );
            }
        }

        DedupOutcome {
            removed: total - kept.len(),
            cases: kept,
        }
    }

    fn key_for(&self, case: &TestCase) -> DedupKey {
        DedupKey {
            method: case.operation.method.clone(),
            path: case.operation.path.clone(),
            test_type: case.test_type,
            design_technique: case.design_technique,
            title: self.normalize_title(&case.title),
        }
    }

    pub fn normalize_title(&self, title: &str) -> String {
        let mut normalized: String = if self.normalization.strip_punctuation {
            title
                .chars()
                .filter(|c| c.is_alphanumeric() || c.is_whitespace())
                .collect()
        } else {
            title.to_string()
        };
        if self.normalization.lowercase {
            normalized = normalized.to_lowercase();
        }
        if self.normalization.collapse_whitespace {
            normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
        }
        normalized
    }
}
