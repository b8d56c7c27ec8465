use crate::domain::operation::OperationRef;
use crate::domain::run_manifest::{OperationStatus, RunManifest};
use crate::domain::test_case::{DesignTechnique, Priority, TestCase, TestType};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct AttentionItem {
    pub operation: OperationRef,
    pub status: OperationStatus,
    pub accepted: usize,
    pub error: Option<String>,
}

/// Totals printed at the end of a run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunSummary {
    pub total: usize,
    pub positive: usize,
    pub negative: usize,
    pub by_technique: BTreeMap<DesignTechnique, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
    pub without_priority: usize,
    pub duplicates_removed: usize,
    pub operations: usize,
    pub cancelled: bool,
    /// Operations that ended with zero or partial cases.
    pub attention: Vec<AttentionItem>,
}

impl RunSummary {
    pub fn new(cases: &[TestCase], manifest: &RunManifest) -> Self {
        let mut summary = Self {
            total: cases.len(),
            duplicates_removed: manifest.duplicates_removed,
            operations: manifest.operations.len(),
            cancelled: manifest.cancelled,
            ..Self::default()
        };
        for case in cases {
            match case.test_type {
                TestType::Positive => summary.positive += 1,
                TestType::Negative => summary.negative += 1,
            }
            *summary.by_technique.entry(case.design_technique).or_default() += 1;
            match case.priority {
                Some(priority) => *summary.by_priority.entry(priority).or_default() += 1,
                None => summary.without_priority += 1,
            }
        }
        summary.attention = manifest
            .needs_attention()
            .map(|report| AttentionItem {
                operation: report.operation.clone(),
                status: report.status,
                accepted: report.accepted,
                error: report.error.clone(),
            })
            .collect();
        summary
    }

    pub fn log(&self) {
        tracing::info!(
            total = self.total,
            positive = self.positive,
            negative = self.negative,
            duplicates_removed = self.duplicates_removed,
            operations = self.operations,
            cancelled = self.cancelled,
            "generation summary"
        );
        for item in &self.attention {
            tracing::warn!(
                operation = %item.operation,
                status = %item.status,
                accepted = item.accepted,
                error = item.error.as_deref().unwrap_or(""),
                "operation needs attention"
            );
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Test cases: {} ({} positive, {} negative)", self.total, self.positive, self.negative)?;
        if self.cancelled {
            writeln!(f, "Run was cancelled before every operation finished")?;
        }
        writeln!(f, "Duplicates removed: {}", self.duplicates_removed)?;
        if !self.by_technique.is_empty() {
            writeln!(f, "By technique:")?;
            for (technique, count) in &self.by_technique {
                writeln!(f, "  {:<26} {}", technique.label(), count)?;
            }
        }
        if !self.by_priority.is_empty() || self.without_priority > 0 {
            writeln!(f, "By priority:")?;
            for (priority, count) in &self.by_priority {
                writeln!(f, "  {:<26} {}", priority.as_str(), count)?;
            }
            if self.without_priority > 0 {
                writeln!(f, "  {:<26} {}", "Unset", self.without_priority)?;
            }
        }
        if self.attention.is_empty() {
            write!(f, "All {} operations completed", self.operations)
        } else {
            write!(f, "Operations needing attention: {}", self.attention.len())?;
            for item in &self.attention {
                write!(f, "\n  {} [{}] {} cases", item.operation, item.status, item.accepted)?;
                if let Some(error) = &item.error {
                    write!(f, ": {}", error)?;
                }
            }
            Ok(())
        }
    }
}
