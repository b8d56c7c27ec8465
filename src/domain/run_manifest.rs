use crate::domain::model_response::RecoveryStrategy;
use crate::domain::operation::OperationRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Completed,
    /// Some cases were accepted but the response was truncated or candidates were rejected.
    Partial,
    /// Candidates were recovered but none passed validation.
    NoValidCases,
    /// No recovery strategy produced a candidate.
    RecoveryExhausted,
    TransportFailed,
    Cancelled,
    /// The pipeline task died without reporting.
    Aborted,
}

impl OperationStatus {
    pub fn is_failure(&self) -> bool {
        !matches!(self, OperationStatus::Completed | OperationStatus::Partial)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OperationStatus::Completed => "completed",
            OperationStatus::Partial => "partial",
            OperationStatus::NoValidCases => "no valid cases",
            OperationStatus::RecoveryExhausted => "recovery exhausted",
            OperationStatus::TransportFailed => "transport failed",
            OperationStatus::Cancelled => "cancelled",
            OperationStatus::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OperationReport {
    pub operation: OperationRef,
    pub status: OperationStatus,
    pub attempts: u32,
    pub candidates: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub warnings: usize,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<RecoveryStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationReport {
    pub fn new(operation: OperationRef) -> Self {
        Self {
            operation,
            status: OperationStatus::Completed,
            attempts: 0,
            candidates: 0,
            accepted: 0,
            rejected: 0,
            warnings: 0,
            truncated: false,
            strategy: None,
            input_digest: None,
            error: None,
        }
    }

    pub fn terminal(operation: OperationRef, status: OperationStatus, error: &str) -> Self {
        Self {
            status,
            error: Some(error.to_string()),
            ..Self::new(operation)
        }
    }
}

/// Per-run record of what happened to every scheduled operation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RunManifest {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cancelled: bool,
    pub duplicates_removed: usize,
    pub operations: Vec<OperationReport>,
}

impl RunManifest {
    pub fn failed(&self) -> impl Iterator<Item = &OperationReport> {
        self.operations
            .iter()
            .filter(|report| report.status.is_failure())
    }

    /// Operations that yielded zero cases or only part of their response.
    pub fn needs_attention(&self) -> impl Iterator<Item = &OperationReport> {
        self.operations
            .iter()
            .filter(|report| report.status != OperationStatus::Completed)
    }

    pub fn accepted_total(&self) -> usize {
        self.operations.iter().map(|report| report.accepted).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_and_attention_filters() {
        let mut ok = OperationReport::new(OperationRef::new("GET", "/a"));
        ok.accepted = 3;
        let mut partial = OperationReport::new(OperationRef::new("GET", "/b"));
        partial.status = OperationStatus::Partial;
        partial.accepted = 1;
        let failed = OperationReport::terminal(
            OperationRef::new("GET", "/c"),
            OperationStatus::TransportFailed,
            "connection refused",
        );
        let manifest = RunManifest {
            run_id: "run".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            cancelled: false,
            duplicates_removed: 0,
            operations: vec![ok, partial, failed],
        };
        assert_eq!(manifest.failed().count(), 1);
        assert_eq!(manifest.needs_attention().count(), 2);
        assert_eq!(manifest.accepted_total(), 4);
    }
}
