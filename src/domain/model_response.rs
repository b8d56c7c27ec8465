use crate::domain::operation::OperationRef;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvocationMode {
    Structured,
    Streaming,
    Plain,
}

impl fmt::Display for InvocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationMode::Structured => f.write_str("structured"),
            InvocationMode::Streaming => f.write_str("streaming"),
            InvocationMode::Plain => f.write_str("plain"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    DirectParse,
    CodeBlock,
    ArrayBoundary,
    TruncationRepair,
    ObjectScan,
}

impl RecoveryStrategy {
    /// Strictest first.
    pub const ORDER: [RecoveryStrategy; 5] = [
        RecoveryStrategy::DirectParse,
        RecoveryStrategy::CodeBlock,
        RecoveryStrategy::ArrayBoundary,
        RecoveryStrategy::TruncationRepair,
        RecoveryStrategy::ObjectScan,
    ];
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecoveryStrategy::DirectParse => "direct_parse",
            RecoveryStrategy::CodeBlock => "code_block",
            RecoveryStrategy::ArrayBoundary => "array_boundary",
            RecoveryStrategy::TruncationRepair => "truncation_repair",
            RecoveryStrategy::ObjectScan => "object_scan",
        };
        f.write_str(name)
    }
}

/// Text returned by one model call. Lives only until recovery has parsed it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawModelResponse {
    pub operation: OperationRef,
    pub text: String,
    pub truncated: bool,
    pub mode: InvocationMode,
    pub finish_reason: Option<String>,
    pub strategy: Option<RecoveryStrategy>,
}

impl RawModelResponse {
    pub fn new(operation: OperationRef, text: String, mode: InvocationMode) -> Self {
        Self {
            operation,
            text,
            truncated: false,
            mode,
            finish_reason: None,
            strategy: None,
        }
    }

    pub fn with_finish_reason(mut self, finish_reason: Option<String>) -> Self {
        if finish_reason.as_deref() == Some("length") {
            self.truncated = true;
        }
        self.finish_reason = finish_reason;
        self
    }

    pub fn mark_truncated(mut self) -> Self {
        self.truncated = true;
        self
    }
}
