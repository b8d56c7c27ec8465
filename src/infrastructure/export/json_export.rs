use crate::domain::error::{AppError, Result};
use crate::domain::operation::OperationRef;
use crate::domain::run_manifest::RunManifest;
use crate::domain::test_case::{TestCase, TestStep};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExportMetadata {
    pub total_test_cases: usize,
    pub generated_at: DateTime<Utc>,
    pub run_id: String,
    pub failed_operations: Vec<OperationRef>,
}

/// Flat export shape of a test case.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExportRecord {
    pub title: String,
    pub description: String,
    pub preconditions: String,
    pub test_steps: Vec<TestStep>,
    pub test_type: String,
    pub design_technique: String,
    pub api_path: String,
    pub http_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    pub created_date: DateTime<Utc>,
}

impl From<&TestCase> for ExportRecord {
    fn from(case: &TestCase) -> Self {
        Self {
            title: case.title.clone(),
            description: case.description.clone(),
            preconditions: case.preconditions.clone(),
            test_steps: case.test_steps.clone(),
            test_type: case.test_type.to_string(),
            design_technique: case.design_technique.label().to_string(),
            api_path: case.operation.path.clone(),
            http_method: case.operation.method.clone(),
            priority: case.priority.map(|priority| priority.to_string()),
            created_date: case.created_date,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExportDocument {
    pub metadata: ExportMetadata,
    pub test_cases: Vec<ExportRecord>,
}

impl ExportDocument {
    pub fn new(cases: &[TestCase], manifest: &RunManifest) -> Self {
        Self {
            metadata: ExportMetadata {
                total_test_cases: cases.len(),
                generated_at: manifest.finished_at,
                run_id: manifest.run_id.clone(),
                failed_operations: manifest
                    .failed()
                    .map(|report| report.operation.clone())
                    .collect(),
            },
            test_cases: cases.iter().map(ExportRecord::from).collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct JsonExporter;

impl JsonExporter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, cases: &[TestCase], manifest: &RunManifest) -> Result<String> {
        serde_json::to_string_pretty(&ExportDocument::new(cases, manifest))
            .map_err(|e| AppError::ExportError(format!("Failed to serialize test cases: {}", e)))
    }

    pub fn write_file(&self, path: &Path, cases: &[TestCase], manifest: &RunManifest) -> Result<()> {
        let text = self.render(cases, manifest)?;
        std::fs::write(path, text).map_err(|e| {
            AppError::ExportError(format!("Failed to write {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::export::fixtures::{case, manifest};
    use serde_json::Value;

    #[test]
    fn test_document_shape() {
        let text = JsonExporter::new()
            .render(&[case("Age below minimum", 2)], &manifest())
            .unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["metadata"]["total_test_cases"], 1);
        assert_eq!(value["metadata"]["run_id"], "run-1");
        assert_eq!(
            value["metadata"]["failed_operations"][0],
            serde_json::json!({"method": "GET", "path": "/users"})
        );
        let record = &value["test_cases"][0];
        assert_eq!(record["api_path"], "/users");
        assert_eq!(record["http_method"], "POST");
        assert_eq!(record["design_technique"], "BVA");
        assert_eq!(record["test_steps"][1]["expected_result"], "Status 202");
        assert_eq!(record["priority"], "High");
    }

    #[test]
    fn test_written_file_parses_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.json");
        JsonExporter::new()
            .write_file(&path, &[case("a", 1), case("b", 1)], &manifest())
            .unwrap();
        let document: ExportDocument =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(document.metadata.total_test_cases, 2);
        assert_eq!(document.test_cases[1].title, "b");
    }
}
