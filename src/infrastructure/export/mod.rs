// ============================================================
// EXPORT INFRASTRUCTURE LAYER
// ============================================================
// Writes validated test cases as CSV or JSON

mod csv_export;
mod json_export;

pub use csv_export::CsvExporter;
pub use json_export::{ExportDocument, ExportMetadata, ExportRecord, JsonExporter};

use crate::domain::app_config::{CsvLayout, ExportFormat};
use crate::domain::error::{AppError, Result};
use crate::domain::run_manifest::RunManifest;
use crate::domain::test_case::TestCase;
use std::path::Path;

/// Format to write: the output extension wins when it names a known format.
pub fn resolve_format(path: &Path, requested: ExportFormat) -> ExportFormat {
    match ExportFormat::from_extension(path) {
        Some(inferred) if inferred != requested => {
            tracing::warn!(
                path = %path.display(),
                requested = ?requested,
                inferred = ?inferred,
                "output extension disagrees with the requested format, using the extension"
            );
            inferred
        }
        _ => requested,
    }
}

/// Writes `cases` to `path`, creating parent directories as needed.
pub fn export_cases(
    path: &Path,
    format: ExportFormat,
    layout: CsvLayout,
    cases: &[TestCase],
    manifest: &RunManifest,
) -> Result<ExportFormat> {
    let format = resolve_format(path, format);
    ensure_parent_dir(path)?;
    match format {
        ExportFormat::Csv => CsvExporter::new().with_layout(layout).write_file(path, cases)?,
        ExportFormat::Json => JsonExporter::new().write_file(path, cases, manifest)?,
    }
    tracing::info!(
        path = %path.display(),
        format = ?format,
        cases = cases.len(),
        "test cases exported"
    );
    Ok(format)
}

/// Writes the run manifest as pretty JSON.
pub fn write_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    ensure_parent_dir(path)?;
    let text = serde_json::to_string_pretty(manifest)
        .map_err(|e| AppError::ExportError(format!("Failed to serialize manifest: {}", e)))?;
    std::fs::write(path, text).map_err(|e| {
        AppError::ExportError(format!("Failed to write {}: {}", path.display(), e))
    })?;
    tracing::info!(path = %path.display(), "run manifest written");
    Ok(())
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::ExportError(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })
        }
        _ => Ok(()),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{case, manifest};
    use super::*;

    #[test]
    fn test_extension_overrides_requested_format() {
        assert_eq!(
            resolve_format(Path::new("out/cases.json"), ExportFormat::Csv),
            ExportFormat::Json
        );
        assert_eq!(
            resolve_format(Path::new("out/cases"), ExportFormat::Json),
            ExportFormat::Json
        );
    }

    #[test]
    fn test_export_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/cases.csv");
        let format = export_cases(
            &path,
            ExportFormat::Csv,
            CsvLayout::RowPerStep,
            &[case("Age below minimum", 1)],
            &manifest(),
        )
        .unwrap();
        assert_eq!(format, ExportFormat::Csv);
        assert!(path.exists());
    }

    #[test]
    fn test_manifest_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        write_manifest(&path, &manifest()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: RunManifest = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.operations.len(), 2);
    }

    #[test]
    fn test_unwritable_target_is_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let err = export_cases(
            &blocker.join("cases.csv"),
            ExportFormat::Csv,
            CsvLayout::RowPerStep,
            &[],
            &manifest(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::ExportError(_)));
    }
}
