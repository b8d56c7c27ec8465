use crate::domain::error::{AppError, Result};
use crate::domain::generation_config::GenerationConfig;
use crate::domain::llm_config::LLMConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("csv") => Some(ExportFormat::Csv),
            Some("json") => Some(ExportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CsvLayout {
    /// One row per test step; case-level columns only on the first row.
    #[default]
    RowPerStep,
    /// One row per case with numbered steps joined by newlines.
    Concatenated,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct FilterConfig {
    pub include_paths: Vec<String>,
    pub exclude_paths: Vec<String>,
    pub include_methods: Vec<String>,
    pub include_tags: Vec<String>,
}

impl FilterConfig {
    pub fn should_process_path(&self, path: &str) -> bool {
        if !self.include_paths.is_empty()
            && !self.include_paths.iter().any(|prefix| path.starts_with(prefix.as_str()))
        {
            return false;
        }
        !self
            .exclude_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    pub fn should_process_method(&self, method: &str) -> bool {
        self.include_methods.is_empty()
            || self
                .include_methods
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(method))
    }

    pub fn should_process_tags(&self, tags: &[String]) -> bool {
        self.include_tags.is_empty() || tags.iter().any(|tag| self.include_tags.contains(tag))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ExportConfig {
    pub format: ExportFormat,
    pub csv_layout: CsvLayout,
}

/// Full configuration tree as loaded from defaults, file, environment and CLI.
#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
#[serde(default)]
pub struct AppConfig {
    #[validate(nested)]
    pub llm: LLMConfig,
    #[validate(nested)]
    pub generation: GenerationConfig,
    pub filters: FilterConfig,
    pub export: ExportConfig,
}

impl AppConfig {
    /// Field-level and cross-field validation. Any failure is fatal before a run starts.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|err| AppError::ConfigError(err.to_string()))?;

        if let Some(prefix) = self
            .filters
            .include_paths
            .iter()
            .find(|prefix| self.filters.exclude_paths.contains(prefix))
        {
            return Err(AppError::ConfigError(format!(
                "path prefix '{}' is both included and excluded",
                prefix
            )));
        }

        let has_key = self
            .llm
            .api_key
            .as_ref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false);
        if self.llm.is_openrouter() && !has_key {
            return Err(AppError::ConfigError(
                "OpenRouter requires an API key (set OPENROUTER_API_KEY, LLM_API_KEY or --api-key)"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.llm.base_url = "http://localhost:1234/v1".to_string();
        config
    }

    #[test]
    fn test_local_default_passes() {
        assert!(local_config().check().is_ok());
    }

    #[test]
    fn test_openrouter_without_key_is_config_error() {
        let config = AppConfig::default();
        assert!(matches!(config.check(), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_conflicting_path_filters() {
        let mut config = local_config();
        config.filters.include_paths = vec!["/users".to_string()];
        config.filters.exclude_paths = vec!["/users".to_string()];
        let err = config.check().unwrap_err();
        assert!(err.to_string().contains("/users"));
    }

    #[test]
    fn test_nested_validation_is_reported() {
        let mut config = local_config();
        config.generation.retry_attempts = 0;
        assert!(matches!(config.check(), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_filters() {
        let filters = FilterConfig {
            include_paths: vec!["/users".to_string()],
            exclude_paths: vec!["/users/admin".to_string()],
            include_methods: vec!["post".to_string()],
            include_tags: vec![],
        };
        assert!(filters.should_process_path("/users/{id}"));
        assert!(!filters.should_process_path("/users/admin/roles"));
        assert!(!filters.should_process_path("/orders"));
        assert!(filters.should_process_method("POST"));
        assert!(!filters.should_process_method("GET"));
        assert!(filters.should_process_tags(&[]));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ExportFormat::from_extension(Path::new("out/cases.JSON")),
            Some(ExportFormat::Json)
        );
        assert_eq!(ExportFormat::from_extension(Path::new("cases.txt")), None);
    }
}
