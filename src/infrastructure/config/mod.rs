use crate::domain::app_config::{AppConfig, CsvLayout, ExportFormat};
use crate::domain::error::{AppError, Result};
use figment::providers::{Env, Format, Serialized, Toml, Yaml};
use figment::Figment;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "CASEGEN_";
pub const API_KEY_VARS: [&str; 2] = ["OPENROUTER_API_KEY", "LLM_API_KEY"];

/// Values given on the command line; each one replaces whatever the layers produced.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_concurrent: Option<usize>,
    pub streaming: bool,
    pub structured_output: bool,
    pub no_dedup: bool,
    pub format: Option<ExportFormat>,
    pub csv_layout: Option<CsvLayout>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(key) = self.api_key.as_ref().filter(|key| !key.trim().is_empty()) {
            config.llm.api_key = Some(key.clone());
        }
        if let Some(url) = &self.base_url {
            config.llm.base_url = url.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(limit) = self.max_concurrent {
            config.generation.max_concurrent_requests = Some(limit);
        }
        if self.streaming {
            config.llm.streaming = true;
        }
        if self.structured_output {
            config.llm.structured_output = true;
        }
        if self.no_dedup {
            config.generation.enable_deduplication = false;
        }
        if let Some(format) = self.format {
            config.export.format = format;
        }
        if let Some(layout) = self.csv_layout {
            config.export.csv_layout = layout;
        }
    }
}

pub struct ConfigService {
    file: Option<PathBuf>,
}

impl ConfigService {
    pub fn new(file: Option<PathBuf>) -> Self {
        Self { file }
    }

    /// Loads `.env` into the process environment when present.
    pub fn load_dotenv() {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), ".env loaded"),
            Err(err) if err.not_found() => {}
            Err(err) => tracing::warn!(error = %err, "failed to read .env"),
        }
    }

    /// Defaults, then the config file, then `CASEGEN_*` variables, then CLI overrides.
    pub fn load(&self, overrides: &ConfigOverrides) -> Result<AppConfig> {
        let mut config: AppConfig = self
            .figment()?
            .extract()
            .map_err(|err| AppError::ConfigError(err.to_string()))?;

        if !has_key(&config) {
            config.llm.api_key = api_key_from_env();
        }
        overrides.apply(&mut config);
        config.check()?;

        tracing::debug!(
            base_url = %config.llm.base_url,
            model = %config.llm.model,
            api_key_set = has_key(&config),
            concurrency = ?config.generation.concurrency_ceiling(),
            "configuration loaded"
        );
        Ok(config)
    }

    fn figment(&self) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Some(path) = &self.file {
            figment = figment.merge(file_provider(path)?);
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }
}

fn file_provider(path: &Path) -> Result<Figment> {
    if !path.is_file() {
        return Err(AppError::ConfigError(format!(
            "config file '{}' not found",
            path.display()
        )));
    }
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("yaml") | Some("yml") => Ok(Figment::from(Yaml::file(path))),
        Some("toml") => Ok(Figment::from(Toml::file(path))),
        _ => Err(AppError::ConfigError(format!(
            "config file '{}' must be .yaml, .yml or .toml",
            path.display()
        ))),
    }
}

fn has_key(config: &AppConfig) -> bool {
    config
        .llm
        .api_key
        .as_ref()
        .map(|key| !key.trim().is_empty())
        .unwrap_or(false)
}

fn api_key_from_env() -> Option<String> {
    API_KEY_VARS.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn load(file: Option<&str>, overrides: &ConfigOverrides) -> figment::error::Result<AppConfig> {
        ConfigService::new(file.map(PathBuf::from))
            .load(overrides)
            .map_err(|err| figment::Error::from(err.to_string()))
    }

    fn clear_keys(jail: &mut Jail) {
        for name in API_KEY_VARS {
            jail.set_env(name, "");
        }
    }

    #[test]
    fn test_defaults_with_key_from_environment() {
        Jail::expect_with(|jail| {
            clear_keys(jail);
            jail.set_env("OPENROUTER_API_KEY", "sk-or-1");
            let config = load(None, &ConfigOverrides::default())?;
            assert_eq!(config.llm.model, "openai/gpt-4o-mini");
            assert_eq!(config.llm.api_key.as_deref(), Some("sk-or-1"));
            assert_eq!(config.generation.retry_attempts, 3);
            assert!(config.generation.enable_deduplication);
            Ok(())
        });
    }

    #[test]
    fn test_llm_api_key_is_second_fallback() {
        Jail::expect_with(|jail| {
            clear_keys(jail);
            jail.set_env("LLM_API_KEY", "sk-local");
            let config = load(None, &ConfigOverrides::default())?;
            assert_eq!(config.llm.api_key.as_deref(), Some("sk-local"));
            Ok(())
        });
    }

    #[test]
    fn test_missing_openrouter_key_is_rejected() {
        Jail::expect_with(|jail| {
            clear_keys(jail);
            let err = ConfigService::new(None)
                .load(&ConfigOverrides::default())
                .unwrap_err();
            assert!(matches!(err, AppError::ConfigError(_)));
            Ok(())
        });
    }

    #[test]
    fn test_yaml_file_then_environment_then_overrides() {
        Jail::expect_with(|jail| {
            clear_keys(jail);
            jail.create_file(
                "casegen.yaml",
                r#"
llm:
  base_url: http://localhost:11434/v1
  model: llama3
  temperature: 0.2
generation:
  max_concurrent_requests: 4
filters:
  exclude_paths: [/internal]
export:
  csv_layout: concatenated
"#,
            )?;
            jail.set_env("CASEGEN_LLM__MODEL", "qwen2.5");
            jail.set_env("CASEGEN_GENERATION__RETRY_ATTEMPTS", "5");

            let config = load(Some("casegen.yaml"), &ConfigOverrides::default())?;
            assert_eq!(config.llm.model, "qwen2.5");
            assert_eq!(config.llm.temperature, 0.2);
            assert_eq!(config.generation.retry_attempts, 5);
            assert_eq!(config.generation.concurrency_ceiling(), Some(4));
            assert_eq!(config.filters.exclude_paths, vec!["/internal"]);
            assert_eq!(config.export.csv_layout, CsvLayout::Concatenated);
            assert!(config.llm.api_key.is_none());

            let overrides = ConfigOverrides {
                model: Some("mistral".to_string()),
                max_concurrent: Some(0),
                no_dedup: true,
                format: Some(ExportFormat::Json),
                ..ConfigOverrides::default()
            };
            let config = load(Some("casegen.yaml"), &overrides)?;
            assert_eq!(config.llm.model, "mistral");
            assert_eq!(config.generation.concurrency_ceiling(), None);
            assert!(!config.generation.enable_deduplication);
            assert_eq!(config.export.format, ExportFormat::Json);
            Ok(())
        });
    }

    #[test]
    fn test_toml_file_is_supported() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "casegen.toml",
                r#"
[llm]
base_url = "http://localhost:8080/v1"
streaming = true
"#,
            )?;
            let config = load(Some("casegen.toml"), &ConfigOverrides::default())?;
            assert!(config.llm.streaming);
            assert!(!config.llm.is_openrouter());
            Ok(())
        });
    }

    #[test]
    fn test_bad_config_files_are_config_errors() {
        Jail::expect_with(|jail| {
            jail.create_file("casegen.ini", "model = x")?;
            jail.create_file(
                "bad.yaml",
                "llm:\n  base_url: http://localhost/v1\n  temperature: 9.0\n",
            )?;
            for file in ["missing.yaml", "casegen.ini", "bad.yaml"] {
                let err = ConfigService::new(Some(PathBuf::from(file)))
                    .load(&ConfigOverrides::default())
                    .unwrap_err();
                assert!(matches!(err, AppError::ConfigError(_)), "{}", file);
            }
            Ok(())
        });
    }
}
