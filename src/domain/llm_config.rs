use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Model endpoint settings consumed by the invoker.
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
#[serde(default)]
pub struct LLMConfig {
    #[validate(url)]
    pub base_url: String,
    #[validate(length(min = 1))]
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    #[validate(range(min = 1))]
    pub max_tokens: u32,
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,
    #[validate(range(min = 1, max = 3600))]
    pub timeout_secs: u64,
    /// Read the completion as a token stream instead of a single payload.
    pub streaming: bool,
    /// Ask the endpoint for schema-constrained JSON output.
    pub structured_output: bool,
    #[validate(range(min = 1024))]
    pub context_window: usize,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            base_url: OPENROUTER_BASE_URL.to_string(),
            model: "openai/gpt-4o-mini".to_string(),
            api_key: None,
            max_tokens: 4000,
            temperature: 0.7,
            timeout_secs: 120,
            streaming: false,
            structured_output: false,
            context_window: 128_000,
        }
    }
}

impl LLMConfig {
    pub fn is_openrouter(&self) -> bool {
        self.base_url.to_lowercase().contains("openrouter.ai")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn endpoint(&self, resource: &str) -> String {
        if self.base_url.ends_with('/') {
            format!("{}{}", self.base_url, resource)
        } else {
            format!("{}/{}", self.base_url, resource)
        }
    }
}
