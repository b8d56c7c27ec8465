pub mod openai;
pub mod stream;

use crate::domain::error::Result;
use crate::domain::llm_config::LLMConfig;
use crate::domain::model_response::RawModelResponse;
use crate::domain::operation::OperationRef;
use async_trait::async_trait;

pub use openai::OpenAICompatibleClient;

/// One prompt pair for one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub operation: OperationRef,
    pub system_prompt: String,
    pub user_prompt: String,
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Sends a single request. Transport failures are returned, never retried here;
    /// truncation is reported on the response.
    async fn invoke(&self, config: &LLMConfig, request: &ModelRequest) -> Result<RawModelResponse>;
}
