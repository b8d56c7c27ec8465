use super::stream::StreamAccumulator;
use super::{ModelClient, ModelRequest};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::model_response::{InvocationMode, RawModelResponse};
use crate::domain::test_case::DesignTechnique;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use serde_json::{json, Value};

/// Client for any endpoint speaking the OpenAI chat/completions protocol
/// (OpenRouter, OpenAI, LM Studio, Ollama, vLLM).
pub struct OpenAICompatibleClient {
    client: reqwest::Client,
}

impl Default for OpenAICompatibleClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAICompatibleClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn build_body(config: &LLMConfig, request: &ModelRequest, mode: InvocationMode) -> Value {
        let mut body = json!({
            "model": config.model,
            "messages": [
                {
                    "role": "system",
                    "content": request.system_prompt
                },
                {
                    "role": "user",
                    "content": request.user_prompt
                }
            ],
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
        });
        match mode {
            InvocationMode::Structured => {
                body["response_format"] = json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": "test_cases",
                        "strict": true,
                        "schema": output_schema()
                    }
                });
            }
            InvocationMode::Streaming => body["stream"] = json!(true),
            InvocationMode::Plain => {}
        }
        body
    }

    async fn post(&self, config: &LLMConfig, body: &Value) -> Result<reqwest::Response> {
        let mut builder = self
            .client
            .post(config.endpoint("chat/completions"))
            .timeout(config.timeout())
            .json(body);
        if let Some(api_key) = config.api_key.as_deref().filter(|key| !key.is_empty()) {
            builder = builder.bearer_auth(api_key);
        }
        if config.is_openrouter() {
            builder = builder.header("X-Title", "swagger-casegen");
        }
        Ok(builder.send().await?)
    }

    async fn invoke_structured(
        &self,
        config: &LLMConfig,
        request: &ModelRequest,
    ) -> Result<RawModelResponse> {
        let body = Self::build_body(config, request, InvocationMode::Structured);
        let response = self.post(config, &body).await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if is_schema_rejection(status, &text) {
                tracing::warn!(
                    operation = %request.operation,
                    status = %status,
                    "endpoint rejected structured output, retrying in text mode"
                );
                return self.invoke_text(config, request).await;
            }
            return Err(status_error(status, &text));
        }

        read_completion(response, request, InvocationMode::Structured).await
    }

    async fn invoke_text(
        &self,
        config: &LLMConfig,
        request: &ModelRequest,
    ) -> Result<RawModelResponse> {
        if config.streaming {
            self.invoke_streaming(config, request).await
        } else {
            self.invoke_plain(config, request).await
        }
    }

    async fn invoke_plain(
        &self,
        config: &LLMConfig,
        request: &ModelRequest,
    ) -> Result<RawModelResponse> {
        let body = Self::build_body(config, request, InvocationMode::Plain);
        let response = ensure_success(self.post(config, &body).await?).await?;
        read_completion(response, request, InvocationMode::Plain).await
    }

    async fn invoke_streaming(
        &self,
        config: &LLMConfig,
        request: &ModelRequest,
    ) -> Result<RawModelResponse> {
        let body = Self::build_body(config, request, InvocationMode::Streaming);
        let response = ensure_success(self.post(config, &body).await?).await?;

        let mut accumulator = StreamAccumulator::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => accumulator.push_chunk(&bytes),
                Err(err) => {
                    accumulator.fail(format!("Stream interrupted: {}", err));
                    break;
                }
            }
            if accumulator.is_done() {
                break;
            }
        }
        accumulator.into_response(request.operation.clone())
    }
}

#[async_trait]
impl ModelClient for OpenAICompatibleClient {
    async fn invoke(&self, config: &LLMConfig, request: &ModelRequest) -> Result<RawModelResponse> {
        tracing::debug!(
            operation = %request.operation,
            model = %config.model,
            structured = config.structured_output,
            streaming = config.streaming,
            "invoking model"
        );
        if config.structured_output {
            self.invoke_structured(config, request).await
        } else {
            self.invoke_text(config, request).await
        }
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(status_error(status, &text))
}

fn status_error(status: StatusCode, body: &str) -> AppError {
    AppError::TransportError(format!("API error ({}): {}", status, body))
}

/// 400/422 responses that complain about the schema constraint itself.
fn is_schema_rejection(status: StatusCode, body: &str) -> bool {
    if status != StatusCode::BAD_REQUEST && status != StatusCode::UNPROCESSABLE_ENTITY {
        return false;
    }
    let body = body.to_lowercase();
    body.contains("response_format") || body.contains("json_schema")
}

async fn read_completion(
    response: reqwest::Response,
    request: &ModelRequest,
    mode: InvocationMode,
) -> Result<RawModelResponse> {
    let json: Value = response
        .json()
        .await
        .map_err(|e| AppError::TransportError(format!("Failed to parse completion: {}", e)))?;

    let choice = json["choices"]
        .get(0)
        .ok_or_else(|| AppError::TransportError("Completion has no choices".to_string()))?;
    let text = choice["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let finish_reason = choice["finish_reason"].as_str().map(str::to_string);

    let response = RawModelResponse::new(request.operation.clone(), text, mode)
        .with_finish_reason(finish_reason);
    if response.truncated {
        tracing::warn!(
            operation = %request.operation,
            mode = %mode,
            "completion hit the token limit"
        );
    }
    Ok(response)
}

/// Output schema sent in structured mode: an object wrapping the case array.
pub fn output_schema() -> Value {
    let techniques: Vec<&str> = DesignTechnique::ALL.iter().map(|t| t.label()).collect();
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["test_cases"],
        "properties": {
            "test_cases": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": [
                        "title",
                        "description",
                        "preconditions",
                        "test_steps",
                        "test_type",
                        "design_technique",
                        "priority"
                    ],
                    "properties": {
                        "title": {"type": "string"},
                        "description": {"type": "string"},
                        "preconditions": {"type": "string"},
                        "test_steps": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "additionalProperties": false,
                                "required": ["action", "expected_result"],
                                "properties": {
                                    "action": {"type": "string"},
                                    "expected_result": {"type": "string"}
                                }
                            }
                        },
                        "test_type": {"type": "string", "enum": ["Positive", "Negative"]},
                        "design_technique": {"type": "string", "enum": techniques},
                        "priority": {"type": "string", "enum": ["High", "Medium", "Low"]}
                    }
                }
            }
        }
    })
}
