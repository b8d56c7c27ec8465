use crate::domain::llm_config::LLMConfig;
use crate::domain::operation::{ApiContext, Operation};
use crate::domain::test_case::DesignTechnique;
use crate::infrastructure::llm_clients::ModelRequest;
use crate::shared::token_counter::TokenCounter;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

const PROMPT_VERSION: &str = "v1";

/// Everything the pipeline needs to ask the model about one operation.
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub payload: Value,
    pub request: ModelRequest,
    /// Stable fingerprint of prompt version, model and payload.
    pub input_digest: String,
    pub estimated_tokens: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    api: ApiContext,
}

impl ContextBuilder {
    pub fn new(api: ApiContext) -> Self {
        Self { api }
    }

    pub fn build(&self, operation: &Operation, config: &LLMConfig) -> OperationContext {
        let reference = operation.reference();
        let payload = json!({
            "path": operation.path,
            "method": reference.method,
            "operation": operation,
            "api_context": self.api,
        });
        let payload_text =
            serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());

        let system_prompt = build_system_prompt();
        let user_prompt = build_user_prompt(&payload_text);

        let estimated_tokens = TokenCounter::estimate_messages_tokens(&[
            ("system", system_prompt.as_str()),
            ("user", user_prompt.as_str()),
        ]);
        let reserved = config.max_tokens as usize;
        if !TokenCounter::fits_in_context(estimated_tokens, reserved, config.context_window) {
            tracing::warn!(
                operation = %reference,
                estimated_tokens,
                max_tokens = config.max_tokens,
                context_window = config.context_window,
                "prompt and response budget exceed the context window"
            );
        } else {
            tracing::debug!(
                operation = %reference,
                estimated_tokens,
                remaining = TokenCounter::estimate_remaining(
                    estimated_tokens,
                    config.context_window,
                    reserved
                ),
                "operation context built"
            );
        }

        OperationContext {
            input_digest: input_digest(&config.model, &payload_text),
            payload,
            request: ModelRequest {
                operation: reference,
                system_prompt,
                user_prompt,
            },
            estimated_tokens,
        }
    }
}

fn input_digest(model: &str, payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(PROMPT_VERSION.as_bytes());
    hasher.update(b"::");
    hasher.update(model.as_bytes());
    hasher.update(b"::");
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

pub(crate) fn build_system_prompt() -> String {
    let techniques = DesignTechnique::ALL
        .iter()
        .map(|technique| format!("\"{}\"", technique.label()))
        .collect::<Vec<_>>()
        .join(" | ");

    let mut prompt = String::new();
    prompt.push_str(
        "You are a senior QA engineer. Design positive and negative test cases for the API \
         operation you are given.\n\n",
    );
    prompt.push_str("Apply every test-design technique that fits the operation:\n");
    prompt.push_str("1. Equivalence Partitioning (EP): valid and invalid classes per parameter\n");
    prompt.push_str(
        "2. Boundary Value Analysis (BVA): min-1, min, min+1, max-1, max, max+1 for numbers and lengths\n",
    );
    prompt.push_str(
        "3. Error Guessing: missing or invalid auth, injection payloads, malformed bodies\n",
    );
    prompt.push_str("4. Decision Table Testing: combinations of required and optional fields\n");
    prompt.push_str("5. Pairwise Testing: every pair of parameter values covered at least once\n");
    prompt.push_str(
        "6. State Transition Testing: valid and invalid resource transitions when applicable\n\n",
    );
    prompt.push_str(
        "Negative cases cover every parameter: missing required fields, wrong types, values \
         outside enums, invalid formats (email, uuid, date-time, url), auth failures, \
         unknown ids (404) and conflicts (409).\n\n",
    );
    prompt.push_str("Return only JSON: an object with a single key \"test_cases\" holding an array. Each item:\n");
    prompt.push_str("{\n");
    prompt.push_str("  \"title\": \"Short name of the scenario\",\n");
    prompt.push_str("  \"description\": \"What the case verifies\",\n");
    prompt.push_str("  \"preconditions\": \"Setup required before the test\",\n");
    prompt.push_str("  \"test_steps\": [{\"action\": \"Request to send\", \"expected_result\": \"Expected status and body\"}],\n");
    prompt.push_str("  \"test_type\": \"Positive\" | \"Negative\",\n");
    prompt.push_str(&format!("  \"design_technique\": {},\n", techniques));
    prompt.push_str("  \"priority\": \"High\" | \"Medium\" | \"Low\"\n");
    prompt.push_str("}\n\n");
    prompt.push_str(
        "Priority: High for baseline positives and critical negatives (auth, data types), \
         Medium for most boundary and validation cases, Low for rare combinations.\n",
    );
    prompt
}

pub(crate) fn build_user_prompt(payload: &str) -> String {
    let mut body = String::new();
    body.push_str("Generate test cases for this API operation:\n\n");
    body.push_str("```json\n");
    body.push_str(payload);
    body.push_str("\n```\n\n");
    body.push_str("Rules:\n");
    body.push_str("- Cover both Positive and Negative scenarios.\n");
    body.push_str("- One idea per case; no two cases may verify the same scenario.\n");
    body.push_str("- Include every boundary of every numeric or length constraint.\n");
    body.push_str("- Every case needs at least one step with an action and an expected result.\n");
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::operation::{Parameter, ParameterConstraints, ParameterLocation};

    fn create_user() -> Operation {
        let mut operation = Operation::new("post", "/users");
        operation.summary = Some("Create user".to_string());
        operation.parameters.push(Parameter {
            name: "age".to_string(),
            location: ParameterLocation::Body,
            schema_type: Some("integer".to_string()),
            format: None,
            description: None,
            required: false,
            constraints: ParameterConstraints {
                minimum: Some(0.0),
                maximum: Some(130.0),
                ..ParameterConstraints::default()
            },
        });
        operation
    }

    #[test]
    fn test_payload_carries_operation_and_api_context() {
        let builder = ContextBuilder::new(ApiContext {
            title: Some("Users API".to_string()),
            ..ApiContext::default()
        });
        let context = builder.build(&create_user(), &LLMConfig::default());
        assert_eq!(context.payload["method"], "POST");
        assert_eq!(context.payload["path"], "/users");
        assert_eq!(
            context.payload["operation"]["parameters"][0]["constraints"]["maximum"],
            130.0
        );
        assert_eq!(context.payload["api_context"]["title"], "Users API");
        assert_eq!(context.request.operation.to_string(), "POST /users");
        assert!(context.request.user_prompt.contains("\"maximum\": 130.0"));
    }

    #[test]
    fn test_system_prompt_lists_all_techniques() {
        let prompt = build_system_prompt();
        for technique in DesignTechnique::ALL {
            assert!(prompt.contains(technique.label()));
        }
        assert!(prompt.contains("test_cases"));
    }

    #[test]
    fn test_digest_is_stable_and_model_sensitive() {
        let builder = ContextBuilder::default();
        let config = LLMConfig::default();
        let first = builder.build(&create_user(), &config);
        let second = builder.build(&create_user(), &config);
        assert_eq!(first.input_digest, second.input_digest);
        assert_eq!(first.input_digest.len(), 64);

        let other = LLMConfig {
            model: "other/model".to_string(),
            ..LLMConfig::default()
        };
        assert_ne!(builder.build(&create_user(), &other).input_digest, first.input_digest);
    }

    #[test]
    fn test_token_estimate_is_positive() {
        let context = ContextBuilder::default().build(&create_user(), &LLMConfig::default());
        assert!(context.estimated_tokens > 100);
    }
}
