use crate::application::use_cases::case_validator::validate;
use crate::application::use_cases::context_builder::ContextBuilder;
use crate::application::use_cases::response_recovery::{recover_response, Recovery};
use crate::domain::generation_config::GenerationConfig;
use crate::domain::llm_config::LLMConfig;
use crate::domain::operation::{Operation, OperationRef};
use crate::domain::run_manifest::{OperationReport, OperationStatus};
use crate::domain::test_case::TestCase;
use crate::infrastructure::llm_clients::ModelClient;
use std::sync::Arc;

/// Result of one operation's pipeline: its accepted cases and its manifest entry.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub cases: Vec<TestCase>,
    pub report: OperationReport,
}

impl PipelineOutcome {
    fn failed(report: OperationReport) -> Self {
        Self {
            cases: Vec::new(),
            report,
        }
    }
}

/// Invoke, recover and validate for a single operation. Never fails: every
/// problem ends up in the returned report.
pub struct OperationPipeline {
    client: Arc<dyn ModelClient>,
    llm: LLMConfig,
    generation: GenerationConfig,
    contexts: ContextBuilder,
}

impl OperationPipeline {
    pub fn new(
        client: Arc<dyn ModelClient>,
        llm: LLMConfig,
        generation: GenerationConfig,
        contexts: ContextBuilder,
    ) -> Self {
        Self {
            client,
            llm,
            generation,
            contexts,
        }
    }

    pub async fn run(&self, operation: &Operation) -> PipelineOutcome {
        let context = self.contexts.build(operation, &self.llm);
        let reference = context.request.operation.clone();
        let mut report = OperationReport::new(reference.clone());
        report.input_digest = Some(context.input_digest.clone());

        let max_attempts = self.generation.retry_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            report.attempts = attempt;

            let mut response = match self.client.invoke(&self.llm, &context.request).await {
                Ok(response) => response,
                Err(err) => {
                    if err.is_transport() && attempt < max_attempts {
                        tracing::warn!(
                            operation = %reference,
                            attempt,
                            max_attempts,
                            error = %err,
                            "model call failed, retrying"
                        );
                        self.back_off(attempt).await;
                        continue;
                    }
                    tracing::error!(
                        operation = %reference,
                        attempts = attempt,
                        error = %err,
                        "model call failed"
                    );
                    report.status = OperationStatus::TransportFailed;
                    report.error = Some(err.to_string());
                    return PipelineOutcome::failed(report);
                }
            };

            let recovered = tokio::task::spawn_blocking(move || {
                let recovery = recover_response(&mut response);
                (response, recovery)
            })
            .await;
            let (response, recovery) = match recovered {
                Ok(pair) => pair,
                Err(err) => {
                    tracing::error!(operation = %reference, error = %err, "response recovery task failed");
                    report.status = OperationStatus::Aborted;
                    report.error = Some(format!("response recovery failed: {}", err));
                    return PipelineOutcome::failed(report);
                }
            };
            if recovery.is_exhausted() {
                report.truncated = response.truncated;
                if attempt < max_attempts {
                    tracing::warn!(
                        operation = %reference,
                        attempt,
                        max_attempts,
                        truncated = response.truncated,
                        "no test cases could be recovered from the response, retrying"
                    );
                    self.back_off(attempt).await;
                    continue;
                }
                tracing::error!(
                    operation = %reference,
                    attempts = attempt,
                    "no test cases could be recovered from the response"
                );
                report.status = OperationStatus::RecoveryExhausted;
                report.error = Some("no recovery strategy produced a candidate".to_string());
                return PipelineOutcome::failed(report);
            }

            return validate_candidates(&reference, recovery, response.truncated, report);
        }
    }

    async fn back_off(&self, attempt: u32) {
        let delay = self.generation.retry_delay(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn validate_candidates(
    reference: &OperationRef,
    recovery: Recovery,
    truncated: bool,
    mut report: OperationReport,
) -> PipelineOutcome {
    let mut cases = Vec::with_capacity(recovery.candidates.len());
    for candidate in &recovery.candidates {
        match validate(candidate, reference) {
            Ok(validated) => {
                for warning in &validated.warnings {
                    tracing::debug!(
                        operation = %reference,
                        title = %validated.case.title,
                        warning = %warning,
                        "test case salvaged"
                    );
                }
                report.warnings += validated.warnings.len();
                cases.push(validated.case);
            }
            Err(reason) => {
                report.rejected += 1;
                tracing::warn!(operation = %reference, reason = %reason, "candidate rejected");
            }
        }
    }

    report.candidates = recovery.candidates.len();
    report.accepted = cases.len();
    report.strategy = recovery.strategy;
    report.truncated = truncated;
    report.status = if cases.is_empty() {
        OperationStatus::NoValidCases
    } else if truncated || report.rejected > 0 {
        OperationStatus::Partial
    } else {
        OperationStatus::Completed
    };

    tracing::info!(
        operation = %reference,
        status = %report.status,
        accepted = report.accepted,
        rejected = report.rejected,
        truncated,
        strategy = ?report.strategy,
        "operation finished"
    );

    PipelineOutcome { cases, report }
}
