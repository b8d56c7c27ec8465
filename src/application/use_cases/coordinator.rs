//! Fan-out of one pipeline per operation under an optional concurrency ceiling.
//!
//! Results come back as task return values and are merged in operation order
//! once every task is terminal. Cancellation aborts whatever is still running
//! and keeps what already finished.

use crate::application::use_cases::context_builder::ContextBuilder;
use crate::application::use_cases::deduplicator::Deduplicator;
use crate::application::use_cases::pipeline::{OperationPipeline, PipelineOutcome};
use crate::domain::app_config::AppConfig;
use crate::domain::generation_config::GenerationConfig;
use crate::domain::operation::{ApiContext, Operation, OperationRef};
use crate::domain::run_manifest::{OperationReport, OperationStatus, RunManifest};
use crate::domain::test_case::TestCase;
use crate::infrastructure::llm_clients::ModelClient;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct GenerationRun {
    pub cases: Vec<TestCase>,
    pub manifest: RunManifest,
}

pub struct GenerationCoordinator {
    pipeline: Arc<OperationPipeline>,
    generation: GenerationConfig,
}

impl GenerationCoordinator {
    pub fn new(client: Arc<dyn ModelClient>, config: &AppConfig, api: ApiContext) -> Self {
        let pipeline = OperationPipeline::new(
            client,
            config.llm.clone(),
            config.generation.clone(),
            ContextBuilder::new(api),
        );
        Self {
            pipeline: Arc::new(pipeline),
            generation: config.generation.clone(),
        }
    }

    pub async fn run(&self, operations: Vec<Operation>) -> GenerationRun {
        self.run_until(operations, std::future::pending::<()>()).await
    }

    /// Runs every operation until done or until `shutdown` resolves.
    pub async fn run_until<F>(&self, operations: Vec<Operation>, shutdown: F) -> GenerationRun
    where
        F: Future<Output = ()>,
    {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();
        let total = operations.len();
        let ceiling = self.generation.concurrency_ceiling();
        match ceiling {
            Some(limit) => tracing::info!(run_id = %run_id, total, limit, "parallel requests limited"),
            None => tracing::info!(run_id = %run_id, total, "parallel requests unlimited"),
        }

        let semaphore = ceiling.map(|limit| Arc::new(Semaphore::new(limit)));
        let references: Vec<OperationRef> = operations.iter().map(Operation::reference).collect();

        let mut tasks = JoinSet::new();
        for (index, operation) in operations.into_iter().enumerate() {
            let pipeline = Arc::clone(&self.pipeline);
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                // The semaphore is never closed, so acquisition only waits.
                let _permit = match semaphore {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                tracing::info!(
                    progress = %format!("{}/{}", index + 1, total),
                    operation = %operation.reference(),
                    "processing operation"
                );
                (index, pipeline.run(&operation).await)
            });
        }

        let mut outcomes: Vec<Option<PipelineOutcome>> = (0..total).map(|_| None).collect();
        let mut cancelled = false;
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((index, outcome))) => outcomes[index] = Some(outcome),
                    Some(Err(err)) if err.is_panic() => {
                        tracing::error!(error = %err, "pipeline task panicked");
                    }
                    Some(Err(_)) => {}
                },
                _ = &mut shutdown, if !cancelled => {
                    tracing::warn!(
                        in_flight = tasks.len(),
                        "cancellation requested, aborting unfinished operations"
                    );
                    cancelled = true;
                    tasks.abort_all();
                }
            }
        }

        let mut reports = Vec::with_capacity(total);
        let mut cases = Vec::new();
        for (reference, outcome) in references.into_iter().zip(outcomes) {
            match outcome {
                Some(outcome) => {
                    cases.extend(outcome.cases);
                    reports.push(outcome.report);
                }
                None if cancelled => reports.push(OperationReport::terminal(
                    reference,
                    OperationStatus::Cancelled,
                    "run cancelled before the operation finished",
                )),
                None => reports.push(OperationReport::terminal(
                    reference,
                    OperationStatus::Aborted,
                    "pipeline task stopped without a result",
                )),
            }
        }

        let (cases, duplicates_removed) = if self.generation.enable_deduplication {
            let outcome = Deduplicator::new(self.generation.dedup).dedup(cases);
            if outcome.removed > 0 {
                tracing::info!(removed = outcome.removed, "duplicate test cases removed");
            }
            (outcome.cases, outcome.removed)
        } else {
            (cases, 0)
        };

        let manifest = RunManifest {
            run_id,
            started_at,
            finished_at: Utc::now(),
            cancelled,
            duplicates_removed,
            operations: reports,
        };
        tracing::info!(
            run_id = %manifest.run_id,
            cases = cases.len(),
            failed = manifest.failed().count(),
            cancelled,
            "generation run finished"
        );

        GenerationRun { cases, manifest }
    }
}
