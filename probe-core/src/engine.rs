//! Execution Engine (spec §4.4/§5): fans a pipeline's work set out onto a
//! bounded worker pool, normalizes and persists findings, and drives the
//! execution state machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{error, info, instrument, warn};

use crate::embedding_client::EmbeddingClient;
use crate::error::{Error, Result};
use crate::model::{Execution, ExecutionStatus, Finding, LLMConfig, Pipeline};
use crate::normalizer::normalize;
use crate::registry::Registry;
use crate::store::Store;
use crate::trace::TraceExtractor;

/// Default worker pool size (spec §4.4): `W = 8`.
pub const DEFAULT_WORKER_PARALLELISM: usize = 8;

/// Per-job budget for the execution-wide timeout (spec §5: "300s×|workset|").
/// An empty work set still gets one job's worth of budget rather than
/// timing out instantly.
pub const EXECUTION_TIMEOUT_SECONDS_PER_JOB: u64 = 300;

/// Cooperative cancel signal observed by workers between jobs, never
/// mid-HTTP (spec §4.4 Cancellation).
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Engine {
    registry: Arc<Registry>,
    store: Arc<dyn Store>,
    worker_parallelism: usize,
    execution_timeout_seconds_per_job: u64,
    embedding_client: Option<Arc<EmbeddingClient>>,
    enable_agent_traces: bool,
}

impl Engine {
    pub fn new(registry: Arc<Registry>, store: Arc<dyn Store>) -> Self {
        Self {
            registry,
            store,
            worker_parallelism: DEFAULT_WORKER_PARALLELISM,
            execution_timeout_seconds_per_job: EXECUTION_TIMEOUT_SECONDS_PER_JOB,
            embedding_client: None,
            enable_agent_traces: false,
        }
    }

    pub fn with_worker_parallelism(mut self, parallelism: usize) -> Self {
        self.worker_parallelism = parallelism.max(1);
        self
    }

    /// Override the per-job timeout budget (spec §5: `300s × |workset|`).
    /// Exposed for tests; production callers should leave the spec default.
    pub fn with_execution_timeout_per_job(mut self, seconds: u64) -> Self {
        self.execution_timeout_seconds_per_job = seconds;
        self
    }

    /// Wire in the embedding service client for the post-execution
    /// embedding hook (spec §4.5). Omitted entirely when no embedding
    /// service is configured — the hook then simply does not run.
    pub fn with_embedding_client(mut self, embedding_client: Arc<EmbeddingClient>) -> Self {
        self.embedding_client = Some(embedding_client);
        self
    }

    pub fn with_agent_traces_enabled(mut self, enabled: bool) -> Self {
        self.enable_agent_traces = enabled;
        self
    }

    /// Run `RunExecution(executionId)` (spec §4.4). The execution row must
    /// already exist in `Pending` state.
    #[instrument(skip(self, pipeline, llm_config, cancel))]
    pub async fn run_execution(
        &self,
        mut execution: Execution,
        pipeline: &Pipeline,
        llm_config: &LLMConfig,
        cancel: CancelToken,
    ) -> Result<Execution> {
        execution.status = ExecutionStatus::Running;
        execution.started_at = Some(chrono::Utc::now());
        self.store.update_execution(&execution).await?;

        let work_set = self.registry.work_set(
            pipeline.libraries.iter().map(String::as_str),
            pipeline.test_categories.iter().map(String::as_str),
        );
        let job_count = work_set.len();
        info!(jobs = job_count, "computed execution work set");

        let semaphore = Arc::new(Semaphore::new(self.worker_parallelism));
        let tasks = work_set.into_iter().map(|(library, category)| {
            let semaphore = Arc::clone(&semaphore);
            let registry = Arc::clone(&self.registry);
            let cancel = cancel.clone();
            let llm_config = llm_config.clone();
            let execution_id = execution.id;

            async move {
                if cancel.is_cancelled() {
                    return Vec::new();
                }
                let _permit = semaphore
                    .acquire()
                    .await
                    .expect("engine semaphore closed unexpectedly");

                let raw_findings = match registry.get(&library) {
                    Some(adapter) => adapter.execute(&llm_config, &category).await,
                    None => Vec::new(),
                };

                raw_findings
                    .into_iter()
                    .map(|raw| normalize(raw, execution_id))
                    .collect::<Vec<Finding>>()
            }
        });

        // spec §5: a per-execution timeout of `300s × |workset|` cancels the
        // fan-out and fails the execution rather than running unbounded.
        let timeout = Duration::from_secs(self.execution_timeout_seconds_per_job * job_count.max(1) as u64);
        match tokio::time::timeout(timeout, join_all(tasks)).await {
            Ok(results) => {
                let findings: Vec<Finding> = results.into_iter().flatten().collect();
                let persistence_result = self.persist_findings(&execution, findings.clone()).await;

                match persistence_result {
                    Ok(()) => {
                        execution.status = if cancel.is_cancelled() {
                            ExecutionStatus::Cancelled
                        } else {
                            ExecutionStatus::Completed
                        };
                        // Post-execution hooks (spec §4.4 step 5): best-effort, never
                        // downgrade a Completed execution on their account.
                        self.run_post_execution_hooks(&findings).await;
                    }
                    Err(err) => {
                        error!(error = %err, "persistence failure during execution");
                        execution.status = ExecutionStatus::Failed;
                        execution.error_message = Some(err.to_string());
                    }
                }
            }
            Err(_elapsed) => {
                cancel.cancel();
                warn!(job_count, timeout_secs = timeout.as_secs(), "execution timed out, cancelling workers");
                execution.status = ExecutionStatus::Failed;
                execution.error_message = Some(Error::timeout(timeout.as_millis() as u64).to_string());
            }
        }
        execution.completed_at = Some(chrono::Utc::now());
        self.store.update_execution(&execution).await?;

        Ok(execution)
    }

    async fn run_post_execution_hooks(&self, findings: &[Finding]) {
        if let Some(embedding_client) = &self.embedding_client {
            let embeddings = embedding_client.embed_findings(findings).await;
            for embedding in embeddings {
                if let Err(err) = self.store.insert_embedding(&embedding).await {
                    error!(error = %err, "failed to persist embedding, continuing without it");
                }
            }
        }

        if self.enable_agent_traces {
            let extractor = TraceExtractor::new(Arc::clone(&self.store));
            if let Err(err) = extractor.extract_and_persist(findings).await {
                error!(error = %err, "failed to persist agent traces, continuing without them");
            }
        }
    }

    async fn persist_findings(&self, execution: &Execution, findings: Vec<Finding>) -> Result<()> {
        if !execution.status.accepts_findings() {
            return Ok(());
        }
        for finding in findings {
            self.store.insert_finding(&finding).await?;
        }
        Ok(())
    }
}
