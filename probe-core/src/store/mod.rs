//! Persistence contract (spec §3/§6): atomic row inserts plus a
//! compare-and-set status update on `Execution`. Any storage backend that
//! can provide these is acceptable; `SqliteStore` is the one shipped here.

#[cfg(feature = "sqlite-store")]
mod schema;
#[cfg(feature = "sqlite-store")]
mod sqlite;

mod memory;

#[cfg(feature = "sqlite-store")]
pub use sqlite::SqliteStore;

pub use memory::InMemoryStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    AgentTrace, Baseline, BaselineId, DriftFinding, Embedding, Execution, ExecutionId, Finding,
    FindingId, LLMConfig, LlmConfigId, Pipeline, PipelineId,
};

/// Filters accepted by `list_findings` (spec §6 `listFindings(executionId,
/// filters)`).
#[derive(Debug, Clone, Default)]
pub struct FindingFilters {
    pub library: Option<String>,
    pub test_category: Option<String>,
    pub severity: Option<crate::model::Severity>,
}

/// Async persistence trait the engine, control surface, and drift engine
/// depend on. Object-safe so callers can hold `Arc<dyn Store>`.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_llm_config(&self, config: &LLMConfig) -> Result<()>;
    async fn get_llm_config(&self, id: LlmConfigId) -> Result<Option<LLMConfig>>;

    async fn insert_pipeline(&self, pipeline: &Pipeline) -> Result<()>;
    async fn get_pipeline(&self, id: PipelineId) -> Result<Option<Pipeline>>;

    /// Atomic single-row insert (spec §5 shared-resource policy).
    async fn insert_execution(&self, execution: &Execution) -> Result<()>;
    async fn get_execution(&self, id: ExecutionId) -> Result<Option<Execution>>;
    /// Row-level compare-and-set: callers read-modify-write through this
    /// method; the trait does not expose a separate CAS primitive because
    /// every caller in this crate already holds the authoritative row.
    async fn update_execution(&self, execution: &Execution) -> Result<()>;
    /// Most recent `Completed` execution for `(pipeline_id, llm_config_id)`
    /// with id ordinal strictly less than `before`, used by the baseline
    /// selector's `Previous` mode (spec §4.7).
    async fn previous_completed_execution(
        &self,
        pipeline_id: PipelineId,
        llm_config_id: LlmConfigId,
        before: ExecutionId,
    ) -> Result<Option<Execution>>;

    async fn insert_finding(&self, finding: &Finding) -> Result<()>;
    async fn list_findings(
        &self,
        execution_id: ExecutionId,
        filters: &FindingFilters,
    ) -> Result<Vec<Finding>>;
    async fn get_finding(&self, id: FindingId) -> Result<Option<Finding>>;

    async fn insert_embedding(&self, embedding: &Embedding) -> Result<()>;
    async fn list_embeddings(&self, execution_id: ExecutionId) -> Result<Vec<Embedding>>;

    /// Persist the tool-call sequence extracted from a Finding (spec §4.5
    /// second half, §3 `AgentTrace` — derived, not authoritative).
    async fn insert_agent_trace(&self, trace: &AgentTrace) -> Result<()>;
    async fn list_agent_traces(&self, execution_id: ExecutionId) -> Result<Vec<AgentTrace>>;

    async fn insert_baseline(&self, baseline: &Baseline) -> Result<()>;
    async fn get_baseline_by_tag(&self, tag: &str) -> Result<Option<Baseline>>;
    async fn get_baseline(&self, id: BaselineId) -> Result<Option<Baseline>>;

    /// Idempotent per `(current_execution_id, baseline_execution_id)` (spec
    /// §6): re-running `compareDrift` replaces the prior drift findings for
    /// that pair before inserting the new ones.
    async fn replace_drift_findings(
        &self,
        current_execution_id: ExecutionId,
        baseline_execution_id: ExecutionId,
        findings: Vec<DriftFinding>,
    ) -> Result<()>;
    async fn list_drift_findings(
        &self,
        current_execution_id: ExecutionId,
        baseline_execution_id: ExecutionId,
    ) -> Result<Vec<DriftFinding>>;
}
