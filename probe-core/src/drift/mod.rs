//! Drift Engine (spec §4.8): compares a current execution against a
//! baseline across five independent channels and aggregates into a unified
//! drift score.

mod agent_tool;
mod distribution;
mod embedding;
mod output;
mod safety;
mod stats;

use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{DriftFinding, ExecutionId};
use crate::scoring::{drift_score, ScoreResult};
use crate::store::Store;

/// Comparison state machine (spec §4.8.6). The five channels run as
/// independent steps; this enum documents the stages a caller can observe
/// via logging, it is not itself persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftComparisonState {
    Requested,
    Collecting,
    Computing,
    Emitting,
    Aggregated,
    Failed,
}

pub struct DriftEngine {
    store: Arc<dyn Store>,
    config: Arc<Config>,
}

impl DriftEngine {
    pub fn new(store: Arc<dyn Store>, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    /// Run `compareDrift(currentId, baselineId)` (spec §6): gathers both
    /// sides' persisted artifacts, runs every channel, replaces any prior
    /// drift findings for this pair, and returns the unified score.
    ///
    /// Idempotent per `(current, baseline)` — `Store::replace_drift_findings`
    /// deletes the prior rows for this pair before inserting the new ones.
    ///
    /// Bounded by `DRIFT_COMPARISON_TIMEOUT_SECONDS` (spec §6/§7): on elapse
    /// the comparison is abandoned and a `Timeout` error is surfaced to the
    /// caller rather than persisting a partial result.
    #[instrument(skip(self))]
    pub async fn compare(
        &self,
        current_execution_id: ExecutionId,
        baseline_execution_id: ExecutionId,
    ) -> Result<(Vec<DriftFinding>, ScoreResult)> {
        let timeout = Duration::from_secs(self.config.drift_comparison_timeout_seconds);
        match tokio::time::timeout(
            timeout,
            self.compare_inner(current_execution_id, baseline_execution_id),
        )
        .await
        {
            Ok(result) => result,
            Err(_elapsed) => {
                warn!(timeout_secs = timeout.as_secs(), "drift comparison timed out");
                Err(Error::timeout(timeout.as_millis() as u64))
            }
        }
    }

    async fn compare_inner(
        &self,
        current_execution_id: ExecutionId,
        baseline_execution_id: ExecutionId,
    ) -> Result<(Vec<DriftFinding>, ScoreResult)> {
        let filters = crate::store::FindingFilters::default();

        let current_findings = self.store.list_findings(current_execution_id, &filters).await?;
        let baseline_findings = self.store.list_findings(baseline_execution_id, &filters).await?;
        let current_embeddings = self.store.list_embeddings(current_execution_id).await?;
        let baseline_embeddings = self.store.list_embeddings(baseline_execution_id).await?;
        let current_traces = self.store.list_agent_traces(current_execution_id).await?;
        let baseline_traces = self.store.list_agent_traces(baseline_execution_id).await?;

        let mut findings = Vec::new();

        findings.extend(output::compute(
            current_execution_id,
            baseline_execution_id,
            &current_findings,
            &baseline_findings,
            self.config.drift_threshold("output"),
        ));
        findings.extend(safety::compute(
            current_execution_id,
            baseline_execution_id,
            &current_findings,
            &baseline_findings,
            self.config.drift_threshold("safety"),
        ));
        findings.extend(distribution::compute(
            current_execution_id,
            baseline_execution_id,
            &current_findings,
            &baseline_findings,
            self.config.drift_threshold("distribution"),
        ));
        findings.extend(embedding::compute(
            current_execution_id,
            baseline_execution_id,
            &current_embeddings,
            &baseline_embeddings,
            self.config.drift_threshold("embedding"),
        ));
        findings.extend(agent_tool::compute(
            current_execution_id,
            baseline_execution_id,
            &current_traces,
            &baseline_traces,
            self.config.drift_threshold("agent_tool"),
        ));

        let score = drift_score(findings.iter());

        if let Err(err) = self
            .store
            .replace_drift_findings(current_execution_id, baseline_execution_id, findings.clone())
            .await
        {
            warn!(error = %err, "failed to persist drift findings");
            return Err(err);
        }

        Ok((findings, score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Execution, ExecutionStatus, LLMConfig, Pipeline};
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn s1_empty_executions_yield_zero_drift_findings_and_100_score() {
        let store = Arc::new(InMemoryStore::new());
        let llm_config = LLMConfig::new("https://example.test", r#"{"prompt":"{prompt}"}"#);
        let pipeline = Pipeline::new(llm_config.id);
        store.insert_llm_config(&llm_config).await.unwrap();
        store.insert_pipeline(&pipeline).await.unwrap();

        let mut baseline = Execution::new_pending(pipeline.id, llm_config.id);
        baseline.status = ExecutionStatus::Completed;
        store.insert_execution(&baseline).await.unwrap();
        let current = Execution::new_pending(pipeline.id, llm_config.id);
        store.insert_execution(&current).await.unwrap();

        let engine = DriftEngine::new(store, Arc::new(crate::config::Config::default()));
        let (findings, score) = engine.compare(current.id, baseline.id).await.unwrap();
        assert!(findings.is_empty());
        assert_eq!(score.score, 100.0);
    }

    #[tokio::test]
    async fn comparing_twice_replaces_prior_findings() {
        let store = Arc::new(InMemoryStore::new());
        let llm_config = LLMConfig::new("https://example.test", r#"{"prompt":"{prompt}"}"#);
        let pipeline = Pipeline::new(llm_config.id);
        store.insert_llm_config(&llm_config).await.unwrap();
        store.insert_pipeline(&pipeline).await.unwrap();

        let mut baseline = Execution::new_pending(pipeline.id, llm_config.id);
        baseline.status = ExecutionStatus::Completed;
        store.insert_execution(&baseline).await.unwrap();
        let current = Execution::new_pending(pipeline.id, llm_config.id);
        store.insert_execution(&current).await.unwrap();

        let engine = DriftEngine::new(store.clone(), Arc::new(crate::config::Config::default()));
        engine.compare(current.id, baseline.id).await.unwrap();
        let (second_run_findings, _) = engine.compare(current.id, baseline.id).await.unwrap();
        let stored = store.list_drift_findings(current.id, baseline.id).await.unwrap();
        assert_eq!(stored.len(), second_run_findings.len());
    }

    /// Wraps a `Store` and stalls `list_findings` forever, so the comparison
    /// timeout has something to actually bound.
    struct StallingStore(Arc<dyn Store>);

    #[async_trait::async_trait]
    impl Store for StallingStore {
        async fn insert_llm_config(&self, config: &crate::model::LLMConfig) -> Result<()> {
            self.0.insert_llm_config(config).await
        }
        async fn get_llm_config(&self, id: crate::model::LlmConfigId) -> Result<Option<crate::model::LLMConfig>> {
            self.0.get_llm_config(id).await
        }
        async fn insert_pipeline(&self, pipeline: &crate::model::Pipeline) -> Result<()> {
            self.0.insert_pipeline(pipeline).await
        }
        async fn get_pipeline(&self, id: crate::model::PipelineId) -> Result<Option<crate::model::Pipeline>> {
            self.0.get_pipeline(id).await
        }
        async fn insert_execution(&self, execution: &Execution) -> Result<()> {
            self.0.insert_execution(execution).await
        }
        async fn get_execution(&self, id: ExecutionId) -> Result<Option<Execution>> {
            self.0.get_execution(id).await
        }
        async fn update_execution(&self, execution: &Execution) -> Result<()> {
            self.0.update_execution(execution).await
        }
        async fn previous_completed_execution(
            &self,
            pipeline_id: crate::model::PipelineId,
            llm_config_id: crate::model::LlmConfigId,
            before: ExecutionId,
        ) -> Result<Option<Execution>> {
            self.0.previous_completed_execution(pipeline_id, llm_config_id, before).await
        }
        async fn insert_finding(&self, finding: &crate::model::Finding) -> Result<()> {
            self.0.insert_finding(finding).await
        }
        async fn list_findings(
            &self,
            _execution_id: ExecutionId,
            _filters: &crate::store::FindingFilters,
        ) -> Result<Vec<crate::model::Finding>> {
            tokio::time::sleep(Duration::from_secs(10_000)).await;
            Ok(Vec::new())
        }
        async fn get_finding(&self, id: crate::model::FindingId) -> Result<Option<crate::model::Finding>> {
            self.0.get_finding(id).await
        }
        async fn insert_embedding(&self, embedding: &crate::model::Embedding) -> Result<()> {
            self.0.insert_embedding(embedding).await
        }
        async fn list_embeddings(&self, execution_id: ExecutionId) -> Result<Vec<crate::model::Embedding>> {
            self.0.list_embeddings(execution_id).await
        }
        async fn insert_agent_trace(&self, trace: &crate::model::AgentTrace) -> Result<()> {
            self.0.insert_agent_trace(trace).await
        }
        async fn list_agent_traces(&self, execution_id: ExecutionId) -> Result<Vec<crate::model::AgentTrace>> {
            self.0.list_agent_traces(execution_id).await
        }
        async fn insert_baseline(&self, baseline: &crate::model::Baseline) -> Result<()> {
            self.0.insert_baseline(baseline).await
        }
        async fn get_baseline_by_tag(&self, tag: &str) -> Result<Option<crate::model::Baseline>> {
            self.0.get_baseline_by_tag(tag).await
        }
        async fn get_baseline(&self, id: crate::model::BaselineId) -> Result<Option<crate::model::Baseline>> {
            self.0.get_baseline(id).await
        }
        async fn replace_drift_findings(
            &self,
            current_execution_id: ExecutionId,
            baseline_execution_id: ExecutionId,
            findings: Vec<DriftFinding>,
        ) -> Result<()> {
            self.0.replace_drift_findings(current_execution_id, baseline_execution_id, findings).await
        }
        async fn list_drift_findings(
            &self,
            current_execution_id: ExecutionId,
            baseline_execution_id: ExecutionId,
        ) -> Result<Vec<DriftFinding>> {
            self.0.list_drift_findings(current_execution_id, baseline_execution_id).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn comparison_times_out_with_timeout_error() {
        let store = Arc::new(InMemoryStore::new());
        let llm_config = LLMConfig::new("https://example.test", r#"{"prompt":"{prompt}"}"#);
        let pipeline = Pipeline::new(llm_config.id);
        store.insert_llm_config(&llm_config).await.unwrap();
        store.insert_pipeline(&pipeline).await.unwrap();

        let mut baseline = Execution::new_pending(pipeline.id, llm_config.id);
        baseline.status = ExecutionStatus::Completed;
        store.insert_execution(&baseline).await.unwrap();
        let current = Execution::new_pending(pipeline.id, llm_config.id);
        store.insert_execution(&current).await.unwrap();

        let stalling_store: Arc<dyn Store> = Arc::new(StallingStore(store));
        let mut config = crate::config::Config::default();
        config.drift_comparison_timeout_seconds = 1;
        let engine = DriftEngine::new(stalling_store, Arc::new(config));

        let err = engine.compare(current.id, baseline.id).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }
}
