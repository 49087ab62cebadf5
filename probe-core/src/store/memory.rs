//! In-process `Store` used by tests and doctests (teacher's `in_memory()`
//! convention, without the SQLite dependency).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::model::{
    AgentTrace, Baseline, BaselineId, DriftFinding, Embedding, Execution, ExecutionId,
    ExecutionStatus, Finding, FindingId, LLMConfig, LlmConfigId, Pipeline, PipelineId,
};

use super::{FindingFilters, Store};

#[derive(Default)]
struct Inner {
    llm_configs: HashMap<LlmConfigId, LLMConfig>,
    pipelines: HashMap<PipelineId, Pipeline>,
    executions: HashMap<ExecutionId, Execution>,
    execution_order: Vec<ExecutionId>,
    findings: HashMap<FindingId, Finding>,
    embeddings: Vec<Embedding>,
    agent_traces: Vec<AgentTrace>,
    baselines: HashMap<BaselineId, Baseline>,
    baseline_tags: HashMap<String, BaselineId>,
    drift_findings: HashMap<(ExecutionId, ExecutionId), Vec<DriftFinding>>,
}

/// Test double for `Store`: everything lives in an in-process `Mutex`.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_llm_config(&self, config: &LLMConfig) -> Result<()> {
        self.lock().llm_configs.insert(config.id, config.clone());
        Ok(())
    }

    async fn get_llm_config(&self, id: LlmConfigId) -> Result<Option<LLMConfig>> {
        Ok(self.lock().llm_configs.get(&id).cloned())
    }

    async fn insert_pipeline(&self, pipeline: &Pipeline) -> Result<()> {
        self.lock().pipelines.insert(pipeline.id, pipeline.clone());
        Ok(())
    }

    async fn get_pipeline(&self, id: PipelineId) -> Result<Option<Pipeline>> {
        Ok(self.lock().pipelines.get(&id).cloned())
    }

    async fn insert_execution(&self, execution: &Execution) -> Result<()> {
        let mut inner = self.lock();
        if inner.executions.contains_key(&execution.id) {
            return Err(Error::persistence(format!(
                "execution {} already exists",
                execution.id
            )));
        }
        inner.execution_order.push(execution.id);
        inner.executions.insert(execution.id, execution.clone());
        Ok(())
    }

    async fn get_execution(&self, id: ExecutionId) -> Result<Option<Execution>> {
        Ok(self.lock().executions.get(&id).cloned())
    }

    async fn update_execution(&self, execution: &Execution) -> Result<()> {
        let mut inner = self.lock();
        if !inner.executions.contains_key(&execution.id) {
            inner.execution_order.push(execution.id);
        }
        inner.executions.insert(execution.id, execution.clone());
        Ok(())
    }

    async fn previous_completed_execution(
        &self,
        pipeline_id: PipelineId,
        llm_config_id: LlmConfigId,
        before: ExecutionId,
    ) -> Result<Option<Execution>> {
        let inner = self.lock();
        let before_ordinal = inner
            .execution_order
            .iter()
            .position(|id| *id == before)
            .unwrap_or(inner.execution_order.len());

        let candidate = inner
            .execution_order
            .iter()
            .take(before_ordinal)
            .rev()
            .filter_map(|id| inner.executions.get(id))
            .find(|execution| {
                execution.pipeline_id == pipeline_id
                    && execution.llm_config_id == llm_config_id
                    && execution.status == ExecutionStatus::Completed
            })
            .cloned();
        Ok(candidate)
    }

    async fn insert_finding(&self, finding: &Finding) -> Result<()> {
        self.lock().findings.insert(finding.id, finding.clone());
        Ok(())
    }

    async fn list_findings(
        &self,
        execution_id: ExecutionId,
        filters: &FindingFilters,
    ) -> Result<Vec<Finding>> {
        let inner = self.lock();
        let mut findings: Vec<Finding> = inner
            .findings
            .values()
            .filter(|f| f.execution_id == execution_id)
            .filter(|f| {
                filters
                    .library
                    .as_ref()
                    .map(|l| &f.library == l)
                    .unwrap_or(true)
            })
            .filter(|f| {
                filters
                    .test_category
                    .as_ref()
                    .map(|c| &f.test_category == c)
                    .unwrap_or(true)
            })
            .filter(|f| filters.severity.map(|s| f.severity == s).unwrap_or(true))
            .cloned()
            .collect();
        findings.sort_by_key(|f| f.created_at);
        Ok(findings)
    }

    async fn get_finding(&self, id: FindingId) -> Result<Option<Finding>> {
        Ok(self.lock().findings.get(&id).cloned())
    }

    async fn insert_embedding(&self, embedding: &Embedding) -> Result<()> {
        self.lock().embeddings.push(embedding.clone());
        Ok(())
    }

    async fn list_embeddings(&self, execution_id: ExecutionId) -> Result<Vec<Embedding>> {
        let inner = self.lock();
        let finding_ids: std::collections::HashSet<FindingId> = inner
            .findings
            .values()
            .filter(|f| f.execution_id == execution_id)
            .map(|f| f.id)
            .collect();
        Ok(inner
            .embeddings
            .iter()
            .filter(|e| finding_ids.contains(&e.finding_id))
            .cloned()
            .collect())
    }

    async fn insert_agent_trace(&self, trace: &AgentTrace) -> Result<()> {
        self.lock().agent_traces.push(trace.clone());
        Ok(())
    }

    async fn list_agent_traces(&self, execution_id: ExecutionId) -> Result<Vec<AgentTrace>> {
        let inner = self.lock();
        let finding_ids: std::collections::HashSet<FindingId> = inner
            .findings
            .values()
            .filter(|f| f.execution_id == execution_id)
            .map(|f| f.id)
            .collect();
        Ok(inner
            .agent_traces
            .iter()
            .filter(|t| finding_ids.contains(&t.finding_id))
            .cloned()
            .collect())
    }

    async fn insert_baseline(&self, baseline: &Baseline) -> Result<()> {
        let mut inner = self.lock();
        if let Some(tag) = &baseline.tag {
            if inner.baseline_tags.contains_key(tag) {
                return Err(Error::persistence(format!(
                    "baseline tag {tag:?} already in use"
                )));
            }
            inner.baseline_tags.insert(tag.clone(), baseline.id);
        }
        inner.baselines.insert(baseline.id, baseline.clone());
        Ok(())
    }

    async fn get_baseline_by_tag(&self, tag: &str) -> Result<Option<Baseline>> {
        let inner = self.lock();
        Ok(inner
            .baseline_tags
            .get(tag)
            .and_then(|id| inner.baselines.get(id))
            .cloned())
    }

    async fn get_baseline(&self, id: BaselineId) -> Result<Option<Baseline>> {
        Ok(self.lock().baselines.get(&id).cloned())
    }

    async fn replace_drift_findings(
        &self,
        current_execution_id: ExecutionId,
        baseline_execution_id: ExecutionId,
        findings: Vec<DriftFinding>,
    ) -> Result<()> {
        self.lock()
            .drift_findings
            .insert((current_execution_id, baseline_execution_id), findings);
        Ok(())
    }

    async fn list_drift_findings(
        &self,
        current_execution_id: ExecutionId,
        baseline_execution_id: ExecutionId,
    ) -> Result<Vec<DriftFinding>> {
        Ok(self
            .lock()
            .drift_findings
            .get(&(current_execution_id, baseline_execution_id))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Execution, LLMConfig, Pipeline};

    #[tokio::test]
    async fn insert_and_fetch_execution_round_trips() {
        let store = InMemoryStore::new();
        let llm_config = LLMConfig::new("https://example.test", r#"{"prompt":"{prompt}"}"#);
        let pipeline = Pipeline::new(llm_config.id);
        let execution = Execution::new_pending(pipeline.id, llm_config.id);

        store.insert_execution(&execution).await.unwrap();
        let fetched = store.get_execution(execution.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, execution.id);
        assert_eq!(fetched.status, ExecutionStatus::Pending);
    }

    #[tokio::test]
    async fn duplicate_insert_execution_is_rejected() {
        let store = InMemoryStore::new();
        let llm_config = LLMConfig::new("https://example.test", r#"{"prompt":"{prompt}"}"#);
        let pipeline = Pipeline::new(llm_config.id);
        let execution = Execution::new_pending(pipeline.id, llm_config.id);

        store.insert_execution(&execution).await.unwrap();
        assert!(store.insert_execution(&execution).await.is_err());
    }

    #[tokio::test]
    async fn previous_completed_execution_respects_ordering_and_status() {
        let store = InMemoryStore::new();
        let llm_config = LLMConfig::new("https://example.test", r#"{"prompt":"{prompt}"}"#);
        let pipeline = Pipeline::new(llm_config.id);

        let mut first = Execution::new_pending(pipeline.id, llm_config.id);
        first.status = ExecutionStatus::Completed;
        store.insert_execution(&first).await.unwrap();

        let second = Execution::new_pending(pipeline.id, llm_config.id);
        store.insert_execution(&second).await.unwrap();

        let previous = store
            .previous_completed_execution(pipeline.id, llm_config.id, second.id)
            .await
            .unwrap();
        assert_eq!(previous.unwrap().id, first.id);
    }

    #[tokio::test]
    async fn duplicate_baseline_tag_is_rejected() {
        let store = InMemoryStore::new();
        let llm_config = LLMConfig::new("https://example.test", r#"{"prompt":"{prompt}"}"#);
        let pipeline = Pipeline::new(llm_config.id);
        let mut execution = Execution::new_pending(pipeline.id, llm_config.id);
        execution.status = ExecutionStatus::Completed;
        store.insert_execution(&execution).await.unwrap();

        let baseline_a = Baseline::new(execution.id, "a").with_tag("prod");
        let baseline_b = Baseline::new(execution.id, "b").with_tag("prod");
        store.insert_baseline(&baseline_a).await.unwrap();
        assert!(store.insert_baseline(&baseline_b).await.is_err());
    }
}
