//! Control surface (spec §6): the procedural operations a CRUD API would
//! expose over the core. Out of scope are HTTP/REST framing, auth, and
//! persistence schema beyond what `Store` already captures — this module is
//! the in-process facade that makes those five operations callable without
//! inventing that outer layer.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;

use crate::baseline_selector::BaselineSelector;
use crate::config::Config;
use crate::drift::DriftEngine;
use crate::engine::{CancelToken, Engine};
use crate::error::{Error, Result};
use crate::model::{
    BaselineRef, DriftFinding, Execution, ExecutionId, Finding, Grade, LLMConfig, LlmConfigId,
    Pipeline, PipelineId, Severity,
};
use crate::scoring::{safety_score, safety_sub_scores_by_category, safety_sub_scores_by_library, severity_counts};
use crate::store::{FindingFilters, Store};

/// `summarize(executionId)` response shape (spec §6).
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    pub total: usize,
    pub by_severity: HashMap<Severity, usize>,
    pub by_library: HashMap<String, usize>,
    pub by_category: HashMap<String, usize>,
    pub safety_score: f64,
    pub safety_grade: Grade,
    pub sub_scores_by_library: HashMap<String, (f64, Grade)>,
    pub sub_scores_by_category: HashMap<String, (f64, Grade)>,
    pub drift_score: Option<f64>,
    pub drift_grade: Option<Grade>,
}

pub struct Control {
    store: Arc<dyn Store>,
    engine: Arc<Engine>,
    config: Arc<Config>,
    cancel_tokens: std::sync::Mutex<HashMap<ExecutionId, CancelToken>>,
}

impl Control {
    pub fn new(store: Arc<dyn Store>, engine: Arc<Engine>, config: Arc<Config>) -> Self {
        Self {
            store,
            engine,
            config,
            cancel_tokens: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// `startExecution(pipelineId, llmConfigId) → executionId` (spec §6).
    /// Creates the Pending row and runs the execution to completion. The
    /// CRUD layer that owns scheduling is out of scope; this call does both
    /// synchronously for an embedded caller.
    #[instrument(skip(self))]
    pub async fn start_execution(&self, pipeline_id: PipelineId, llm_config_id: LlmConfigId) -> Result<ExecutionId> {
        let pipeline = self
            .store
            .get_pipeline(pipeline_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("pipeline {pipeline_id} not found")))?;
        let llm_config = self
            .store
            .get_llm_config(llm_config_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("llm config {llm_config_id} not found")))?;

        let execution = Execution::new_pending(pipeline_id, llm_config_id);
        self.store.insert_execution(&execution).await?;
        let execution_id = execution.id;

        let cancel = CancelToken::new();
        self.cancel_tokens.lock().unwrap().insert(execution_id, cancel.clone());

        self.engine.run_execution(execution, &pipeline, &llm_config, cancel).await?;

        Ok(execution_id)
    }

    /// `cancelExecution(executionId)` (spec §6): idempotent.
    pub fn cancel_execution(&self, execution_id: ExecutionId) {
        if let Some(token) = self.cancel_tokens.lock().unwrap().get(&execution_id) {
            token.cancel();
        }
    }

    /// `compareDrift(currentId, BaselineRef) → driftFindings[]` (spec §6).
    #[instrument(skip(self, baseline_ref))]
    pub async fn compare_drift(
        &self,
        current_execution_id: ExecutionId,
        baseline_ref: BaselineRef,
    ) -> Result<(Vec<DriftFinding>, f64, Grade)> {
        let current_execution = self
            .store
            .get_execution(current_execution_id)
            .await?
            .ok_or_else(|| Error::baseline_not_found(format!("execution {current_execution_id} not found")))?;

        let selector = BaselineSelector::new(Arc::clone(&self.store));
        let baseline_execution_id = selector.resolve(&current_execution, &baseline_ref, false).await?;

        let drift_engine = DriftEngine::new(Arc::clone(&self.store), Arc::clone(&self.config));
        let (findings, score) = drift_engine.compare(current_execution_id, baseline_execution_id).await?;

        Ok((findings, score.score, score.grade))
    }

    /// `listFindings(executionId, filters)` (spec §6): read-only.
    pub async fn list_findings(&self, execution_id: ExecutionId, filters: &FindingFilters) -> Result<Vec<Finding>> {
        self.store.list_findings(execution_id, filters).await
    }

    /// `summarize(executionId)` (spec §6).
    #[instrument(skip(self))]
    pub async fn summarize(&self, execution_id: ExecutionId) -> Result<ExecutionSummary> {
        let execution = self
            .store
            .get_execution(execution_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("execution {execution_id} not found")))?;

        let findings = self
            .store
            .list_findings(execution_id, &FindingFilters::default())
            .await?;

        let mut by_library: HashMap<String, usize> = HashMap::new();
        let mut by_category: HashMap<String, usize> = HashMap::new();
        for finding in &findings {
            *by_library.entry(finding.library.clone()).or_insert(0) += 1;
            *by_category.entry(finding.test_category.clone()).or_insert(0) += 1;
        }

        let overall = safety_score(findings.iter());
        let sub_scores_by_library = safety_sub_scores_by_library(findings.iter())
            .into_iter()
            .map(|(k, v)| (k, (v.score, v.grade)))
            .collect();
        let sub_scores_by_category = safety_sub_scores_by_category(findings.iter())
            .into_iter()
            .map(|(k, v)| (k, (v.score, v.grade)))
            .collect();

        let drift_findings = match self.store.previous_completed_execution(
            execution.pipeline_id,
            execution.llm_config_id,
            execution_id,
        ).await? {
            Some(baseline) => self.store.list_drift_findings(execution_id, baseline.id).await?,
            None => Vec::new(),
        };
        let (drift_score_value, drift_grade) = if drift_findings.is_empty() {
            (None, None)
        } else {
            let result = crate::scoring::drift_score(drift_findings.iter());
            (Some(result.score), Some(result.grade))
        };

        Ok(ExecutionSummary {
            total: findings.len(),
            by_severity: severity_counts(findings.iter()),
            by_library,
            by_category,
            safety_score: overall.score,
            safety_grade: overall.grade,
            sub_scores_by_library,
            sub_scores_by_category,
            drift_score: drift_score_value,
            drift_grade,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn start_execution_persists_and_completes() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let registry = Arc::new(Registry::new());
        let engine = Arc::new(Engine::new(registry, Arc::clone(&store)));
        let control = Control::new(Arc::clone(&store), engine, Arc::new(Config::default()));

        let llm_config = LLMConfig::new("https://example.test", r#"{"prompt":"{prompt}"}"#);
        let pipeline = Pipeline::new(llm_config.id);
        store.insert_llm_config(&llm_config).await.unwrap();
        store.insert_pipeline(&pipeline).await.unwrap();

        let execution_id = control.start_execution(pipeline.id, llm_config.id).await.unwrap();
        let execution = store.get_execution(execution_id).await.unwrap().unwrap();
        assert_eq!(execution.status, crate::model::ExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn summarize_empty_execution_is_100_grade_a() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let registry = Arc::new(Registry::new());
        let engine = Arc::new(Engine::new(registry, Arc::clone(&store)));
        let control = Control::new(Arc::clone(&store), engine, Arc::new(Config::default()));

        let llm_config = LLMConfig::new("https://example.test", r#"{"prompt":"{prompt}"}"#);
        let pipeline = Pipeline::new(llm_config.id);
        store.insert_llm_config(&llm_config).await.unwrap();
        store.insert_pipeline(&pipeline).await.unwrap();

        let execution_id = control.start_execution(pipeline.id, llm_config.id).await.unwrap();
        let summary = control.summarize(execution_id).await.unwrap();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.safety_score, 100.0);
        assert_eq!(summary.safety_grade, Grade::A);
    }
}
