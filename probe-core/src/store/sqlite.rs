//! `rusqlite`-backed `Store` implementation.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{
    AgentTrace, Baseline, BaselineId, DriftChannel, DriftFinding, DriftFindingId, Embedding,
    EmbeddingId, Execution, ExecutionId, ExecutionStatus, Finding, FindingId, HttpMethod,
    LLMConfig, LlmConfigId, Pipeline, PipelineId, Severity, ToolCall,
};

use super::schema::initialize_schema;
use super::{FindingFilters, Store};

/// SQLite-backed store. Shares one connection behind a `Mutex`, mirroring
/// the lineage's `SqliteMemoryStore`.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| Error::persistence(e.to_string()))?;
        initialize_schema(&conn).map_err(|e| Error::persistence(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::persistence(e.to_string()))?;
        initialize_schema(&conn).map_err(|e| Error::persistence(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| Error::Internal(format!("failed to lock sqlite connection: {e}")))?;
        f(&conn).map_err(|e| Error::persistence(e.to_string()))
    }
}

fn method_to_str(method: HttpMethod) -> &'static str {
    method.as_str()
}

fn method_from_str(raw: &str) -> HttpMethod {
    match raw {
        "GET" => HttpMethod::Get,
        "PUT" => HttpMethod::Put,
        "PATCH" => HttpMethod::Patch,
        _ => HttpMethod::Post,
    }
}

fn parse_uuid(raw: String) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_datetime(raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_llm_config(&self, config: &LLMConfig) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO llm_configs
                    (id, endpoint_url, method, headers, payload_template, timeout_seconds, max_retries, environment_tag)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    config.id.0.to_string(),
                    config.endpoint_url,
                    method_to_str(config.method),
                    serde_json::to_string(&config.headers).unwrap_or_default(),
                    config.payload_template,
                    config.timeout_seconds as i64,
                    config.max_retries as i64,
                    config.environment_tag,
                ],
            )?;
            Ok(())
        })
    }

    async fn get_llm_config(&self, id: LlmConfigId) -> Result<Option<LLMConfig>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, endpoint_url, method, headers, payload_template, timeout_seconds, max_retries, environment_tag
                 FROM llm_configs WHERE id = ?1",
                params![id.0.to_string()],
                |row| {
                    let headers_raw: String = row.get(3)?;
                    Ok(LLMConfig {
                        id: LlmConfigId(parse_uuid(row.get(0)?)?),
                        endpoint_url: row.get(1)?,
                        method: method_from_str(&row.get::<_, String>(2)?),
                        headers: serde_json::from_str(&headers_raw).unwrap_or_default(),
                        payload_template: row.get(4)?,
                        timeout_seconds: row.get::<_, i64>(5)? as u64,
                        max_retries: row.get::<_, i64>(6)? as u32,
                        environment_tag: row.get(7)?,
                    })
                },
            )
            .optional()
        })
    }

    async fn insert_pipeline(&self, pipeline: &Pipeline) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO pipelines
                    (id, llm_config_id, libraries, test_categories, severity_thresholds)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    pipeline.id.0.to_string(),
                    pipeline.llm_config_id.0.to_string(),
                    serde_json::to_string(&pipeline.libraries).unwrap_or_default(),
                    serde_json::to_string(&pipeline.test_categories).unwrap_or_default(),
                    pipeline
                        .severity_thresholds
                        .as_ref()
                        .and_then(|t| serde_json::to_string(t).ok()),
                ],
            )?;
            Ok(())
        })
    }

    async fn get_pipeline(&self, id: PipelineId) -> Result<Option<Pipeline>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, llm_config_id, libraries, test_categories, severity_thresholds
                 FROM pipelines WHERE id = ?1",
                params![id.0.to_string()],
                |row| {
                    let libraries_raw: String = row.get(2)?;
                    let categories_raw: String = row.get(3)?;
                    let thresholds_raw: Option<String> = row.get(4)?;
                    Ok(Pipeline {
                        id: PipelineId(parse_uuid(row.get(0)?)?),
                        llm_config_id: LlmConfigId(parse_uuid(row.get(1)?)?),
                        libraries: serde_json::from_str(&libraries_raw).unwrap_or_default(),
                        test_categories: serde_json::from_str(&categories_raw).unwrap_or_default(),
                        severity_thresholds: thresholds_raw
                            .and_then(|raw| serde_json::from_str(&raw).ok()),
                    })
                },
            )
            .optional()
        })
    }

    async fn insert_execution(&self, execution: &Execution) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO executions
                    (id, pipeline_id, llm_config_id, status, started_at, completed_at, error_message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    execution.id.0.to_string(),
                    execution.pipeline_id.0.to_string(),
                    execution.llm_config_id.0.to_string(),
                    status_to_str(execution.status),
                    execution.started_at.map(|t| t.to_rfc3339()),
                    execution.completed_at.map(|t| t.to_rfc3339()),
                    execution.error_message,
                ],
            )?;
            Ok(())
        })
    }

    async fn get_execution(&self, id: ExecutionId) -> Result<Option<Execution>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, pipeline_id, llm_config_id, status, started_at, completed_at, error_message
                 FROM executions WHERE id = ?1",
                params![id.0.to_string()],
                row_to_execution,
            )
            .optional()
        })
    }

    async fn update_execution(&self, execution: &Execution) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE executions SET status = ?2, started_at = ?3, completed_at = ?4, error_message = ?5
                 WHERE id = ?1",
                params![
                    execution.id.0.to_string(),
                    status_to_str(execution.status),
                    execution.started_at.map(|t| t.to_rfc3339()),
                    execution.completed_at.map(|t| t.to_rfc3339()),
                    execution.error_message,
                ],
            )?;
            if changed == 0 {
                conn.execute(
                    "INSERT INTO executions
                        (id, pipeline_id, llm_config_id, status, started_at, completed_at, error_message)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        execution.id.0.to_string(),
                        execution.pipeline_id.0.to_string(),
                        execution.llm_config_id.0.to_string(),
                        status_to_str(execution.status),
                        execution.started_at.map(|t| t.to_rfc3339()),
                        execution.completed_at.map(|t| t.to_rfc3339()),
                        execution.error_message,
                    ],
                )?;
            }
            Ok(())
        })
    }

    async fn previous_completed_execution(
        &self,
        pipeline_id: PipelineId,
        llm_config_id: LlmConfigId,
        before: ExecutionId,
    ) -> Result<Option<Execution>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, pipeline_id, llm_config_id, status, started_at, completed_at, error_message
                 FROM executions
                 WHERE pipeline_id = ?1 AND llm_config_id = ?2 AND status = 'completed'
                   AND rowid < (SELECT rowid FROM executions WHERE id = ?3)
                 ORDER BY rowid DESC
                 LIMIT 1",
                params![
                    pipeline_id.0.to_string(),
                    llm_config_id.0.to_string(),
                    before.0.to_string(),
                ],
                row_to_execution,
            )
            .optional()
        })
    }

    async fn insert_finding(&self, finding: &Finding) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO findings
                    (id, execution_id, library, test_category, severity, risk_type,
                     evidence_prompt, evidence_response, confidence, extra, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    finding.id.0.to_string(),
                    finding.execution_id.0.to_string(),
                    finding.library,
                    finding.test_category,
                    finding.severity.to_string(),
                    finding.risk_type,
                    finding.evidence_prompt,
                    finding.evidence_response,
                    finding.confidence,
                    serde_json::to_string(&finding.extra).unwrap_or_default(),
                    finding.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    async fn list_findings(
        &self,
        execution_id: ExecutionId,
        filters: &FindingFilters,
    ) -> Result<Vec<Finding>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, execution_id, library, test_category, severity, risk_type,
                        evidence_prompt, evidence_response, confidence, extra, created_at
                 FROM findings WHERE execution_id = ?1 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(params![execution_id.0.to_string()], row_to_finding)?;
            let mut findings = Vec::new();
            for row in rows {
                let finding = row?;
                if filters
                    .library
                    .as_ref()
                    .map(|l| &finding.library == l)
                    .unwrap_or(true)
                    && filters
                        .test_category
                        .as_ref()
                        .map(|c| &finding.test_category == c)
                        .unwrap_or(true)
                    && filters
                        .severity
                        .map(|s| finding.severity == s)
                        .unwrap_or(true)
                {
                    findings.push(finding);
                }
            }
            Ok(findings)
        })
    }

    async fn get_finding(&self, id: FindingId) -> Result<Option<Finding>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, execution_id, library, test_category, severity, risk_type,
                        evidence_prompt, evidence_response, confidence, extra, created_at
                 FROM findings WHERE id = ?1",
                params![id.0.to_string()],
                row_to_finding,
            )
            .optional()
        })
    }

    async fn insert_embedding(&self, embedding: &Embedding) -> Result<()> {
        self.with_conn(|conn| {
            let blob: Vec<u8> = embedding
                .vector
                .iter()
                .flat_map(|f| f.to_le_bytes())
                .collect();
            conn.execute(
                "INSERT OR REPLACE INTO embeddings (id, finding_id, model_name, vector)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    embedding.id.0.to_string(),
                    embedding.finding_id.0.to_string(),
                    embedding.model_name,
                    blob,
                ],
            )?;
            Ok(())
        })
    }

    async fn list_embeddings(&self, execution_id: ExecutionId) -> Result<Vec<Embedding>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT e.id, e.finding_id, e.model_name, e.vector
                 FROM embeddings e
                 JOIN findings f ON f.id = e.finding_id
                 WHERE f.execution_id = ?1",
            )?;
            let rows = stmt.query_map(params![execution_id.0.to_string()], |row| {
                let blob: Vec<u8> = row.get(3)?;
                let vector = blob
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect();
                Ok(Embedding {
                    id: EmbeddingId(parse_uuid(row.get(0)?)?),
                    finding_id: FindingId(parse_uuid(row.get(1)?)?),
                    model_name: row.get(2)?,
                    vector,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
    }

    async fn insert_agent_trace(&self, trace: &AgentTrace) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO agent_traces (finding_id, calls) VALUES (?1, ?2)",
                params![
                    trace.finding_id.0.to_string(),
                    serde_json::to_string(&trace.calls).unwrap_or_default(),
                ],
            )?;
            Ok(())
        })
    }

    async fn list_agent_traces(&self, execution_id: ExecutionId) -> Result<Vec<AgentTrace>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.finding_id, t.calls
                 FROM agent_traces t
                 JOIN findings f ON f.id = t.finding_id
                 WHERE f.execution_id = ?1",
            )?;
            let rows = stmt.query_map(params![execution_id.0.to_string()], |row| {
                let calls_raw: String = row.get(1)?;
                let calls: Vec<ToolCall> = serde_json::from_str(&calls_raw).unwrap_or_default();
                Ok(AgentTrace {
                    finding_id: FindingId(parse_uuid(row.get(0)?)?),
                    calls,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
    }

    async fn insert_baseline(&self, baseline: &Baseline) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO baselines (id, execution_id, name, tag, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    baseline.id.0.to_string(),
                    baseline.execution_id.0.to_string(),
                    baseline.name,
                    baseline.tag,
                    baseline.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    async fn get_baseline_by_tag(&self, tag: &str) -> Result<Option<Baseline>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, execution_id, name, tag, created_at FROM baselines WHERE tag = ?1",
                params![tag],
                row_to_baseline,
            )
            .optional()
        })
    }

    async fn get_baseline(&self, id: BaselineId) -> Result<Option<Baseline>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, execution_id, name, tag, created_at FROM baselines WHERE id = ?1",
                params![id.0.to_string()],
                row_to_baseline,
            )
            .optional()
        })
    }

    async fn replace_drift_findings(
        &self,
        current_execution_id: ExecutionId,
        baseline_execution_id: ExecutionId,
        findings: Vec<DriftFinding>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM drift_findings WHERE current_execution_id = ?1 AND baseline_execution_id = ?2",
                params![
                    current_execution_id.0.to_string(),
                    baseline_execution_id.0.to_string(),
                ],
            )?;
            for finding in &findings {
                conn.execute(
                    "INSERT INTO drift_findings
                        (id, current_execution_id, baseline_execution_id, channel, metric,
                         value, threshold, severity, confidence, details)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        finding.id.0.to_string(),
                        finding.current_execution_id.0.to_string(),
                        finding.baseline_execution_id.0.to_string(),
                        finding.channel.to_string(),
                        finding.metric,
                        finding.value,
                        finding.threshold,
                        finding.severity.to_string(),
                        finding.confidence,
                        serde_json::to_string(&finding.details).unwrap_or_default(),
                    ],
                )?;
            }
            Ok(())
        })
    }

    async fn list_drift_findings(
        &self,
        current_execution_id: ExecutionId,
        baseline_execution_id: ExecutionId,
    ) -> Result<Vec<DriftFinding>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, current_execution_id, baseline_execution_id, channel, metric,
                        value, threshold, severity, confidence, details
                 FROM drift_findings
                 WHERE current_execution_id = ?1 AND baseline_execution_id = ?2",
            )?;
            let rows = stmt.query_map(
                params![
                    current_execution_id.0.to_string(),
                    baseline_execution_id.0.to_string(),
                ],
                row_to_drift_finding,
            )?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
    }
}

fn status_to_str(status: ExecutionStatus) -> &'static str {
    match status {
        ExecutionStatus::Pending => "pending",
        ExecutionStatus::Running => "running",
        ExecutionStatus::Completed => "completed",
        ExecutionStatus::Failed => "failed",
        ExecutionStatus::Cancelled => "cancelled",
    }
}

fn status_from_str(raw: &str) -> ExecutionStatus {
    match raw {
        "running" => ExecutionStatus::Running,
        "completed" => ExecutionStatus::Completed,
        "failed" => ExecutionStatus::Failed,
        "cancelled" => ExecutionStatus::Cancelled,
        _ => ExecutionStatus::Pending,
    }
}

fn row_to_execution(row: &rusqlite::Row) -> rusqlite::Result<Execution> {
    let started_at: Option<String> = row.get(4)?;
    let completed_at: Option<String> = row.get(5)?;
    Ok(Execution {
        id: ExecutionId(parse_uuid(row.get(0)?)?),
        pipeline_id: PipelineId(parse_uuid(row.get(1)?)?),
        llm_config_id: LlmConfigId(parse_uuid(row.get(2)?)?),
        status: status_from_str(&row.get::<_, String>(3)?),
        started_at: started_at.map(parse_datetime).transpose()?,
        completed_at: completed_at.map(parse_datetime).transpose()?,
        error_message: row.get(6)?,
    })
}

fn row_to_finding(row: &rusqlite::Row) -> rusqlite::Result<Finding> {
    let extra_raw: String = row.get(9)?;
    let created_at: String = row.get(10)?;
    Ok(Finding {
        id: FindingId(parse_uuid(row.get(0)?)?),
        execution_id: ExecutionId(parse_uuid(row.get(1)?)?),
        library: row.get(2)?,
        test_category: row.get(3)?,
        severity: Severity::parse_or_info(&row.get::<_, String>(4)?),
        risk_type: row.get(5)?,
        evidence_prompt: row.get(6)?,
        evidence_response: row.get(7)?,
        confidence: row.get(8)?,
        extra: serde_json::from_str(&extra_raw).unwrap_or_default(),
        created_at: parse_datetime(created_at)?,
    })
}

fn row_to_baseline(row: &rusqlite::Row) -> rusqlite::Result<Baseline> {
    let created_at: String = row.get(4)?;
    Ok(Baseline {
        id: BaselineId(parse_uuid(row.get(0)?)?),
        execution_id: ExecutionId(parse_uuid(row.get(1)?)?),
        name: row.get(2)?,
        tag: row.get(3)?,
        created_at: parse_datetime(created_at)?,
    })
}

fn channel_from_str(raw: &str) -> DriftChannel {
    match raw {
        "safety" => DriftChannel::Safety,
        "distribution" => DriftChannel::Distribution,
        "embedding" => DriftChannel::Embedding,
        "agent_tool" => DriftChannel::AgentTool,
        _ => DriftChannel::Output,
    }
}

fn drift_severity_from_str(raw: &str) -> crate::model::DriftSeverity {
    use crate::model::DriftSeverity;
    match raw {
        "critical" => DriftSeverity::Critical,
        "high" => DriftSeverity::High,
        "medium" => DriftSeverity::Medium,
        _ => DriftSeverity::Low,
    }
}

fn row_to_drift_finding(row: &rusqlite::Row) -> rusqlite::Result<DriftFinding> {
    let details_raw: String = row.get(9)?;
    Ok(DriftFinding {
        id: DriftFindingId(parse_uuid(row.get(0)?)?),
        current_execution_id: ExecutionId(parse_uuid(row.get(1)?)?),
        baseline_execution_id: ExecutionId(parse_uuid(row.get(2)?)?),
        channel: channel_from_str(&row.get::<_, String>(3)?),
        metric: row.get(4)?,
        value: row.get(5)?,
        threshold: row.get(6)?,
        severity: drift_severity_from_str(&row.get::<_, String>(7)?),
        confidence: row.get(8)?,
        details: serde_json::from_str(&details_raw).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Execution, LLMConfig, Pipeline};

    #[tokio::test]
    async fn insert_and_fetch_execution_round_trips() {
        let store = SqliteStore::in_memory().unwrap();
        let llm_config = LLMConfig::new("https://example.test", r#"{"prompt":"{prompt}"}"#);
        let pipeline = Pipeline::new(llm_config.id);
        store.insert_llm_config(&llm_config).await.unwrap();
        store.insert_pipeline(&pipeline).await.unwrap();

        let execution = Execution::new_pending(pipeline.id, llm_config.id);
        store.insert_execution(&execution).await.unwrap();

        let fetched = store.get_execution(execution.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, execution.id);
        assert_eq!(fetched.status, ExecutionStatus::Pending);
    }

    #[tokio::test]
    async fn update_execution_persists_status_transition() {
        let store = SqliteStore::in_memory().unwrap();
        let llm_config = LLMConfig::new("https://example.test", r#"{"prompt":"{prompt}"}"#);
        let pipeline = Pipeline::new(llm_config.id);
        store.insert_llm_config(&llm_config).await.unwrap();
        store.insert_pipeline(&pipeline).await.unwrap();

        let mut execution = Execution::new_pending(pipeline.id, llm_config.id);
        store.insert_execution(&execution).await.unwrap();

        execution.status = ExecutionStatus::Completed;
        store.update_execution(&execution).await.unwrap();

        let fetched = store.get_execution(execution.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, ExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn previous_completed_execution_orders_by_insertion() {
        let store = SqliteStore::in_memory().unwrap();
        let llm_config = LLMConfig::new("https://example.test", r#"{"prompt":"{prompt}"}"#);
        let pipeline = Pipeline::new(llm_config.id);
        store.insert_llm_config(&llm_config).await.unwrap();
        store.insert_pipeline(&pipeline).await.unwrap();

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
}
