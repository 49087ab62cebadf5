//! Agent-Trace Extractor (spec §4.5 second half, §3 `AgentTrace`): reads the
//! recognized `{"agent_trace": [...]}` shape out of each Finding's `extra`
//! metadata and persists the reconstructed tool-call sequence. Derived data
//! — never written directly by an adapter.

use std::sync::Arc;

use tracing::instrument;

use crate::error::Result;
use crate::model::{AgentTrace, Finding};
use crate::store::Store;

pub struct TraceExtractor {
    store: Arc<dyn Store>,
}

impl TraceExtractor {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Extract and persist an `AgentTrace` for every Finding that carries a
    /// recognized `agent_trace` shape. Findings without one are skipped —
    /// "if no traces, this channel yields no findings" (spec §4.5/§2.9).
    #[instrument(skip(self, findings))]
    pub async fn extract_and_persist(&self, findings: &[Finding]) -> Result<usize> {
        let mut persisted = 0;
        for finding in findings {
            let Some(calls) = finding.agent_trace_calls() else {
                continue;
            };
            let trace = AgentTrace::new(finding.id, calls);
            self.store.insert_agent_trace(&trace).await?;
            persisted += 1;
        }
        Ok(persisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExecutionId;
    use crate::store::InMemoryStore;
    use serde_json::json;

    fn finding_with_extra(extra: serde_json::Value) -> Finding {
        let mut map = std::collections::HashMap::new();
        if let serde_json::Value::Object(obj) = extra {
            for (k, v) in obj {
                map.insert(k, v);
            }
        }
        Finding {
            id: crate::model::FindingId::new(),
            execution_id: ExecutionId::new(),
            library: "garak".to_string(),
            test_category: "jailbreak".to_string(),
            severity: crate::model::Severity::Info,
            risk_type: "jailbreak".to_string(),
            evidence_prompt: "p".to_string(),
            evidence_response: "r".to_string(),
            confidence: None,
            extra: map,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn extracts_recognized_agent_trace_shape() {
        let store = Arc::new(InMemoryStore::new());
        let finding = finding_with_extra(json!({
            "agent_trace": [{"tool": "search", "args": {"q": "x"}}]
        }));
        let extractor = TraceExtractor::new(store.clone());
        let persisted = extractor.extract_and_persist(&[finding.clone()]).await.unwrap();
        assert_eq!(persisted, 1);

        let traces = store.list_agent_traces(finding.execution_id).await.unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].calls[0].tool_name, "search");
    }

    #[tokio::test]
    async fn findings_without_trace_are_skipped() {
        let store = Arc::new(InMemoryStore::new());
        let finding = finding_with_extra(json!({}));
        let extractor = TraceExtractor::new(store.clone());
        let persisted = extractor.extract_and_persist(&[finding]).await.unwrap();
        assert_eq!(persisted, 0);
    }
}
