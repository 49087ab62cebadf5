//! `RawFinding` and `Finding`: the probe outcome before and after normalization.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::severity::Severity;

/// Unique identifier for a `Finding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FindingId(pub Uuid);

impl FindingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FindingId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FindingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A probe outcome as produced by an adapter, before normalization.
///
/// Adapters never fabricate a `Finding` directly — the engine always routes
/// this through the normalizer so severity/confidence invariants hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFinding {
    pub library: String,
    pub category: String,
    /// Severity as reported by the adapter; may be empty or unrecognized.
    pub severity: String,
    pub risk_type: String,
    pub evidence_prompt: String,
    pub evidence_response: String,
    pub confidence: Option<f64>,
    pub metadata: HashMap<String, Value>,
}

impl RawFinding {
    pub fn new(
        library: impl Into<String>,
        category: impl Into<String>,
        severity: impl Into<String>,
        risk_type: impl Into<String>,
        prompt: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            library: library.into(),
            category: category.into(),
            severity: severity.into(),
            risk_type: risk_type.into(),
            evidence_prompt: prompt.into(),
            evidence_response: response.into(),
            confidence: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Build the raw finding an adapter records when a single `(prompt,
    /// category)` pair fails — severity `info`, risk_type `adapter_error`,
    /// the error text preserved in `metadata.error`.
    pub fn adapter_error(
        library: impl Into<String>,
        category: impl Into<String>,
        prompt: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::new(
            library,
            category,
            "info",
            "adapter_error",
            prompt,
            String::new(),
        )
        .with_metadata("error", Value::String(error.into()))
    }
}

/// A normalized, canonical probe outcome. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: FindingId,
    pub execution_id: super::execution::ExecutionId,
    pub library: String,
    pub test_category: String,
    pub severity: Severity,
    pub risk_type: String,
    pub evidence_prompt: String,
    pub evidence_response: String,
    /// Clamped to `[0, 1]` on ingest; `None` if the adapter supplied none.
    pub confidence: Option<f64>,
    pub extra: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl Finding {
    /// Recognized shape for an attached agent trace:
    /// `{"agent_trace": [{"tool": ..., "args"?: ..., "result"?: ...}, ...]}`.
    pub fn agent_trace_calls(&self) -> Option<Vec<super::agent_trace::ToolCall>> {
        let raw = self.extra.get("agent_trace")?.as_array()?;
        let calls = raw
            .iter()
            .filter_map(|entry| {
                let obj = entry.as_object()?;
                let tool_name = obj.get("tool")?.as_str()?.to_string();
                Some(super::agent_trace::ToolCall {
                    tool_name,
                    args: obj.get("args").cloned(),
                    result: obj.get("result").cloned(),
                })
            })
            .collect();
        Some(calls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_error_raw_finding_shape() {
        let raw = RawFinding::adapter_error("garak", "jailbreak", "do X", "boom");
        assert_eq!(raw.severity, "info");
        assert_eq!(raw.risk_type, "adapter_error");
        assert_eq!(
            raw.metadata.get("error").and_then(|v| v.as_str()),
            Some("boom")
        );
    }
}
