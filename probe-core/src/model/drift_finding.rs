//! `DriftFinding`: one statistical observation produced by the drift engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::execution::ExecutionId;
use super::severity::DriftSeverity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DriftFindingId(pub Uuid);

impl DriftFindingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DriftFindingId {
    fn default() -> Self {
        Self::new()
    }
}

/// Which of the five drift channels produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftChannel {
    Output,
    Safety,
    Distribution,
    Embedding,
    AgentTool,
}

impl std::fmt::Display for DriftChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Output => write!(f, "output"),
            Self::Safety => write!(f, "safety"),
            Self::Distribution => write!(f, "distribution"),
            Self::Embedding => write!(f, "embedding"),
            Self::AgentTool => write!(f, "agent_tool"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftFinding {
    pub id: DriftFindingId,
    pub current_execution_id: ExecutionId,
    pub baseline_execution_id: ExecutionId,
    pub channel: DriftChannel,
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    pub severity: DriftSeverity,
    pub confidence: Option<f64>,
    pub details: HashMap<String, Value>,
}

impl DriftFinding {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        current_execution_id: ExecutionId,
        baseline_execution_id: ExecutionId,
        channel: DriftChannel,
        metric: impl Into<String>,
        value: f64,
        threshold: f64,
        severity: DriftSeverity,
    ) -> Self {
        Self {
            id: DriftFindingId::new(),
            current_execution_id,
            baseline_execution_id,
            channel,
            metric: metric.into(),
            value,
            threshold,
            severity,
            confidence: None,
            details: HashMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    /// A `low`-severity finding recording that a drift channel itself
    /// errored out without aborting the overall comparison (spec §7).
    pub fn channel_error(
        current_execution_id: ExecutionId,
        baseline_execution_id: ExecutionId,
        channel: DriftChannel,
        error: impl Into<String>,
    ) -> Self {
        Self::new(
            current_execution_id,
            baseline_execution_id,
            channel,
            "channel_error",
            1.0,
            0.0,
            DriftSeverity::Low,
        )
        .with_detail("error", Value::String(error.into()))
    }
}
