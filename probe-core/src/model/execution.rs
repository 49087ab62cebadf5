//! `Execution`: the state machine the engine owns exclusively.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::llm_config::LlmConfigId;
use super::pipeline::PipelineId;

/// Unique identifier for an `Execution`. Stores that back it with an
/// auto-incrementing primary key may additionally expose a numeric ordinal
/// for the "previous completed execution" baseline-selection query (4.7);
/// that ordinal is a storage detail, not part of this identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub Uuid);

impl ExecutionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Execution lifecycle. Transitions are monotonic with one exception:
/// `Running -> Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    /// Whether persisting a new Finding/Embedding is legal for an execution
    /// currently in this status. False once Completed or Failed (state
    /// monotonicity, spec property 7).
    pub fn accepts_findings(self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub pipeline_id: PipelineId,
    pub llm_config_id: LlmConfigId,
    pub status: ExecutionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl Execution {
    pub fn new_pending(pipeline_id: PipelineId, llm_config_id: LlmConfigId) -> Self {
        Self {
            id: ExecutionId::new(),
            pipeline_id,
            llm_config_id,
            status: ExecutionStatus::Pending,
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_reject_findings() {
        assert!(ExecutionStatus::Running.accepts_findings());
        assert!(!ExecutionStatus::Completed.accepts_findings());
        assert!(!ExecutionStatus::Failed.accepts_findings());
        assert!(!ExecutionStatus::Cancelled.accepts_findings());
    }
}
