//! Core data model: the entities in §3 of the design — `LLMConfig`, `Pipeline`,
//! `Execution`, `Finding`, `Embedding`, `Baseline`, `DriftFinding`, `AgentTrace`.

mod agent_trace;
mod baseline;
mod drift_finding;
mod embedding;
mod execution;
mod finding;
mod llm_config;
mod pipeline;
mod severity;

pub use agent_trace::{AgentTrace, ToolCall};
pub use baseline::{Baseline, BaselineId, BaselineRef};
pub use drift_finding::{DriftChannel, DriftFinding, DriftFindingId};
pub use embedding::{Embedding, EmbeddingId};
pub use execution::{Execution, ExecutionId, ExecutionStatus};
pub use finding::{Finding, FindingId, RawFinding};
pub use llm_config::{HttpMethod, LLMConfig, LlmConfigId};
pub use pipeline::{Pipeline, PipelineId};
pub use severity::{DriftSeverity, Grade, Severity};
