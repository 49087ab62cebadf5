//! `Baseline`: a designated previously-completed execution used for drift comparison.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::execution::ExecutionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaselineId(pub Uuid);

impl BaselineId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BaselineId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baseline {
    pub id: BaselineId,
    /// Must reference a Completed execution.
    pub execution_id: ExecutionId,
    pub name: String,
    /// Unique across non-deleted baselines when set.
    pub tag: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Baseline {
    pub fn new(execution_id: ExecutionId, name: impl Into<String>) -> Self {
        Self {
            id: BaselineId::new(),
            execution_id,
            name: name.into(),
            tag: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// How a caller refers to the comparison baseline for `compareDrift`.
#[derive(Debug, Clone)]
pub enum BaselineRef {
    /// Directly names the baseline execution; verified Completed at resolution time.
    ExplicitId(ExecutionId),
    /// Looked up via `Baseline.tag`, then its referenced execution.
    Tag(String),
    /// Most recent Completed execution with the same pipeline + LLM config.
    Previous,
}
