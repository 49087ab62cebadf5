//! `Pipeline`: the selected probe suites, categories, and optional thresholds.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::llm_config::LlmConfigId;
use super::severity::Severity;

/// Unique identifier for a `Pipeline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineId(pub Uuid);

impl PipelineId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PipelineId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PipelineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A selection of adapters and categories to run against one `LLMConfig`.
/// Read-only during execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: PipelineId,
    pub llm_config_id: LlmConfigId,
    pub libraries: HashSet<String>,
    pub test_categories: HashSet<String>,
    /// Optional severity→cutoff overrides; currently informational (the
    /// scoring formula in `scoring.rs` does not read this map directly, it
    /// exists for consumers building policy on top of sub-scores).
    pub severity_thresholds: Option<HashMap<Severity, i32>>,
}

impl Pipeline {
    pub fn new(llm_config_id: LlmConfigId) -> Self {
        Self {
            id: PipelineId::new(),
            llm_config_id,
            libraries: HashSet::new(),
            test_categories: HashSet::new(),
            severity_thresholds: None,
        }
    }

    pub fn with_library(mut self, name: impl Into<String>) -> Self {
        self.libraries.insert(name.into());
        self
    }

    pub fn with_category(mut self, name: impl Into<String>) -> Self {
        self.test_categories.insert(name.into());
        self
    }
}
