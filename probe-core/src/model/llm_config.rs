//! `LLMConfig`: the target endpoint under test. Read-only during execution.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an `LLMConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LlmConfigId(pub Uuid);

impl LlmConfigId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LlmConfigId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LlmConfigId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// HTTP method used to invoke the target endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
        }
    }
}

/// The LLM endpoint configuration a pipeline targets.
///
/// Created by the CRUD API (out of scope here); the core only ever reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    pub id: LlmConfigId,
    pub endpoint_url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    /// JSON text with `{prompt}` and optional `{system_prompt}` placeholders.
    pub payload_template: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub environment_tag: Option<String>,
}

impl LLMConfig {
    pub fn new(endpoint_url: impl Into<String>, payload_template: impl Into<String>) -> Self {
        Self {
            id: LlmConfigId::new(),
            endpoint_url: endpoint_url.into(),
            method: HttpMethod::Post,
            headers: HashMap::new(),
            payload_template: payload_template.into(),
            timeout_seconds: 30,
            max_retries: 3,
            environment_tag: None,
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout_seconds(mut self, secs: u64) -> Self {
        self.timeout_seconds = secs;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}
