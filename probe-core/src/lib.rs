//! # probe-core
//!
//! Core library for running adversarial/safety probe suites against an LLM
//! endpoint, normalizing their findings into a canonical shape, scoring
//! them, and detecting behavioral drift against a baseline execution.
//!
//! ## Core Components
//!
//! - **Registry**: process-wide `name → adapter` mapping for probe suites
//! - **Engine**: fans a pipeline's work set out onto a worker pool
//! - **Scoring**: deterministic safety/drift scores over finding sets
//! - **Drift**: five-channel comparison between a current and baseline execution
//! - **Control**: the procedural operations a CRUD API surfaces to callers
//!
//! ## Example
//!
//! ```rust,ignore
//! use probe_core::{Config, Control, Engine, InMemoryStore, Registry};
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let registry = Arc::new(Registry::new());
//! let engine = Arc::new(Engine::new(registry, store.clone()));
//! let control = Control::new(store, engine, Arc::new(Config::default()));
//! ```

pub mod adapters;
pub mod baseline_selector;
pub mod config;
pub mod control;
pub mod drift;
pub mod embedding_client;
pub mod engine;
pub mod error;
pub mod llm;
pub mod model;
pub mod normalizer;
pub mod registry;
pub mod scoring;
pub mod store;
pub mod trace;

pub use baseline_selector::BaselineSelector;
pub use config::Config;
pub use control::{Control, ExecutionSummary};
pub use drift::{DriftComparisonState, DriftEngine};
pub use embedding_client::EmbeddingClient;
pub use engine::{CancelToken, Engine, DEFAULT_WORKER_PARALLELISM};
pub use error::{Error, Result};
pub use llm::{render_payload, RetryPolicy, Transport};
pub use normalizer::normalize;
pub use registry::{ProbeAdapter, Registry};
pub use scoring::{
    drift_score, safety_score, safety_sub_scores_by_category, safety_sub_scores_by_library,
    severity_counts, ScoreResult,
};
pub use store::{FindingFilters, InMemoryStore, Store};
pub use trace::TraceExtractor;

pub use model::{
    AgentTrace, Baseline, BaselineId, BaselineRef, DriftChannel, DriftFinding, DriftFindingId,
    DriftSeverity, Embedding, EmbeddingId, Execution, ExecutionId, ExecutionStatus, Finding,
    FindingId, Grade, HttpMethod, LLMConfig, LlmConfigId, Pipeline, PipelineId, RawFinding,
    Severity, ToolCall,
};

#[cfg(feature = "builtin-adapters")]
pub use adapters::{GarakAdapter, LangtestAdapter, PromptfooAdapter, PyritAdapter};
