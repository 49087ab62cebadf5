//! `Embedding`: a fixed-length response vector, keyed by finding.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::finding::FindingId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmbeddingId(pub Uuid);

impl EmbeddingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EmbeddingId {
    fn default() -> Self {
        Self::new()
    }
}

/// A finding's response embedding. At most one per `Finding`; all vectors for
/// one execution share a single `model_name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub id: EmbeddingId,
    pub finding_id: FindingId,
    pub model_name: String,
    pub vector: Vec<f32>,
}

impl Embedding {
    pub fn new(finding_id: FindingId, model_name: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: EmbeddingId::new(),
            finding_id,
            model_name: model_name.into(),
            vector,
        }
    }
}
