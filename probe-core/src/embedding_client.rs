//! External embedding service client (spec §4.5/§6).
//!
//! Batches finding responses (B = 32), posts them to the configured
//! embedding service, and maps back the returned vectors. Failure anywhere
//! in this path is non-fatal to the execution: the engine logs and proceeds
//! without embeddings for that batch.

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{instrument, warn};

use crate::error::{Error, Result};
use crate::model::{Embedding, Finding};

/// Spec §4.5: batch size B = 32.
pub const EMBEDDING_BATCH_SIZE: usize = 32;

pub struct EmbeddingClient {
    http: Client,
    service_url: String,
    model_name: String,
}

impl EmbeddingClient {
    pub fn new(http: Client, service_url: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            http,
            service_url: service_url.into(),
            model_name: model_name.into(),
        }
    }

    /// Embed every Finding's `evidence_response`, batching by
    /// `EMBEDDING_BATCH_SIZE`. A batch failure is logged and skipped — the
    /// remaining batches still attempt to complete (spec §4.5: "logs and
    /// proceeds without embeddings").
    #[instrument(skip(self, findings))]
    pub async fn embed_findings(&self, findings: &[Finding]) -> Vec<Embedding> {
        let mut embeddings = Vec::with_capacity(findings.len());
        for batch in findings.chunks(EMBEDDING_BATCH_SIZE) {
            match self.embed_batch(batch).await {
                Ok(batch_embeddings) => embeddings.extend(batch_embeddings),
                Err(err) => {
                    warn!(error = %err, batch_size = batch.len(), "embedding batch failed, skipping");
                }
            }
        }
        embeddings
    }

    async fn embed_batch(&self, findings: &[Finding]) -> Result<Vec<Embedding>> {
        let texts: Vec<&str> = findings.iter().map(|f| f.evidence_response.as_str()).collect();
        let request_body = json!({"texts": texts, "model": self.model_name});

        let response = self
            .http
            .post(&self.service_url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| Error::embedding_service(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::embedding_service(format!(
                "embedding service returned status {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::embedding_service(format!("malformed embedding response: {e}")))?;

        let vectors = parse_embedding_vectors(&body)?;
        if vectors.len() != findings.len() {
            return Err(Error::embedding_service(format!(
                "embedding service returned {} vectors for {} inputs",
                vectors.len(),
                findings.len()
            )));
        }
        let expected_len = vectors.first().map(Vec::len);
        if vectors.iter().any(|v| Some(v.len()) != expected_len) {
            return Err(Error::embedding_service(
                "embedding vectors returned with mismatched lengths".to_string(),
            ));
        }

        Ok(findings
            .iter()
            .zip(vectors)
            .map(|(finding, vector)| Embedding::new(finding.id, self.model_name.clone(), vector))
            .collect())
    }
}

#[derive(Deserialize)]
struct EmbeddingsWrapper {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct DataEntry {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct DataWrapper {
    data: Vec<DataEntry>,
}

/// Accept the three response shapes spec §6 requires: a bare array of
/// vectors, `{embeddings: [...]}`, or `{data: [{embedding: [...]}, ...]}`.
fn parse_embedding_vectors(body: &Value) -> Result<Vec<Vec<f32>>> {
    if let Ok(vectors) = serde_json::from_value::<Vec<Vec<f32>>>(body.clone()) {
        return Ok(vectors);
    }
    if let Ok(wrapper) = serde_json::from_value::<EmbeddingsWrapper>(body.clone()) {
        return Ok(wrapper.embeddings);
    }
    if let Ok(wrapper) = serde_json::from_value::<DataWrapper>(body.clone()) {
        return Ok(wrapper.data.into_iter().map(|d| d.embedding).collect());
    }
    Err(Error::embedding_service(
        "unrecognized embedding response shape".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_array_shape() {
        let body = json!([[0.1, 0.2], [0.3, 0.4]]);
        let vectors = parse_embedding_vectors(&body).unwrap();
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[test]
    fn parses_embeddings_wrapper_shape() {
        let body = json!({"embeddings": [[0.1, 0.2]]});
        let vectors = parse_embedding_vectors(&body).unwrap();
        assert_eq!(vectors, vec![vec![0.1, 0.2]]);
    }

    #[test]
    fn parses_data_entry_shape() {
        let body = json!({"data": [{"embedding": [0.5, 0.6]}]});
        let vectors = parse_embedding_vectors(&body).unwrap();
        assert_eq!(vectors, vec![vec![0.5, 0.6]]);
    }

    #[test]
    fn rejects_unrecognized_shape() {
        let body = json!({"nonsense": true});
        assert!(parse_embedding_vectors(&body).is_err());
    }
}
