//! Embedding drift channel (spec §4.8.4): centroid cosine distance, with an
//! optional pairwise-similarity-variance delta.

use crate::model::{DriftChannel, DriftFinding, DriftSeverity, Embedding, ExecutionId};

use super::stats::{centroid, cosine_similarity, pairwise_similarity_variance};

/// Embedding-channel severity bracket: same shape as output/safety but with
/// a floor at the channel threshold (0.30) rather than 0.10 (spec §4.8.4).
fn embedding_severity(value: f64) -> Option<DriftSeverity> {
    if value >= 0.45 {
        Some(DriftSeverity::Critical)
    } else if value >= 0.30 {
        Some(DriftSeverity::High)
    } else {
        None
    }
}

pub fn compute(
    current_execution_id: ExecutionId,
    baseline_execution_id: ExecutionId,
    current_embeddings: &[Embedding],
    baseline_embeddings: &[Embedding],
    threshold: f64,
) -> Vec<DriftFinding> {
    if current_embeddings.is_empty() || baseline_embeddings.is_empty() {
        return vec![DriftFinding::new(
            current_execution_id,
            baseline_execution_id,
            DriftChannel::Embedding,
            "embeddings_unavailable",
            1.0,
            threshold,
            DriftSeverity::Low,
        )];
    }

    let current_models: std::collections::HashSet<&str> =
        current_embeddings.iter().map(|e| e.model_name.as_str()).collect();
    let baseline_models: std::collections::HashSet<&str> =
        baseline_embeddings.iter().map(|e| e.model_name.as_str()).collect();
    if current_models != baseline_models {
        return vec![DriftFinding::new(
            current_execution_id,
            baseline_execution_id,
            DriftChannel::Embedding,
            "embeddings_unavailable",
            1.0,
            threshold,
            DriftSeverity::Low,
        )
        .with_detail(
            "reason",
            serde_json::Value::String("embedding model names differ between sides".to_string()),
        )];
    }

    let mut findings = Vec::new();

    let current_vectors: Vec<Vec<f32>> = current_embeddings.iter().map(|e| e.vector.clone()).collect();
    let baseline_vectors: Vec<Vec<f32>> = baseline_embeddings.iter().map(|e| e.vector.clone()).collect();

    let current_centroid = centroid(&current_vectors);
    let baseline_centroid = centroid(&baseline_vectors);
    let cosine_distance = 1.0 - cosine_similarity(&current_centroid, &baseline_centroid);
    if cosine_distance >= threshold {
        if let Some(severity) = embedding_severity(cosine_distance) {
            findings.push(DriftFinding::new(
                current_execution_id,
                baseline_execution_id,
                DriftChannel::Embedding,
                "centroid_cosine_distance",
                cosine_distance,
                threshold,
                severity,
            ));
        }
    }

    let variance_delta = (pairwise_similarity_variance(&current_vectors)
        - pairwise_similarity_variance(&baseline_vectors))
    .abs();
    if variance_delta >= threshold {
        if let Some(severity) = embedding_severity(variance_delta) {
            findings.push(DriftFinding::new(
                current_execution_id,
                baseline_execution_id,
                DriftChannel::Embedding,
                "pairwise_similarity_variance_delta",
                variance_delta,
                threshold,
                severity,
            ));
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FindingId;

    fn embedding(model: &str, vector: Vec<f32>) -> Embedding {
        Embedding::new(FindingId::new(), model, vector)
    }

    #[test]
    fn s6_missing_current_embeddings_emits_unavailable_low() {
        let baseline = vec![embedding("m", vec![1.0, 0.0])];
        let findings = compute(ExecutionId::new(), ExecutionId::new(), &[], &baseline, 0.30);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].metric, "embeddings_unavailable");
        assert_eq!(findings[0].severity, DriftSeverity::Low);
    }

    #[test]
    fn identical_centroids_yield_no_findings() {
        let side = vec![embedding("m", vec![1.0, 0.0]), embedding("m", vec![0.0, 1.0])];
        let findings = compute(ExecutionId::new(), ExecutionId::new(), &side, &side, 0.30);
        assert!(findings.is_empty());
    }

    #[test]
    fn orthogonal_centroids_emit_high_or_critical() {
        let current = vec![embedding("m", vec![1.0, 0.0])];
        let baseline = vec![embedding("m", vec![0.0, 1.0])];
        let findings = compute(ExecutionId::new(), ExecutionId::new(), &current, &baseline, 0.30);
        assert!(findings
            .iter()
            .any(|f| f.metric == "centroid_cosine_distance" && f.value > 0.9));
    }
}
