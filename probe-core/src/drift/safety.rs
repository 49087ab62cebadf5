//! Safety drift channel (spec §4.8.2): safety-score delta plus per-severity
//! count deltas.

use crate::model::{DriftChannel, DriftFinding, DriftSeverity, ExecutionId, Finding, Severity};
use crate::scoring::{safety_score, severity_counts};

pub fn compute(
    current_execution_id: ExecutionId,
    baseline_execution_id: ExecutionId,
    current_findings: &[Finding],
    baseline_findings: &[Finding],
    threshold: f64,
) -> Vec<DriftFinding> {
    let mut findings = Vec::new();

    let current_score = safety_score(current_findings.iter()).score;
    let baseline_score = safety_score(baseline_findings.iter()).score;
    let score_delta = (current_score - baseline_score).abs() / 100.0;
    if score_delta >= threshold {
        if let Some(severity) = DriftSeverity::from_bracket(score_delta) {
            findings.push(DriftFinding::new(
                current_execution_id,
                baseline_execution_id,
                DriftChannel::Safety,
                "safety_score_delta",
                score_delta,
                threshold,
                severity,
            ));
        }
    }

    let current_counts = severity_counts(current_findings.iter());
    let baseline_counts = severity_counts(baseline_findings.iter());
    for level in Severity::ALL {
        let current_count = *current_counts.get(&level).unwrap_or(&0) as i64;
        let baseline_count = *baseline_counts.get(&level).unwrap_or(&0) as i64;
        let delta = current_count - baseline_count;
        if delta == 0 {
            continue;
        }
        let value = delta.unsigned_abs() as f64 / (baseline_count.max(1)) as f64;
        if value < threshold {
            continue;
        }
        if let Some(severity) = DriftSeverity::from_bracket(value) {
            findings.push(
                DriftFinding::new(
                    current_execution_id,
                    baseline_execution_id,
                    DriftChannel::Safety,
                    format!("severity_count_delta_{level}"),
                    value,
                    threshold,
                    severity,
                )
                .with_detail("severity", serde_json::Value::String(level.to_string()))
                .with_detail("delta", serde_json::json!(delta)),
            );
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding_with_severity(severity: Severity) -> Finding {
        Finding {
            id: crate::model::FindingId::new(),
            execution_id: ExecutionId::new(),
            library: "garak".to_string(),
            test_category: "jailbreak".to_string(),
            severity,
            risk_type: "jailbreak".to_string(),
            evidence_prompt: "p".to_string(),
            evidence_response: "r".to_string(),
            confidence: None,
            extra: Default::default(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn identical_findings_yield_no_drift() {
        let findings = vec![finding_with_severity(Severity::Low)];
        let result = compute(ExecutionId::new(), ExecutionId::new(), &findings, &findings, 0.15);
        assert!(result.is_empty());
    }

    #[test]
    fn large_safety_score_delta_emits_finding() {
        let baseline = vec![];
        let current: Vec<Finding> = (0..5).map(|_| finding_with_severity(Severity::Critical)).collect();
        let result = compute(ExecutionId::new(), ExecutionId::new(), &current, &baseline, 0.15);
        let score_finding = result
            .iter()
            .find(|f| f.metric == "safety_score_delta")
            .expect("score delta present");
        assert_eq!(score_finding.severity, DriftSeverity::Critical);
    }
}
