//! Output drift channel (spec §4.8.1): response-length KS statistic and
//! mean response-entropy delta.

use crate::model::{DriftChannel, DriftFinding, DriftSeverity, ExecutionId, Finding};

use super::stats::{ks_statistic, mean_entropy, ENTROPY_DIVISOR_EPSILON};

pub fn compute(
    current_execution_id: ExecutionId,
    baseline_execution_id: ExecutionId,
    current_findings: &[Finding],
    baseline_findings: &[Finding],
    threshold: f64,
) -> Vec<DriftFinding> {
    let mut findings = Vec::new();

    let current_lengths: Vec<f64> = current_findings
        .iter()
        .map(|f| f.evidence_response.chars().count() as f64)
        .collect();
    let baseline_lengths: Vec<f64> = baseline_findings
        .iter()
        .map(|f| f.evidence_response.chars().count() as f64)
        .collect();

    let ks = ks_statistic(&baseline_lengths, &current_lengths);
    if ks >= threshold {
        if let Some(severity) = DriftSeverity::from_bracket(ks) {
            findings.push(
                DriftFinding::new(
                    current_execution_id,
                    baseline_execution_id,
                    DriftChannel::Output,
                    "response_length_ks",
                    ks,
                    threshold,
                    severity,
                ),
            );
        }
    }

    let current_entropy = mean_entropy(current_findings.iter().map(|f| f.evidence_response.as_str()));
    let baseline_entropy = mean_entropy(baseline_findings.iter().map(|f| f.evidence_response.as_str()));
    let entropy_delta =
        (current_entropy - baseline_entropy).abs() / baseline_entropy.max(ENTROPY_DIVISOR_EPSILON);
    if entropy_delta >= threshold {
        if let Some(severity) = DriftSeverity::from_bracket(entropy_delta) {
            findings.push(DriftFinding::new(
                current_execution_id,
                baseline_execution_id,
                DriftChannel::Output,
                "response_entropy_delta",
                entropy_delta,
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

    fn finding_with_response(response: &str) -> Finding {
        Finding {
            id: crate::model::FindingId::new(),
            execution_id: ExecutionId::new(),
            library: "garak".to_string(),
            test_category: "jailbreak".to_string(),
            severity: crate::model::Severity::Info,
            risk_type: "jailbreak".to_string(),
            evidence_prompt: "p".to_string(),
            evidence_response: response.to_string(),
            confidence: None,
            extra: Default::default(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn s4_response_length_ks_is_one_and_critical() {
        let baseline: Vec<Finding> = (0..20).map(|_| finding_with_response(&"x".repeat(100))).collect();
        let current: Vec<Finding> = (0..20).map(|_| finding_with_response(&"x".repeat(500))).collect();

        let findings = compute(ExecutionId::new(), ExecutionId::new(), &current, &baseline, 0.20);
        let ks_finding = findings
            .iter()
            .find(|f| f.metric == "response_length_ks")
            .expect("ks finding present");
        assert_eq!(ks_finding.value, 1.0);
        assert_eq!(ks_finding.severity, DriftSeverity::Critical);
    }

    #[test]
    fn identical_distributions_yield_no_findings() {
        let findings_side: Vec<Finding> = (0..5).map(|_| finding_with_response("hello world")).collect();
        let findings = compute(
            ExecutionId::new(),
            ExecutionId::new(),
            &findings_side,
            &findings_side,
            0.20,
        );
        assert!(findings.is_empty());
    }
}
