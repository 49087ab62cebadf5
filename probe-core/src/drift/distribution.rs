//! Distribution drift channel (spec §4.8.3): PSI on the severity
//! distribution.

use std::collections::HashMap;

use crate::model::{DriftChannel, DriftFinding, DriftSeverity, ExecutionId, Finding, Severity};
use crate::scoring::severity_counts;

use super::stats::population_stability_index;

/// PSI-specific severity brackets (spec §4.8.3): distinct from the shared
/// output/safety/embedding brackets — floor at `0.10`, no `critical` until
/// `0.25`.
fn psi_severity(value: f64) -> Option<DriftSeverity> {
    if value >= 0.25 {
        Some(DriftSeverity::Critical)
    } else if value >= 0.15 {
        Some(DriftSeverity::High)
    } else if value >= 0.10 {
        Some(DriftSeverity::Medium)
    } else {
        None
    }
}

fn severity_fractions(findings: &[Finding]) -> HashMap<Severity, f64> {
    let counts = severity_counts(findings.iter());
    let total: usize = counts.values().sum();
    if total == 0 {
        return HashMap::new();
    }
    counts
        .into_iter()
        .map(|(severity, count)| (severity, count as f64 / total as f64))
        .collect()
}

pub fn compute(
    current_execution_id: ExecutionId,
    baseline_execution_id: ExecutionId,
    current_findings: &[Finding],
    baseline_findings: &[Finding],
    threshold: f64,
) -> Vec<DriftFinding> {
    let baseline_fractions = severity_fractions(baseline_findings);
    let current_fractions = severity_fractions(current_findings);

    let psi = population_stability_index(&baseline_fractions, &current_fractions);
    if psi < threshold {
        return Vec::new();
    }
    match psi_severity(psi) {
        Some(severity) => vec![DriftFinding::new(
            current_execution_id,
            baseline_execution_id,
            DriftChannel::Distribution,
            "severity_psi",
            psi,
            threshold,
            severity,
        )],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn findings_of(counts: &[(Severity, usize)]) -> Vec<Finding> {
        counts
            .iter()
            .flat_map(|(severity, n)| {
                (0..*n).map(move |_| Finding {
                    id: crate::model::FindingId::new(),
                    execution_id: ExecutionId::new(),
                    library: "garak".to_string(),
                    test_category: "jailbreak".to_string(),
                    severity: *severity,
                    risk_type: "jailbreak".to_string(),
                    evidence_prompt: "p".to_string(),
                    evidence_response: "r".to_string(),
                    confidence: None,
                    extra: Default::default(),
                    created_at: chrono::Utc::now(),
                })
            })
            .collect()
    }

    #[test]
    fn s5_psi_scenario_emits_critical() {
        let baseline = findings_of(&[
            (Severity::Critical, 2),
            (Severity::High, 6),
            (Severity::Medium, 6),
            (Severity::Low, 4),
            (Severity::Info, 2),
        ]);
        let current = findings_of(&[
            (Severity::Critical, 7),
            (Severity::High, 5),
            (Severity::Medium, 5),
            (Severity::Low, 3),
        ]);

        let findings = compute(ExecutionId::new(), ExecutionId::new(), &current, &baseline, 0.20);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].metric, "severity_psi");
        assert_eq!(findings[0].severity, DriftSeverity::Critical);
        assert!((findings[0].value - 0.32).abs() < 0.05);
    }

    #[test]
    fn identical_distributions_emit_nothing() {
        let side = findings_of(&[(Severity::Low, 4)]);
        let findings = compute(ExecutionId::new(), ExecutionId::new(), &side, &side, 0.20);
        assert!(findings.is_empty());
    }
}
