//! Normalizer (spec §4.3): turns one adapter's `RawFinding` into a canonical
//! `Finding`, enforcing the severity/confidence/evidence invariants of §3.

use chrono::Utc;
use std::collections::HashMap;

use crate::model::{Finding, FindingId, RawFinding, Severity};

/// Normalize a `RawFinding` produced during `execution_id`'s run.
///
/// Never fails: an unrecognized severity defaults to `info`, an out-of-range
/// confidence is clamped, and an empty `risk_type` is defaulted from the
/// category. Ingest never discards data silently (spec §4.3).
pub fn normalize(
    raw: RawFinding,
    execution_id: crate::model::ExecutionId,
) -> Finding {
    let severity = Severity::parse_or_info(&raw.severity);
    let confidence = raw.confidence.map(|c| c.clamp(0.0, 1.0));
    let risk_type = if raw.risk_type.trim().is_empty() {
        default_risk_type(&raw.category)
    } else {
        raw.risk_type
    };

    Finding {
        id: FindingId::new(),
        execution_id,
        library: raw.library,
        test_category: raw.category,
        severity,
        risk_type,
        evidence_prompt: raw.evidence_prompt,
        evidence_response: raw.evidence_response,
        confidence,
        extra: raw.metadata,
        created_at: Utc::now(),
    }
}

fn default_risk_type(category: &str) -> String {
    if category.trim().is_empty() {
        "unknown".to_string()
    } else {
        category.to_string()
    }
}

/// Build the `info`-severity Finding recorded when normalization itself
/// cannot proceed (spec §4.3's "any validation error produces an `info`
/// Finding describing the validation failure").
pub fn normalization_error_finding(
    execution_id: crate::model::ExecutionId,
    library: impl Into<String>,
    category: impl Into<String>,
    message: impl Into<String>,
) -> Finding {
    let mut extra = HashMap::new();
    extra.insert(
        "error".to_string(),
        serde_json::Value::String(message.into()),
    );
    Finding {
        id: FindingId::new(),
        execution_id,
        library: library.into(),
        test_category: category.into(),
        severity: Severity::Info,
        risk_type: "normalization_error".to_string(),
        evidence_prompt: String::new(),
        evidence_response: String::new(),
        confidence: None,
        extra,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExecutionId;

    #[test]
    fn unknown_severity_downgrades_to_info() {
        let raw = RawFinding::new("garak", "dan", "catastrophic", "jailbreak", "p", "r");
        let finding = normalize(raw, ExecutionId::new());
        assert_eq!(finding.severity, Severity::Info);
    }

    #[test]
    fn confidence_is_clamped() {
        let raw = RawFinding::new("garak", "dan", "high", "jailbreak", "p", "r")
            .with_confidence(1.8);
        let finding = normalize(raw, ExecutionId::new());
        assert_eq!(finding.confidence, Some(1.0));

        let raw = RawFinding::new("garak", "dan", "high", "jailbreak", "p", "r")
            .with_confidence(-0.3);
        let finding = normalize(raw, ExecutionId::new());
        assert_eq!(finding.confidence, Some(0.0));
    }

    #[test]
    fn empty_risk_type_defaults_from_category() {
        let raw = RawFinding::new("garak", "dan", "high", "", "p", "r");
        let finding = normalize(raw, ExecutionId::new());
        assert_eq!(finding.risk_type, "dan");
    }

    #[test]
    fn evidence_is_stored_verbatim() {
        let long_prompt = "x".repeat(10_000);
        let raw = RawFinding::new("garak", "dan", "high", "jailbreak", long_prompt.clone(), "r");
        let finding = normalize(raw, ExecutionId::new());
        assert_eq!(finding.evidence_prompt, long_prompt);
    }
}
