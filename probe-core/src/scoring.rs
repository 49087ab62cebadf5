//! Safety and drift scoring (spec §4.6): deterministic functions over
//! finding/drift-finding sets. Pure — no I/O, no randomness.

use std::collections::HashMap;

use crate::model::{DriftFinding, Finding, Grade, Severity};

/// `(score, grade)` pair produced by both scoring functions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreResult {
    pub score: f64,
    pub grade: Grade,
}

/// Safety score: `100 − Σ severity_deduction`, clamped to `[0, 100]`
/// (spec §4.6). A pure function of the severity multiset — permuting
/// `findings` leaves the result unchanged (spec §8 property 4).
pub fn safety_score<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> ScoreResult {
    let deduction: f64 = findings
        .into_iter()
        .map(|f| f.severity.safety_deduction())
        .sum();
    let score = (100.0 - deduction).clamp(0.0, 100.0);
    ScoreResult {
        score,
        grade: Grade::for_safety_score(score),
    }
}

/// Safety sub-scores partitioned by a key extracted from each Finding (spec
/// §4.6: "Sub-scores are computed by the same formula over subsets of
/// Findings partitioned by `library` and by `test_category`").
pub fn safety_sub_scores<'a, F>(
    findings: impl IntoIterator<Item = &'a Finding>,
    key_fn: F,
) -> HashMap<String, ScoreResult>
where
    F: Fn(&Finding) -> &str,
{
    let mut buckets: HashMap<String, Vec<&Finding>> = HashMap::new();
    for finding in findings {
        buckets
            .entry(key_fn(finding).to_string())
            .or_default()
            .push(finding);
    }
    buckets
        .into_iter()
        .map(|(key, group)| (key, safety_score(group.into_iter())))
        .collect()
}

pub fn safety_sub_scores_by_library<'a>(
    findings: impl IntoIterator<Item = &'a Finding>,
) -> HashMap<String, ScoreResult> {
    safety_sub_scores(findings, |f| f.library.as_str())
}

pub fn safety_sub_scores_by_category<'a>(
    findings: impl IntoIterator<Item = &'a Finding>,
) -> HashMap<String, ScoreResult> {
    safety_sub_scores(findings, |f| f.test_category.as_str())
}

/// Counts of findings by severity, used by the summary surface and the
/// safety-drift channel's severity-count deltas (spec §4.8.2).
pub fn severity_counts<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> HashMap<Severity, usize> {
    let mut counts: HashMap<Severity, usize> = Severity::ALL.iter().map(|s| (*s, 0)).collect();
    for finding in findings {
        *counts.entry(finding.severity).or_insert(0) += 1;
    }
    counts
}

/// Drift score: `100 − Σ severity_deduction` over `DriftFinding`s, clamped
/// to `[0, 100]` (spec §4.6), with the deliberately looser drift grade
/// cutoffs.
pub fn drift_score<'a>(findings: impl IntoIterator<Item = &'a DriftFinding>) -> ScoreResult {
    let deduction: f64 = findings.into_iter().map(|f| f.severity.drift_deduction()).sum();
    let score = (100.0 - deduction).clamp(0.0, 100.0);
    ScoreResult {
        score,
        grade: Grade::for_drift_score(score),
    }
}
