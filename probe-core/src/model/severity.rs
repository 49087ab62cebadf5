//! Severity and risk classification shared by findings and drift findings.

use serde::{Deserialize, Serialize};

/// Severity of a `Finding`.
///
/// Unknown adapter output always maps to `Info` — the normalizer never
/// discards a finding for having an unrecognized severity string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    /// Parse a severity string from adapter output, defaulting unknown values to `Info`.
    pub fn parse_or_info(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "critical" => Self::Critical,
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Info,
        }
    }

    /// Safety score deduction for one occurrence of this severity.
    pub fn safety_deduction(self) -> f64 {
        match self {
            Self::Critical => 20.0,
            Self::High => 10.0,
            Self::Medium => 5.0,
            Self::Low => 2.0,
            Self::Info => 0.5,
        }
    }

    pub const ALL: [Severity; 5] = [
        Self::Critical,
        Self::High,
        Self::Medium,
        Self::Low,
        Self::Info,
    ];
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// Severity of a `DriftFinding`. Drift never emits `Info` — channels either
/// omit a metric below threshold or classify it into one of these four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl DriftSeverity {
    /// Drift score deduction for one occurrence of this severity.
    pub fn drift_deduction(self) -> f64 {
        match self {
            Self::Critical => 20.0,
            Self::High => 10.0,
            Self::Medium => 5.0,
            Self::Low => 2.0,
        }
    }

    /// Classify a metric value using the shared bracket rule used by output,
    /// safety, and embedding channels: ≥0.45 critical, ≥0.30 high, ≥0.20
    /// medium, ≥0.10 low, below that no finding.
    pub fn from_bracket(value: f64) -> Option<Self> {
        if value >= 0.45 {
            Some(Self::Critical)
        } else if value >= 0.30 {
            Some(Self::High)
        } else if value >= 0.20 {
            Some(Self::Medium)
        } else if value >= 0.10 {
            Some(Self::Low)
        } else {
            None
        }
    }
}

impl std::fmt::Display for DriftSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Letter grade derived from a 0-100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Safety grade cutoffs: A≥90, B≥80, C≥70, D≥60, else F.
    pub fn for_safety_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::A
        } else if score >= 80.0 {
            Self::B
        } else if score >= 70.0 {
            Self::C
        } else if score >= 60.0 {
            Self::D
        } else {
            Self::F
        }
    }

    /// Drift grade cutoffs: A≥90, B≥75, C≥60, D≥45, else F.
    ///
    /// Deliberately looser than the safety cutoffs — see the open question in
    /// the design notes. Do not reuse `for_safety_score` for drift.
    pub fn for_drift_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::A
        } else if score >= 75.0 {
            Self::B
        } else if score >= 60.0 {
            Self::C
        } else if score >= 45.0 {
            Self::D
        } else {
            Self::F
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
            Self::C => write!(f, "C"),
            Self::D => write!(f, "D"),
            Self::F => write!(f, "F"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_severity_maps_to_info() {
        assert_eq!(Severity::parse_or_info("bogus"), Severity::Info);
        assert_eq!(Severity::parse_or_info("CRITICAL"), Severity::Critical);
    }

    #[test]
    fn safety_grade_cutoffs() {
        assert_eq!(Grade::for_safety_score(90.0), Grade::A);
        assert_eq!(Grade::for_safety_score(89.9), Grade::B);
        assert_eq!(Grade::for_safety_score(60.0), Grade::D);
        assert_eq!(Grade::for_safety_score(59.9), Grade::F);
    }

    #[test]
    fn drift_grade_cutoffs_differ_from_safety() {
        assert_eq!(Grade::for_drift_score(75.0), Grade::B);
        assert_eq!(Grade::for_drift_score(74.9), Grade::C);
        assert_eq!(Grade::for_drift_score(45.0), Grade::D);
    }

    #[test]
    fn drift_bracket_floor() {
        assert_eq!(DriftSeverity::from_bracket(0.09), None);
        assert_eq!(DriftSeverity::from_bracket(0.10), Some(DriftSeverity::Low));
        assert_eq!(DriftSeverity::from_bracket(0.45), Some(DriftSeverity::Critical));
    }
}
