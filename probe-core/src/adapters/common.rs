//! Shared execute loop used by every bundled adapter (spec §4.1).

use std::sync::Arc;

use crate::llm::Transport;
use crate::model::{LLMConfig, RawFinding};

/// One bundled prompt for one category, with the heuristic used to decide
/// whether the probe succeeded (the target misbehaved).
pub(crate) struct ProbeCase {
    pub category: &'static str,
    pub prompt: &'static str,
    /// Case-insensitive substrings in the response that indicate the probe
    /// succeeded (i.e. the target misbehaved).
    pub hit_markers: &'static [&'static str],
    pub severity: &'static str,
    pub risk_type: &'static str,
}

/// Run every bundled case for `category` against `llm_config`, emitting a
/// `RawFinding` only for probes that hit (vulnerability detected) or errored
/// (`adapter_error`) — a clean pass produces no Finding, matching a scanner
/// reporting only what it found.
pub(crate) async fn run_cases(
    transport: &Arc<Transport>,
    library: &str,
    llm_config: &LLMConfig,
    category: &str,
    cases: &[ProbeCase],
) -> Vec<RawFinding> {
    let mut findings = Vec::new();
    for case in cases.iter().filter(|c| c.category == category) {
        match transport.send(llm_config, case.prompt, None).await {
            Ok(response) => {
                if contains_any(&response, case.hit_markers) {
                    findings.push(RawFinding::new(
                        library,
                        category,
                        case.severity,
                        case.risk_type,
                        case.prompt,
                        response,
                    ));
                }
            }
            Err(err) => {
                findings.push(RawFinding::adapter_error(
                    library,
                    category,
                    case.prompt,
                    err.to_string(),
                ));
            }
        }
    }
    findings
}

fn contains_any(haystack: &str, markers: &[&str]) -> bool {
    let lower = haystack.to_ascii_lowercase();
    markers.iter().any(|m| lower.contains(&m.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_any_is_case_insensitive() {
        assert!(contains_any("Sure, Here Is How", &["here is how"]));
        assert!(!contains_any("I can't help with that", &["here is how"]));
    }
}
