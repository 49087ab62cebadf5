//! Agent/tool drift channel (spec §4.8.5): tool-frequency χ², tool-sequence
//! Jaccard, new-tool introduction, and loop detection. Only emitted when
//! both sides have at least one `AgentTrace`.

use std::collections::{HashMap, HashSet};

use crate::model::{AgentTrace, DriftChannel, DriftFinding, DriftSeverity, ExecutionId};

use super::stats::{chi_square_normalized, jaccard_similarity};

fn tool_frequency_histogram(traces: &[AgentTrace]) -> HashMap<String, u64> {
    let mut histogram = HashMap::new();
    for trace in traces {
        for call in &trace.calls {
            *histogram.entry(call.tool_name.clone()).or_insert(0) += 1;
        }
    }
    histogram
}

fn bigram_set(traces: &[AgentTrace]) -> HashSet<(String, String)> {
    traces.iter().flat_map(AgentTrace::bigrams).collect()
}

fn tool_name_set(traces: &[AgentTrace]) -> HashSet<String> {
    traces
        .iter()
        .flat_map(|t| t.calls.iter().map(|c| c.tool_name.clone()))
        .collect()
}

pub fn compute(
    current_execution_id: ExecutionId,
    baseline_execution_id: ExecutionId,
    current_traces: &[AgentTrace],
    baseline_traces: &[AgentTrace],
    threshold: f64,
) -> Vec<DriftFinding> {
    if current_traces.is_empty() || baseline_traces.is_empty() {
        return Vec::new();
    }

    let mut findings = Vec::new();

    let baseline_histogram = tool_frequency_histogram(baseline_traces);
    let current_histogram = tool_frequency_histogram(current_traces);
    let chi2 = chi_square_normalized(&baseline_histogram, &current_histogram);
    if chi2 >= threshold {
        if let Some(severity) = DriftSeverity::from_bracket(chi2) {
            findings.push(DriftFinding::new(
                current_execution_id,
                baseline_execution_id,
                DriftChannel::AgentTool,
                "tool_frequency_chi2",
                chi2,
                threshold,
                severity,
            ));
        }
    }

    let baseline_bigrams = bigram_set(baseline_traces);
    let current_bigrams = bigram_set(current_traces);
    let jaccard_distance = 1.0 - jaccard_similarity(&current_bigrams, &baseline_bigrams);
    if jaccard_distance >= threshold {
        if let Some(severity) = DriftSeverity::from_bracket(jaccard_distance) {
            findings.push(DriftFinding::new(
                current_execution_id,
                baseline_execution_id,
                DriftChannel::AgentTool,
                "tool_sequence_jaccard",
                jaccard_distance,
                threshold,
                severity,
            ));
        }
    }

    // Presence-based findings, not a continuous magnitude: any new tool or
    // newly-looping tool is reported regardless of the channel threshold.
    let baseline_tools = tool_name_set(baseline_traces);
    for new_tool in tool_name_set(current_traces).difference(&baseline_tools) {
        findings.push(
            DriftFinding::new(
                current_execution_id,
                baseline_execution_id,
                DriftChannel::AgentTool,
                "new_tool_introduced",
                1.0,
                threshold,
                DriftSeverity::Low,
            )
            .with_detail("tool", serde_json::Value::String(new_tool.clone())),
        );
    }

    let baseline_loops: HashSet<String> = baseline_traces.iter().flat_map(AgentTrace::looping_tools).collect();
    let current_loops: HashSet<String> = current_traces.iter().flat_map(AgentTrace::looping_tools).collect();
    for looping_tool in current_loops.difference(&baseline_loops) {
        findings.push(
            DriftFinding::new(
                current_execution_id,
                baseline_execution_id,
                DriftChannel::AgentTool,
                "tool_loop_detected",
                1.0,
                threshold,
                DriftSeverity::Medium,
            )
            .with_detail("tool", serde_json::Value::String(looping_tool.clone())),
        );
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FindingId, ToolCall};

    fn trace(tools: &[&str]) -> AgentTrace {
        AgentTrace::new(
            FindingId::new(),
            tools
                .iter()
                .map(|t| ToolCall {
                    tool_name: t.to_string(),
                    args: None,
                    result: None,
                })
                .collect(),
        )
    }

    #[test]
    fn no_traces_on_either_side_yields_nothing() {
        assert!(compute(ExecutionId::new(), ExecutionId::new(), &[], &[], 0.25).is_empty());
    }

    #[test]
    fn missing_traces_on_one_side_yields_nothing() {
        let traces = vec![trace(&["search"])];
        assert!(compute(ExecutionId::new(), ExecutionId::new(), &traces, &[], 0.25).is_empty());
    }

    #[test]
    fn new_tool_is_detected() {
        let baseline = vec![trace(&["search"])];
        let current = vec![trace(&["search", "shell"])];
        let findings = compute(ExecutionId::new(), ExecutionId::new(), &current, &baseline, 0.25);
        assert!(findings
            .iter()
            .any(|f| f.metric == "new_tool_introduced" && f.details.get("tool").and_then(|v| v.as_str()) == Some("shell")));
    }

    #[test]
    fn loop_only_in_current_is_detected() {
        let baseline = vec![trace(&["search", "write"])];
        let current = vec![trace(&["search", "search", "search"])];
        let findings = compute(ExecutionId::new(), ExecutionId::new(), &current, &baseline, 0.25);
        assert!(findings.iter().any(|f| f.metric == "tool_loop_detected"));
    }
}
