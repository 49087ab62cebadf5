//! `AgentTrace`: derived tool-call sequence extracted from a Finding's metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::finding::FindingId;

/// One tool invocation within an agent trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    pub args: Option<Value>,
    pub result: Option<Value>,
}

/// Derived, not authoritative: reconstructed from `Finding.extra` by the
/// agent-trace extractor, never written directly by an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTrace {
    pub finding_id: FindingId,
    pub calls: Vec<ToolCall>,
}

impl AgentTrace {
    pub fn new(finding_id: FindingId, calls: Vec<ToolCall>) -> Self {
        Self { finding_id, calls }
    }

    /// Consecutive `(tool_i, tool_i+1)` bigrams, used by the agent/tool drift channel.
    pub fn bigrams(&self) -> Vec<(String, String)> {
        self.calls
            .windows(2)
            .map(|w| (w[0].tool_name.clone(), w[1].tool_name.clone()))
            .collect()
    }

    /// Tool names with three or more consecutive repeats ("loops").
    pub fn looping_tools(&self) -> Vec<String> {
        let mut found = Vec::new();
        let mut run_tool: Option<&str> = None;
        let mut run_len = 0usize;
        for call in &self.calls {
            if Some(call.tool_name.as_str()) == run_tool {
                run_len += 1;
            } else {
                run_tool = Some(call.tool_name.as_str());
                run_len = 1;
            }
            if run_len == 3 {
                found.push(call.tool_name.clone());
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(tool: &str) -> ToolCall {
        ToolCall {
            tool_name: tool.to_string(),
            args: None,
            result: None,
        }
    }

    #[test]
    fn bigrams_are_consecutive_pairs() {
        let trace = AgentTrace::new(FindingId::new(), vec![call("a"), call("b"), call("c")]);
        assert_eq!(
            trace.bigrams(),
            vec![("a".to_string(), "b".to_string()), ("b".to_string(), "c".to_string())]
        );
    }

    #[test]
    fn detects_three_consecutive_repeats() {
        let trace = AgentTrace::new(
            FindingId::new(),
            vec![call("x"), call("x"), call("x"), call("y")],
        );
        assert_eq!(trace.looping_tools(), vec!["x".to_string()]);
    }

    #[test]
    fn no_loop_below_three_repeats() {
        let trace = AgentTrace::new(FindingId::new(), vec![call("x"), call("x"), call("y")]);
        assert!(trace.looping_tools().is_empty());
    }
}
