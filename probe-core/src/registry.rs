//! Probe Adapter Registry (spec §4.1): a process-wide `name → adapter`
//! mapping, populated once at startup and read-only afterward.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::Transport;
use crate::model::{LLMConfig, RawFinding};

/// A pluggable probe suite. Adapters are stateless apart from the shared
/// `Transport` they delegate to; the registry hands every adapter the same
/// transport instance.
#[async_trait]
pub trait ProbeAdapter: Send + Sync {
    /// The name this adapter is registered under (e.g. `"garak"`).
    fn name(&self) -> &str;

    /// Whether this adapter has prompts for `category`.
    fn supports(&self, category: &str) -> bool;

    /// Run every bundled prompt for `category` against `llm_config`.
    ///
    /// Never returns an `Err` for a single probe failure: a failed
    /// `(prompt, category)` pair is recorded as `RawFinding::adapter_error`
    /// and execution of the remaining prompts continues (spec §4.1).
    async fn execute(&self, llm_config: &LLMConfig, category: &str) -> Vec<RawFinding>;
}

/// Process-wide registry of probe adapters.
#[derive(Default)]
pub struct Registry {
    adapters: HashMap<String, Arc<dyn ProbeAdapter>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Register an adapter under its own `name()`. Adding an adapter is a
    /// pure registry operation — no schema change is required.
    pub fn register(&mut self, adapter: Arc<dyn ProbeAdapter>) {
        self.adapters.insert(adapter.name().to_string(), adapter);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ProbeAdapter>> {
        self.adapters.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.adapters.keys().map(String::as_str).collect()
    }

    /// The set of `(adapter_name, category)` pairs the engine should
    /// schedule for a pipeline (spec §4.4 step 2): every library the
    /// pipeline selected, crossed with every category it selected, filtered
    /// to pairs the adapter actually supports.
    pub fn work_set<'a>(
        &self,
        libraries: impl IntoIterator<Item = &'a str>,
        categories: impl IntoIterator<Item = &'a str> + Clone,
    ) -> Vec<(String, String)> {
        let mut work = Vec::new();
        for library in libraries {
            let Some(adapter) = self.get(library) else {
                continue;
            };
            for category in categories.clone() {
                if adapter.supports(category) {
                    work.push((library.to_string(), category.to_string()));
                }
            }
        }
        work
    }
}

/// Build a registry with the bundled adapters compiled in under the
/// `builtin-adapters` feature, sharing one `Transport`.
#[cfg(feature = "builtin-adapters")]
pub fn builtin_registry(transport: Arc<Transport>) -> Registry {
    let mut registry = Registry::new();
    registry.register(Arc::new(crate::adapters::garak::GarakAdapter::new(
        transport.clone(),
    )));
    registry.register(Arc::new(crate::adapters::pyrit::PyritAdapter::new(
        transport.clone(),
    )));
    registry.register(Arc::new(crate::adapters::langtest::LangtestAdapter::new(
        transport.clone(),
    )));
    registry.register(Arc::new(crate::adapters::promptfoo::PromptfooAdapter::new(
        transport,
    )));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubAdapter {
        name: &'static str,
        categories: Vec<&'static str>,
    }

    #[async_trait]
    impl ProbeAdapter for StubAdapter {
        fn name(&self) -> &str {
            self.name
        }

        fn supports(&self, category: &str) -> bool {
            self.categories.contains(&category)
        }

        async fn execute(&self, _llm_config: &LLMConfig, _category: &str) -> Vec<RawFinding> {
            Vec::new()
        }
    }

    #[test]
    fn work_set_filters_unsupported_categories() {
        let mut registry = Registry::new();
        registry.register(Arc::new(StubAdapter {
            name: "garak",
            categories: vec!["jailbreak"],
        }));

        let work = registry.work_set(["garak"], ["jailbreak", "toxicity"]);
        assert_eq!(work, vec![("garak".to_string(), "jailbreak".to_string())]);
    }

    #[test]
    fn work_set_skips_unregistered_libraries() {
        let registry = Registry::new();
        let work = registry.work_set(["missing"], ["jailbreak"]);
        assert!(work.is_empty());
    }
}
