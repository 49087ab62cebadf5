//! Runtime configuration for probe-core, loaded from environment variables.
//!
//! This is the core's own operational configuration — worker pool size, HTTP
//! timeouts, the embedding service endpoint — distinct from the `LLMConfig`/
//! `Pipeline` entities, which are CRUD-owned data.

use std::collections::HashMap;
use std::env;

use crate::error::{Error, Result};

const DEFAULT_WORKER_PARALLELISM: usize = 8;
const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_HTTP_MAX_RETRIES: u32 = 3;
const DEFAULT_DRIFT_COMPARISON_TIMEOUT_SECONDS: u64 = 600;

/// Default per-channel drift thresholds (spec §4.8), used when
/// `DRIFT_THRESHOLDS` does not override a given channel.
pub fn default_drift_thresholds() -> HashMap<String, f64> {
    let mut m = HashMap::new();
    m.insert("output".to_string(), 0.20);
    m.insert("safety".to_string(), 0.15);
    m.insert("distribution".to_string(), 0.20);
    m.insert("embedding".to_string(), 0.30);
    m.insert("agent_tool".to_string(), 0.25);
    m
}

#[derive(Debug, Clone)]
pub struct Config {
    pub worker_parallelism: usize,
    pub http_timeout_seconds: u64,
    pub http_max_retries: u32,
    pub embedding_service_url: Option<String>,
    pub embedding_model_name: Option<String>,
    pub drift_thresholds: HashMap<String, f64>,
    pub drift_comparison_timeout_seconds: u64,
    pub enable_agent_traces: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_parallelism: DEFAULT_WORKER_PARALLELISM,
            http_timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
            http_max_retries: DEFAULT_HTTP_MAX_RETRIES,
            embedding_service_url: None,
            embedding_model_name: None,
            drift_thresholds: default_drift_thresholds(),
            drift_comparison_timeout_seconds: DEFAULT_DRIFT_COMPARISON_TIMEOUT_SECONDS,
            enable_agent_traces: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// spec-mandated defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(v) = env::var("WORKER_PARALLELISM") {
            cfg.worker_parallelism = parse_env("WORKER_PARALLELISM", &v)?;
        }
        if let Ok(v) = env::var("HTTP_TIMEOUT_SECONDS") {
            cfg.http_timeout_seconds = parse_env("HTTP_TIMEOUT_SECONDS", &v)?;
        }
        if let Ok(v) = env::var("HTTP_MAX_RETRIES") {
            cfg.http_max_retries = parse_env("HTTP_MAX_RETRIES", &v)?;
        }
        if let Ok(v) = env::var("EMBEDDING_SERVICE_URL") {
            cfg.embedding_service_url = Some(v);
        }
        if let Ok(v) = env::var("EMBEDDING_MODEL_NAME") {
            cfg.embedding_model_name = Some(v);
        }
        if let Ok(v) = env::var("DRIFT_THRESHOLDS") {
            cfg.drift_thresholds = parse_drift_thresholds(&v)?;
        }
        if let Ok(v) = env::var("DRIFT_COMPARISON_TIMEOUT_SECONDS") {
            cfg.drift_comparison_timeout_seconds = parse_env("DRIFT_COMPARISON_TIMEOUT_SECONDS", &v)?;
        }
        if let Ok(v) = env::var("ENABLE_AGENT_TRACES") {
            cfg.enable_agent_traces = parse_bool("ENABLE_AGENT_TRACES", &v)?;
        }

        Ok(cfg)
    }

    /// Threshold for a drift channel, falling back to the spec default if the
    /// channel name is unrecognized or was not overridden.
    pub fn drift_threshold(&self, channel: &str) -> f64 {
        self.drift_thresholds
            .get(channel)
            .copied()
            .unwrap_or_else(|| {
                default_drift_thresholds()
                    .get(channel)
                    .copied()
                    .unwrap_or(0.20)
            })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{name} must be a valid number, got {raw:?}")))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!(
            "{name} must be a boolean, got {raw:?}"
        ))),
    }
}

/// `DRIFT_THRESHOLDS` is a comma-separated `channel=value` list, e.g.
/// `"output=0.2,safety=0.15"`. Unrecognized channels are kept verbatim so a
/// forward-compatible caller can add channels without a core release.
fn parse_drift_thresholds(raw: &str) -> Result<HashMap<String, f64>> {
    let mut thresholds = default_drift_thresholds();
    for pair in raw.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (channel, value) = pair.split_once('=').ok_or_else(|| {
            Error::Config(format!(
                "DRIFT_THRESHOLDS entry {pair:?} must be of the form channel=value"
            ))
        })?;
        let value: f64 = value.trim().parse().map_err(|_| {
            Error::Config(format!(
                "DRIFT_THRESHOLDS value for {channel:?} must be a float, got {value:?}"
            ))
        })?;
        thresholds.insert(channel.trim().to_string(), value);
    }
    Ok(thresholds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.worker_parallelism, 8);
        assert_eq!(cfg.http_timeout_seconds, 30);
        assert_eq!(cfg.http_max_retries, 3);
        assert_eq!(cfg.drift_comparison_timeout_seconds, 600);
        assert!(!cfg.enable_agent_traces);
        assert_eq!(cfg.drift_threshold("output"), 0.20);
        assert_eq!(cfg.drift_threshold("embedding"), 0.30);
    }

    #[test]
    fn parses_drift_thresholds_overrides() {
        let thresholds = parse_drift_thresholds("output=0.1,safety=0.05").unwrap();
        assert_eq!(thresholds.get("output"), Some(&0.1));
        assert_eq!(thresholds.get("safety"), Some(&0.05));
        // Unmentioned channels keep their spec default.
        assert_eq!(thresholds.get("embedding"), Some(&0.30));
    }

    #[test]
    fn rejects_malformed_threshold_entry() {
        assert!(parse_drift_thresholds("output").is_err());
        assert!(parse_drift_thresholds("output=notanumber").is_err());
    }

    #[test]
    fn parses_bool_variants() {
        assert!(parse_bool("X", "true").unwrap());
        assert!(parse_bool("X", "1").unwrap());
        assert!(!parse_bool("X", "false").unwrap());
        assert!(parse_bool("X", "nope").is_err());
    }
}
