//! Shared HTTP transport used by every probe adapter (spec §4.2).
//!
//! One `Transport` is built per process and handed to adapters by the
//! registry/engine; it owns the connection pool and all retry/backoff logic
//! so adapters stay free of HTTP concerns.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::model::{HttpMethod, LLMConfig};

/// Exponential backoff policy for transport retries: base 0.5s, factor 2,
/// capped at 8s, with a small deterministic jitter to avoid lock-step
/// retries across concurrent workers.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
    pub cap_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 500,
            backoff_factor: 2.0,
            cap_ms: 8_000,
        }
    }
}

impl RetryPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.max(1.0).powi(attempt as i32);
        let millis = (self.base_delay_ms as f64 * factor).round().max(0.0) as u64;
        let jitter = (attempt as u64 * 37) % 50;
        Duration::from_millis(millis.min(self.cap_ms) + jitter)
    }
}

fn build_http_client(timeout_secs: u64) -> Client {
    let timeout = Duration::from_secs(timeout_secs);

    // Some sandboxed environments panic during proxy auto-detection in
    // reqwest's default client builder. Fall back to no-proxy in that case.
    match catch_unwind(AssertUnwindSafe(|| Client::builder().timeout(timeout).build())) {
        Ok(Ok(client)) => client,
        Ok(Err(_)) | Err(_) => Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .expect("failed to construct fallback HTTP client"),
    }
}

pub struct Transport {
    http: Client,
    retry_policy: RetryPolicy,
}

impl Transport {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            http: build_http_client(timeout_secs),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Render the payload, send it to `llm_config.endpoint_url`, retrying
    /// transport errors and 5xx responses per `llm_config.max_retries`, and
    /// return the extracted response text.
    pub async fn send(
        &self,
        llm_config: &LLMConfig,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String> {
        let body = render_payload(&llm_config.payload_template, prompt, system_prompt)?;

        let mut attempt = 0u32;
        loop {
            match self.try_once(llm_config, &body).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    let should_retry = attempt < llm_config.max_retries && err.is_retriable();
                    if !should_retry {
                        return Err(err);
                    }
                    tokio::time::sleep(self.retry_policy.delay_for_attempt(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn try_once(&self, llm_config: &LLMConfig, body: &Value) -> Result<String> {
        let mut request = match llm_config.method {
            HttpMethod::Get => self.http.get(&llm_config.endpoint_url),
            HttpMethod::Post => self.http.post(&llm_config.endpoint_url),
            HttpMethod::Put => self.http.put(&llm_config.endpoint_url),
            HttpMethod::Patch => self.http.patch(&llm_config.endpoint_url),
        };
        for (key, value) in &llm_config.headers {
            request = request.header(key, value);
        }
        if !matches!(llm_config.method, HttpMethod::Get) {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;

        let status = response.status();
        let url = llm_config.endpoint_url.clone();
        let text = response
            .text()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::http_status(status.as_u16(), url));
        }

        let parsed: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(_) => return Ok(text),
        };

        if let Some(message) = error_envelope_message(&parsed) {
            return Err(Error::transport(format!("upstream error envelope: {message}")));
        }

        Ok(extract_response_text(&parsed).unwrap_or(text))
    }
}

/// Recognize `{"error": "..."}`  or `{"error": {"message": "..."}}` envelopes.
fn error_envelope_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    if let Some(message) = error.as_str() {
        return Some(message.to_string());
    }
    error
        .get("message")
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

/// Response extraction fallback chain (spec §4.2): try each shape in order,
/// falling back to the caller's raw body if none match.
fn extract_response_text(body: &Value) -> Option<String> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .or_else(|| body.pointer("/choices/0/text").and_then(Value::as_str))
        .or_else(|| body.get("response").and_then(Value::as_str))
        .or_else(|| body.get("output").and_then(Value::as_str))
        .or_else(|| body.get("text").and_then(Value::as_str))
        .or_else(|| body.as_str())
        .map(|s| s.to_string())
}

/// Two-pass payload renderer (spec §9 design note): string-replace
/// placeholders in the raw template text, then parse as JSON.
///
/// If the rendered object has no `messages` array and the template never
/// referenced `{system_prompt}`, a `messages` array is synthesized (`system`
/// entry only if `system_prompt` was supplied, then a `user` entry for the
/// prompt). A template that itself handles `{system_prompt}` is treated as
/// having its own request schema and is never touched beyond substitution.
pub fn render_payload(template: &str, prompt: &str, system_prompt: Option<&str>) -> Result<Value> {
    let references_system_prompt = template.contains("{system_prompt}");

    let mut rendered_text = template.replace("{prompt}", prompt);
    if let Some(sp) = system_prompt {
        rendered_text = rendered_text.replace("{system_prompt}", sp);
    }

    let mut value: Value = serde_json::from_str(&rendered_text)
        .map_err(|e| Error::payload_render(format!("template did not render to valid JSON: {e}")))?;

    let has_messages = value
        .get("messages")
        .and_then(Value::as_array)
        .is_some();

    if !has_messages && !references_system_prompt {
        if let Some(obj) = value.as_object_mut() {
            obj.insert("messages".to_string(), synthesize_messages(prompt, system_prompt));
        }
    }

    Ok(value)
}

fn synthesize_messages(prompt: &str, system_prompt: Option<&str>) -> Value {
    let mut messages: Vec<Value> = Vec::new();
    if let Some(sp) = system_prompt {
        messages.push(json!({"role": "system", "content": sp}));
    }
    messages.push(json!({"role": "user", "content": prompt}));
    Value::Array(messages)
}
