//! Error taxonomy for probe-core.

use thiserror::Error;

/// Result type alias using probe-core's `Error` type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running probes, normalizing findings,
/// scoring, or comparing drift.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure (connection refused, DNS, stream reset). Retriable.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx HTTP response from the target endpoint. Retriable iff 5xx.
    #[error("HTTP status error: {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// The payload template could not be rendered. Fatal to the single probe.
    #[error("payload render error: {0}")]
    PayloadRender(String),

    /// An adapter-internal fault, wrapping whatever the adapter raised.
    #[error("adapter error in {library}/{category}: {message}")]
    Adapter {
        library: String,
        category: String,
        message: String,
    },

    /// A `RawFinding` failed normalization; downgraded to an `info` Finding by the caller.
    #[error("normalization error: {0}")]
    Normalization(String),

    /// The embedding service is unreachable or returned an unusable payload. Non-fatal to execution.
    #[error("embedding service error: {0}")]
    EmbeddingService(String),

    /// `BaselineRef` did not resolve to any execution.
    #[error("baseline not found: {0}")]
    BaselineNotFound(String),

    /// `BaselineRef` resolved to an execution that is not Completed.
    #[error("baseline not usable: {0}")]
    BaselineNotUsable(String),

    /// One drift channel failed; non-fatal to the comparison as a whole.
    #[error("drift channel error ({channel}): {message}")]
    DriftChannel { channel: String, message: String },

    /// A persistence operation failed. Fatal to the enclosing operation.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// A per-operation timeout elapsed.
    #[error("operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The operation was cancelled by a caller-issued cancel signal.
    #[error("operation cancelled")]
    Cancelled,

    /// Serialization/deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Core runtime misconfiguration (e.g. unparsable environment variable).
    #[error("configuration error: {0}")]
    Config(String),

    /// Anything not covered by a more specific variant.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn http_status(status: u16, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    pub fn payload_render(message: impl Into<String>) -> Self {
        Self::PayloadRender(message.into())
    }

    pub fn adapter(
        library: impl Into<String>,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Adapter {
            library: library.into(),
            category: category.into(),
            message: message.into(),
        }
    }

    pub fn normalization(message: impl Into<String>) -> Self {
        Self::Normalization(message.into())
    }

    pub fn embedding_service(message: impl Into<String>) -> Self {
        Self::EmbeddingService(message.into())
    }

    pub fn baseline_not_found(message: impl Into<String>) -> Self {
        Self::BaselineNotFound(message.into())
    }

    pub fn baseline_not_usable(message: impl Into<String>) -> Self {
        Self::BaselineNotUsable(message.into())
    }

    pub fn drift_channel(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DriftChannel {
            channel: channel.into(),
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Whether this error should trigger a retry per spec §4.2: transport
    /// errors and 5xx responses are retriable; 4xx is not.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout { .. } => true,
            Self::HttpStatus { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_retriable_only_for_5xx() {
        assert!(Error::http_status(500, "https://x").is_retriable());
        assert!(Error::http_status(503, "https://x").is_retriable());
        assert!(!Error::http_status(404, "https://x").is_retriable());
        assert!(!Error::http_status(429, "https://x").is_retriable());
    }

    #[test]
    fn transport_and_timeout_are_retriable() {
        assert!(Error::transport("connection reset").is_retriable());
        assert!(Error::timeout(5000).is_retriable());
    }

    #[test]
    fn adapter_and_config_errors_not_retriable() {
        assert!(!Error::adapter("garak", "dan", "boom").is_retriable());
        assert!(!Error::Config("bad env var".into()).is_retriable());
    }
}
