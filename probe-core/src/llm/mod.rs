//! Shared LLM transport: HTTP client, payload rendering, response extraction.

mod transport;

pub use transport::{render_payload, RetryPolicy, Transport};
