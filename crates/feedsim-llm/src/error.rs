//! Error types for completion backends.
//!
//! These never reach the round controller: [`LlmCompletion`] logs them and
//! falls back, or reports "no completion".
//!
//! [`LlmCompletion`]: crate::client::LlmCompletion

/// Errors that can occur while talking to a completion backend.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// The request failed before a response arrived.
    #[error("{backend} request failed: {message}")]
    Request {
        /// Backend name.
        backend: &'static str,
        /// Transport error description.
        message: String,
    },

    /// The backend answered with a non-success status.
    #[error("{backend} returned {status}: {body}")]
    Status {
        /// Backend name.
        backend: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("{backend} response missing {path}")]
    MissingContent {
        /// Backend name.
        backend: &'static str,
        /// JSON path that was expected.
        path: &'static str,
    },

    /// The backend did not answer within the request timeout.
    #[error("{backend} timed out after {timeout_ms}ms")]
    Timeout {
        /// Backend name.
        backend: &'static str,
        /// The timeout that elapsed.
        timeout_ms: u64,
    },
}
