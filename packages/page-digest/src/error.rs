//! Typed errors for the digest pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so the orchestrator can
//! match on the failure kind before collapsing it into the external
//! `{error}` message.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while digesting a document.
#[derive(Debug, Error)]
pub enum DigestError {
    /// Sanitizer produced no text
    #[error("no meaningful content found in document")]
    EmptyContent,

    /// Salience ranking had no sentence with at least one token
    #[error("no sentences found for salience ranking")]
    NoSentences,

    /// Every sentiment window was discarded by the exact-length filter
    #[error("sentiment undetermined: no valid classification windows")]
    NoValidWindows,

    /// An underlying model call failed
    #[error("model inference failed: {0}")]
    ModelInference(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Retrieval collaborator failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// A stage exceeded its wall-clock budget
    #[error("{stage} exceeded its {budget:?} budget")]
    Timeout { stage: &'static str, budget: Duration },

    /// Operation was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// Inference pool is full and configured to reject
    #[error("inference pool at capacity ({capacity} documents in flight)")]
    Overloaded { capacity: usize },

    /// A stage task panicked or was aborted
    #[error("{stage} stage terminated unexpectedly")]
    StagePanicked { stage: &'static str },

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

impl DigestError {
    /// Wrap a message as a model inference failure.
    pub fn inference(message: impl Into<String>) -> Self {
        Self::ModelInference(message.into().into())
    }

    /// Whether the summary fallback may replace this failure.
    pub fn is_recoverable_summary_failure(&self) -> bool {
        matches!(self, Self::ModelInference(_) | Self::Timeout { .. })
    }
}

/// Errors reported by a [`Fetcher`](crate::traits::fetcher::Fetcher).
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Connection timeout
    #[error("timeout fetching: {url}")]
    Timeout { url: String },
}

/// Result type alias for digest operations.
pub type Result<T> = std::result::Result<T, DigestError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_carries_prefix() {
        let err = DigestError::from(FetchError::InvalidUrl {
            url: "not a url".to_string(),
        });
        assert!(err.to_string().starts_with("fetch failed:"));
    }

    #[test]
    fn test_recoverable_summary_failures() {
        assert!(DigestError::inference("boom").is_recoverable_summary_failure());
        assert!(DigestError::Timeout {
            stage: "summarizer",
            budget: Duration::from_millis(5),
        }
        .is_recoverable_summary_failure());
        assert!(!DigestError::EmptyContent.is_recoverable_summary_failure());
        assert!(!DigestError::Cancelled.is_recoverable_summary_failure());
    }
}
