//! Document types: raw fetched content and sanitized content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Raw document content before sanitization.
///
/// This is the output from a [`Fetcher`](crate::traits::fetcher::Fetcher): markup that
/// has not been stripped yet. It is consumed once by the sanitizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    /// Source URL, if the document came from the web
    pub url: Option<String>,

    /// Raw body (HTML or plain text)
    pub body: String,

    /// MIME type if known (e.g., "text/html")
    pub content_type: Option<String>,

    /// When the content was fetched
    pub fetched_at: DateTime<Utc>,
}

impl RawDocument {
    /// Create a raw document with no source URL.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            url: None,
            body: body.into(),
            content_type: None,
            fetched_at: Utc::now(),
        }
    }

    /// Set the source URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the fetched timestamp.
    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }

    /// Get body length in bytes.
    pub fn content_length(&self) -> usize {
        self.body.len()
    }
}

/// Real meaningful content: sanitized, whitespace-collapsed, non-empty text.
///
/// Only [`sanitize`](crate::sanitize::sanitize) constructs this type. Cloning
/// shares the underlying buffer, so each pipeline stage holds its own
/// read-only handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rmc(Arc<str>);

impl Rmc {
    pub(crate) fn new_unchecked(text: String) -> Self {
        Self(Arc::from(text))
    }

    /// The sanitized text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of whitespace-separated words.
    pub fn word_count(&self) -> usize {
        self.0.split_whitespace().count()
    }
}

impl Deref for Rmc {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Rmc {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Rmc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Rmc {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
