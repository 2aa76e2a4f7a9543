//! Fetcher trait for retrieving raw documents.

use async_trait::async_trait;

use crate::error::FetchResult;
use crate::types::document::RawDocument;

/// Turns a URL into raw HTML or text.
///
/// Implementations must bound their own wait time and report failures as
/// [`FetchError`](crate::error::FetchError) so callers can tell network
/// problems apart from content-analysis problems. The pipeline never retries
/// a fetch.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a single URL.
    async fn fetch(&self, url: &str) -> FetchResult<RawDocument>;
}
