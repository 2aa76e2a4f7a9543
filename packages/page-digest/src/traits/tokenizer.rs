//! Tokenizer trait shared by the generative and classification models.

use crate::error::Result;

/// Maps text to model input ids and back.
pub trait Tokenizer: Send + Sync {
    /// Encode text without special tokens.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Decode ids to text, skipping special tokens.
    fn decode(&self, ids: &[u32]) -> Result<String>;

    /// Id of the marker placed before a classifier input.
    fn begin_id(&self) -> u32;

    /// Id of the marker placed after a classifier input.
    fn end_id(&self) -> u32;
}
