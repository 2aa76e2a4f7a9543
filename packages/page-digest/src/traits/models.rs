//! Model traits: word vectors, sequence-to-sequence generation, and
//! sequence classification.
//!
//! Instances are built once per process and shared behind `Arc`; every method
//! takes `&self` and must be safe for concurrent read-only use.

use async_trait::async_trait;
use std::borrow::Cow;

use super::tokenizer::Tokenizer;
use crate::error::Result;

/// A static word-embedding table.
pub trait WordEmbeddings: Send + Sync {
    /// Vector length.
    fn dimension(&self) -> usize;

    /// Vector for a token, or `None` if the token is out of vocabulary.
    ///
    /// Table-backed implementations borrow; computed ones return owned data.
    fn vector(&self, token: &str) -> Option<Cow<'_, [f32]>>;
}

/// Decode settings for one generate call.
///
/// There is no sampling option; decoding is beam search only so that output
/// is deterministic for a given model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Maximum output length in tokens
    pub max_length: usize,

    /// Minimum output length in tokens
    pub min_length: usize,

    pub num_beams: usize,

    pub length_penalty: f32,

    pub early_stopping: bool,
}

/// A sequence-to-sequence generative model with a fixed input budget.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Tokenizer matching the model's vocabulary.
    fn tokenizer(&self) -> &dyn Tokenizer;

    /// Largest number of input ids the model accepts.
    fn max_input_tokens(&self) -> usize;

    /// Generate and decode output text for the given input ids.
    async fn generate(&self, input_ids: &[u32], params: &GenerationParams) -> Result<String>;
}

/// A sequence classification model.
#[async_trait]
pub trait SequenceClassifier: Send + Sync {
    /// Tokenizer matching the model's vocabulary.
    fn tokenizer(&self) -> &dyn Tokenizer;

    /// Classify bracketed input ids, returning the model's raw label.
    async fn classify(&self, input_ids: &[u32]) -> Result<String>;
}
