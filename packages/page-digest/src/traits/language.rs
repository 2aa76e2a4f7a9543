//! Linguistic analysis trait: sentence segmentation and entity recognition.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::entity::EntitySpan;

/// A sentence and its tokens, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub text: String,
    pub tokens: Vec<String>,
}

impl Sentence {
    pub fn new(text: impl Into<String>, tokens: Vec<String>) -> Self {
        Self {
            text: text.into(),
            tokens,
        }
    }
}

/// Output of one language model pass over a text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyzedText {
    pub sentences: Vec<Sentence>,

    /// Entity spans in document order, repeats included
    pub entities: Vec<EntitySpan>,
}

/// A linguistic model providing sentences, tokens and named entities.
///
/// Both the entity ranker and the salience ranker use the same model so that
/// sentence boundaries and tokenization agree.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<AnalyzedText>;
}
