//! Request and result records crossing the pipeline boundary.

use serde::{Deserialize, Serialize};

use super::document::Rmc;
use super::entity::Entity;
use super::sentiment::Sentiment;
use crate::error::DigestError;

/// A sentence with its salience score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSentence {
    pub text: String,
    pub salience: f32,
}

/// Input to one pipeline invocation.
///
/// Unset limits fall back to the pipeline's configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestRequest {
    pub raw_html_or_text: String,

    #[serde(default)]
    pub summary_length: Option<usize>,

    #[serde(default)]
    pub entity_limit: Option<usize>,
}

impl DigestRequest {
    pub fn new(raw_html_or_text: impl Into<String>) -> Self {
        Self {
            raw_html_or_text: raw_html_or_text.into(),
            summary_length: None,
            entity_limit: None,
        }
    }

    /// Set the target summary length.
    pub fn with_summary_length(mut self, length: usize) -> Self {
        self.summary_length = Some(length);
        self
    }

    /// Set the maximum number of entities returned.
    pub fn with_entity_limit(mut self, limit: usize) -> Self {
        self.entity_limit = Some(limit);
        self
    }
}

/// The digest of one document. Assembled once by the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    summary: String,
    entities: Vec<Entity>,
    sentiment: Sentiment,
    #[serde(rename = "rawContent")]
    raw_content: Rmc,
    #[serde(rename = "keySentences")]
    key_sentences: Vec<RankedSentence>,
}

impl PipelineResult {
    pub(crate) fn new(
        summary: String,
        entities: Vec<Entity>,
        sentiment: Sentiment,
        raw_content: Rmc,
        key_sentences: Vec<RankedSentence>,
    ) -> Self {
        Self {
            summary,
            entities,
            sentiment,
            raw_content,
            key_sentences,
        }
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Entities by count descending.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn sentiment(&self) -> Sentiment {
        self.sentiment
    }

    pub fn raw_content(&self) -> &Rmc {
        &self.raw_content
    }

    /// Most salient sentences, highest first.
    pub fn key_sentences(&self) -> &[RankedSentence] {
        &self.key_sentences
    }
}

/// External response shape: the full result or a single error message.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DigestResponse {
    Success(PipelineResult),
    Failure { error: String },
}

impl DigestResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The error message, if this is a failure.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure { error } => Some(error),
        }
    }

    pub fn result(&self) -> Option<&PipelineResult> {
        match self {
            Self::Success(result) => Some(result),
            Self::Failure { .. } => None,
        }
    }
}

impl From<crate::error::Result<PipelineResult>> for DigestResponse {
    fn from(result: crate::error::Result<PipelineResult>) -> Self {
        match result {
            Ok(result) => Self::Success(result),
            Err(e) => e.into(),
        }
    }
}

impl From<DigestError> for DigestResponse {
    fn from(error: DigestError) -> Self {
        Self::Failure {
            error: error.to_string(),
        }
    }
}
