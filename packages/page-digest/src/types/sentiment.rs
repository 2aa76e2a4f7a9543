//! Sentiment taxonomy and raw-label mapping.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Document-level sentiment.
///
/// `Unknown` means the classifier answered with a label the [`LabelMap`] does
/// not cover. It is never a stand-in for "neutral".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
    Unknown,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
            Self::Positive => "Positive",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified window of tokens. Discarded after the vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentimentWindow {
    /// Bracketed input ids sent to the classifier
    pub tokens: Vec<u32>,

    /// Raw label returned by the classifier
    pub label: String,
}

/// Explicit lookup from raw classifier labels to [`Sentiment`].
///
/// Matching is exact. Anything not in the table maps to
/// [`Sentiment::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMap {
    entries: IndexMap<String, Sentiment>,
}

impl LabelMap {
    /// Create an empty map (every label maps to `Unknown`).
    pub fn empty() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Add a mapping.
    pub fn with(mut self, raw: impl Into<String>, sentiment: Sentiment) -> Self {
        self.entries.insert(raw.into(), sentiment);
        self
    }

    /// Look up a raw label.
    pub fn map(&self, raw: &str) -> Sentiment {
        self.entries.get(raw).copied().unwrap_or(Sentiment::Unknown)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LabelMap {
    /// Index labels of three-class sentiment heads plus their named forms.
    fn default() -> Self {
        Self::empty()
            .with("LABEL_0", Sentiment::Negative)
            .with("LABEL_1", Sentiment::Neutral)
            .with("LABEL_2", Sentiment::Positive)
            .with("negative", Sentiment::Negative)
            .with("neutral", Sentiment::Neutral)
            .with("positive", Sentiment::Positive)
            .with("NEGATIVE", Sentiment::Negative)
            .with("NEUTRAL", Sentiment::Neutral)
            .with("POSITIVE", Sentiment::Positive)
    }
}
