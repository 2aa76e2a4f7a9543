//! Windowed summarizer: one bounded generate call over the document prefix.
//!
//! Input beyond the model's token budget is dropped from the end, so long
//! documents are summarized from their beginning only.

use std::sync::Arc;
use tracing::debug;

use crate::error::{DigestError, Result};
use crate::traits::models::{GenerationParams, Generator};
use crate::types::config::SummarizerConfig;
use crate::types::document::Rmc;

/// Produces an abstractive summary through a [`Generator`].
#[derive(Clone)]
pub struct Summarizer {
    generator: Arc<dyn Generator>,
    config: SummarizerConfig,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn Generator>, config: SummarizerConfig) -> Self {
        Self { generator, config }
    }

    /// Effective input budget: the smaller of the configured and model limits.
    pub fn input_budget(&self) -> usize {
        self.config
            .max_input_tokens
            .min(self.generator.max_input_tokens())
    }

    /// Encode prefix + document and truncate to the input budget.
    pub fn prepare_input(&self, rmc: &str) -> Result<Vec<u32>> {
        let text = format!("{}{}", self.config.prefix, rmc);
        let mut ids = self.generator.tokenizer().encode(&text)?;

        let budget = self.input_budget();
        if ids.len() > budget {
            debug!(
                tokens = ids.len(),
                budget,
                dropped = ids.len() - budget,
                "truncating summarizer input"
            );
            ids.truncate(budget);
        }
        Ok(ids)
    }

    /// Decode settings for a target length. The minimum never exceeds it.
    pub fn params(&self, target_length: usize) -> GenerationParams {
        GenerationParams {
            max_length: target_length,
            min_length: self.config.min_length.min(target_length),
            num_beams: self.config.num_beams,
            length_penalty: self.config.length_penalty,
            early_stopping: self.config.early_stopping,
        }
    }

    /// Summarize `rmc` with a decode budget of `target_length` tokens.
    pub async fn summarize(&self, rmc: &Rmc, target_length: usize) -> Result<String> {
        if target_length == 0 {
            return Err(DigestError::Config("summary length must be > 0".into()));
        }

        let input = self.prepare_input(rmc)?;
        let params = self.params(target_length);
        let budget = self.config.timeout();

        let output = tokio::time::timeout(budget, self.generator.generate(&input, &params))
            .await
            .map_err(|_| DigestError::Timeout {
                stage: "summarizer",
                budget,
            })??;

        let summary = output.trim();
        if summary.is_empty() {
            return Err(DigestError::inference("generator returned an empty summary"));
        }

        debug!(
            input_tokens = input.len(),
            summary_len = summary.len(),
            "generated summary"
        );
        Ok(summary.to_string())
    }
}
