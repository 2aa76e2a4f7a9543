//! Configuration types for the digest pipeline.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use super::sentiment::LabelMap;
use crate::error::{DigestError, Result};

/// Configuration for the whole pipeline.
///
/// With the defaults, a document must tokenize to at least
/// `sentiment.window_size` (510) tokens, or the request fails with
/// [`DigestError::NoValidWindows`]. See [`SentimentConfig::window_size`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Target summary length when the request does not set one.
    ///
    /// Default: 500.
    pub summary_length: usize,

    /// Entity limit when the request does not set one.
    ///
    /// Default: 15.
    pub entity_limit: usize,

    /// Replace a failed or timed-out summary with the top salient sentences.
    ///
    /// Default: false (a summarizer failure fails the request).
    pub summary_fallback: bool,

    /// Wall-clock budget for the whole fan-out, in milliseconds.
    pub pipeline_timeout_ms: Option<u64>,

    pub salience: SalienceConfig,
    pub summarizer: SummarizerConfig,
    pub sentiment: SentimentConfig,
    pub pool: PoolConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            summary_length: 500,
            entity_limit: 15,
            summary_fallback: false,
            pipeline_timeout_ms: None,
            salience: SalienceConfig::default(),
            summarizer: SummarizerConfig::default(),
            sentiment: SentimentConfig::default(),
            pool: PoolConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from `DIGEST_*` environment variables.
    ///
    /// A `.env` file is loaded first if present. Unset variables keep their
    /// defaults; unparseable ones are an error.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = parse_var(&lookup, "DIGEST_SUMMARY_LENGTH")? {
            config.summary_length = v;
        }
        if let Some(v) = parse_var(&lookup, "DIGEST_ENTITY_LIMIT")? {
            config.entity_limit = v;
        }
        if let Some(v) = parse_var(&lookup, "DIGEST_SUMMARY_FALLBACK")? {
            config.summary_fallback = v;
        }
        if let Some(v) = parse_var(&lookup, "DIGEST_PIPELINE_TIMEOUT_MS")? {
            config.pipeline_timeout_ms = Some(v);
        }
        if let Some(v) = parse_var(&lookup, "DIGEST_TOP_SENTENCES")? {
            config.salience.top_n = v;
        }
        if let Some(v) = lookup("DIGEST_SUMMARY_PREFIX") {
            config.summarizer.prefix = v;
        }
        if let Some(v) = parse_var(&lookup, "DIGEST_SUMMARY_MAX_INPUT_TOKENS")? {
            config.summarizer.max_input_tokens = v;
        }
        if let Some(v) = parse_var(&lookup, "DIGEST_SUMMARY_TIMEOUT_MS")? {
            config.summarizer.timeout_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "DIGEST_SENTIMENT_WINDOW")? {
            config.sentiment.window_size = v;
        }
        if let Some(v) = parse_var(&lookup, "DIGEST_SENTIMENT_STRIDE")? {
            config.sentiment.stride = v;
        }
        if let Some(v) = parse_var(&lookup, "DIGEST_WINDOW_TIMEOUT_MS")? {
            config.sentiment.window_timeout_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "DIGEST_POOL_CAPACITY")? {
            config.pool.capacity = v;
        }
        if let Some(v) = parse_var(&lookup, "DIGEST_POOL_POLICY")? {
            config.pool.policy = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        self.sentiment.validate()?;
        if self.pool.capacity == 0 {
            return Err(DigestError::Config("pool capacity must be > 0".into()));
        }
        if self.salience.top_n == 0 {
            return Err(DigestError::Config("salience top_n must be > 0".into()));
        }
        if self.summarizer.max_input_tokens == 0 {
            return Err(DigestError::Config(
                "summarizer max_input_tokens must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Set the default summary length.
    pub fn with_summary_length(mut self, length: usize) -> Self {
        self.summary_length = length;
        self
    }

    /// Set the default entity limit.
    pub fn with_entity_limit(mut self, limit: usize) -> Self {
        self.entity_limit = limit;
        self
    }

    /// Enable or disable the salience-based summary fallback.
    pub fn with_summary_fallback(mut self, enabled: bool) -> Self {
        self.summary_fallback = enabled;
        self
    }

    /// Set a budget for the whole fan-out.
    pub fn with_pipeline_timeout(mut self, budget: Duration) -> Self {
        self.pipeline_timeout_ms = Some(budget.as_millis() as u64);
        self
    }

    pub fn with_salience(mut self, salience: SalienceConfig) -> Self {
        self.salience = salience;
        self
    }

    pub fn with_summarizer(mut self, summarizer: SummarizerConfig) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_sentiment(mut self, sentiment: SentimentConfig) -> Self {
        self.sentiment = sentiment;
        self
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn pipeline_timeout(&self) -> Option<Duration> {
        self.pipeline_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| DigestError::Config(format!("{key}={raw:?}: {e}"))),
    }
}

/// Sentence salience ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalienceConfig {
    /// Sentences to return. Default: 5.
    pub top_n: usize,
}

impl Default for SalienceConfig {
    fn default() -> Self {
        Self { top_n: 5 }
    }
}

/// Abstractive summarization decode settings.
///
/// Decoding is deterministic: beam search only, no sampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Instruction prepended to the document
    pub prefix: String,

    /// Input token budget; the model's own limit applies if smaller
    pub max_input_tokens: usize,

    /// Minimum decode length, clamped to the target length
    pub min_length: usize,

    pub num_beams: usize,

    /// Values above 1.0 favour longer outputs
    pub length_penalty: f32,

    pub early_stopping: bool,

    /// Budget for one generate call, in milliseconds
    pub timeout_ms: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            prefix: "summarize: ".to_string(),
            max_input_tokens: 512,
            min_length: 40,
            num_beams: 4,
            length_penalty: 2.0,
            early_stopping: true,
            timeout_ms: 60_000,
        }
    }
}

impl SummarizerConfig {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_max_input_tokens(mut self, tokens: usize) -> Self {
        self.max_input_tokens = tokens;
        self
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    pub fn with_timeout(mut self, budget: Duration) -> Self {
        self.timeout_ms = budget.as_millis() as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Sliding-window sentiment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    /// Tokens per window before the two boundary markers. Default: 510.
    ///
    /// Also the minimum document length: windows are exact-length and never
    /// padded, so a shorter document has no window and its sentiment is
    /// undetermined ([`DigestError::NoValidWindows`]).
    pub window_size: usize,

    /// Offset between window starts; must be below `window_size`. Default: 256.
    pub stride: usize,

    /// Windows classified concurrently. Results keep window order.
    pub window_concurrency: usize,

    /// Budget for one window classification, in milliseconds
    pub window_timeout_ms: u64,

    /// Raw label → sentiment lookup
    #[serde(default)]
    pub labels: LabelMap,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            window_size: 510,
            stride: 256,
            window_concurrency: 4,
            window_timeout_ms: 10_000,
            labels: LabelMap::default(),
        }
    }
}

impl SentimentConfig {
    /// Set window size and stride together.
    pub fn with_window(mut self, window_size: usize, stride: usize) -> Self {
        self.window_size = window_size;
        self.stride = stride;
        self
    }

    pub fn with_window_concurrency(mut self, concurrency: usize) -> Self {
        self.window_concurrency = concurrency;
        self
    }

    pub fn with_window_timeout(mut self, budget: Duration) -> Self {
        self.window_timeout_ms = budget.as_millis() as u64;
        self
    }

    pub fn with_labels(mut self, labels: LabelMap) -> Self {
        self.labels = labels;
        self
    }

    pub fn window_timeout(&self) -> Duration {
        Duration::from_millis(self.window_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(DigestError::Config("sentiment window must be > 0".into()));
        }
        if self.stride == 0 || self.stride >= self.window_size {
            return Err(DigestError::Config(format!(
                "sentiment stride must satisfy 0 < stride < window ({} vs {})",
                self.stride, self.window_size
            )));
        }
        if self.window_concurrency == 0 {
            return Err(DigestError::Config(
                "sentiment window_concurrency must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// What to do with a document when the inference pool is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Fail immediately with `Overloaded`
    Reject,
    /// Wait for a slot
    Queue,
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "queue" => Ok(Self::Queue),
            other => Err(format!("unknown overflow policy '{other}'")),
        }
    }
}

/// Bounded inference pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Documents allowed in the model stages at once
    pub capacity: usize,

    pub policy: OverflowPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 4,
            policy: OverflowPolicy::Queue,
        }
    }
}

impl PoolConfig {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self { capacity, policy }
    }
}
