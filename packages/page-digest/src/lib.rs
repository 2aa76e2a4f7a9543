//! Web Document Digest Library
//!
//! Turns one web document (raw HTML or plain text) into a bounded digest:
//! ranked named entities, the most salient sentences, an abstractive summary,
//! and a document-level sentiment.
//!
//! # Design Philosophy
//!
//! - Sanitize once; every stage reads the same immutable text
//! - Stages run concurrently and fail the whole request, never half of it
//! - Models are traits, built once per process and shared read-only
//! - Long inputs are bounded explicitly (token budgets, sentiment windows)
//!
//! # Usage
//!
//! ```rust,ignore
//! use page_digest::{DigestRequest, Pipeline, PipelineConfig};
//! use page_digest::testing::TestScenario;
//!
//! let pipeline = Pipeline::new(TestScenario::new().build(), PipelineConfig::from_env()?)?;
//!
//! let response = pipeline
//!     .run(&DigestRequest::new(html).with_summary_length(100).with_entity_limit(5))
//!     .await;
//! println!("{}", serde_json::to_string_pretty(&response)?);
//! ```
//!
//! # Modules
//!
//! - [`sanitize`] - HTML to real meaningful content
//! - [`pipeline`] - The four stages and the orchestrator
//! - [`traits`] - Model and fetcher abstractions
//! - [`types`] - Requests, results, configuration
//! - [`backends`] - Rule-based, file-backed and HTTP model implementations
//! - [`fetchers`] - HTTP document retrieval
//! - [`security`] - API key handling
//! - [`testing`] - Mock implementations for testing

pub mod backends;
pub mod error;
pub mod fetchers;
pub mod pipeline;
pub mod sanitize;
pub mod security;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{DigestError, FetchError, Result};
pub use pipeline::{Models, Pipeline};
pub use sanitize::{sanitize, sanitize_document};
pub use traits::{
    fetcher::Fetcher,
    language::{AnalyzedText, LanguageModel, Sentence},
    models::{GenerationParams, Generator, SequenceClassifier, WordEmbeddings},
    tokenizer::Tokenizer,
};
pub use types::{
    config::{
        OverflowPolicy, PipelineConfig, PoolConfig, SalienceConfig, SentimentConfig,
        SummarizerConfig,
    },
    document::{RawDocument, Rmc},
    entity::{Entity, EntitySpan},
    result::{DigestRequest, DigestResponse, PipelineResult, RankedSentence},
    sentiment::{LabelMap, Sentiment},
};

// Re-export backends
pub use backends::{
    EmbeddingTable, RemoteClassifier, RemoteGenerator, RuleBasedLanguageModel, VocabTokenizer,
};
pub use fetchers::HttpFetcher;
pub use security::{ApiKey, ModelEndpoint};

// Re-export testing utilities
pub use testing::{
    HashedEmbeddings, MockClassifier, MockFetcher, MockGenerator, MockLanguageModel,
    MockTokenizer, TestScenario,
};
