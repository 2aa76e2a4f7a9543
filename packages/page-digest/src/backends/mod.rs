//! Concrete model backends.
//!
//! - [`rules`] - regex sentence splitting and entity tagging
//! - [`vectors`] - GloVe-format word embeddings
//! - [`vocab`] - WordPiece tokenizer over a BERT vocabulary file
//! - [`remote`] - generator and classifier behind an HTTP inference endpoint

pub mod remote;
pub mod rules;
pub mod vectors;
pub mod vocab;

pub use remote::{RemoteClassifier, RemoteGenerator};
pub use rules::RuleBasedLanguageModel;
pub use vectors::EmbeddingTable;
pub use vocab::VocabTokenizer;
