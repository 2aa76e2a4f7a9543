//! Core trait abstractions for the digest pipeline.
//!
//! These traits describe the collaborators the pipeline composes but does not
//! implement: retrieval, linguistic analysis, word vectors, tokenization, and
//! the generative and classification models.

pub mod fetcher;
pub mod language;
pub mod models;
pub mod tokenizer;
