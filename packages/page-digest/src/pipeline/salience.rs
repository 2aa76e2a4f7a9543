//! Sentence salience: rank sentences by the magnitude of their mean word
//! vector.
//!
//! This is a deterministic signal that needs no generative model, so it is
//! still available when the summarizer fails.

use std::sync::Arc;
use tracing::debug;

use crate::error::{DigestError, Result};
use crate::traits::language::{LanguageModel, Sentence};
use crate::traits::models::WordEmbeddings;
use crate::types::document::Rmc;
use crate::types::result::RankedSentence;

/// Ranks sentences by embedding magnitude.
#[derive(Clone)]
pub struct SentenceRanker {
    model: Arc<dyn LanguageModel>,
    embeddings: Arc<dyn WordEmbeddings>,
}

impl SentenceRanker {
    pub fn new(model: Arc<dyn LanguageModel>, embeddings: Arc<dyn WordEmbeddings>) -> Self {
        Self { model, embeddings }
    }

    /// Return the `top_n` most salient sentences of `rmc`, highest first.
    pub async fn rank(&self, rmc: &Rmc, top_n: usize) -> Result<Vec<RankedSentence>> {
        let analyzed = self.model.analyze(rmc).await?;
        let ranked = rank_sentences(&analyzed.sentences, self.embeddings.as_ref(), top_n)?;
        debug!(
            sentences = analyzed.sentences.len(),
            returned = ranked.len(),
            "ranked sentences"
        );
        Ok(ranked)
    }
}

/// Score and sort sentences; fails with [`DigestError::NoSentences`] when no
/// sentence has a token.
pub fn rank_sentences(
    sentences: &[Sentence],
    embeddings: &dyn WordEmbeddings,
    top_n: usize,
) -> Result<Vec<RankedSentence>> {
    let mut scored: Vec<RankedSentence> = sentences
        .iter()
        .filter_map(|sentence| {
            sentence_salience(&sentence.tokens, embeddings).map(|salience| RankedSentence {
                text: sentence.text.clone(),
                salience,
            })
        })
        .collect();

    if scored.is_empty() {
        return Err(DigestError::NoSentences);
    }

    // stable: equal scores stay in document order
    scored.sort_by(|a, b| b.salience.total_cmp(&a.salience));
    scored.truncate(top_n);
    Ok(scored)
}

/// Euclidean norm of the mean token vector, or `None` for a sentence without
/// tokens.
///
/// Out-of-vocabulary tokens contribute a zero vector but still count toward
/// the mean.
pub fn sentence_salience(tokens: &[String], embeddings: &dyn WordEmbeddings) -> Option<f32> {
    if tokens.is_empty() {
        return None;
    }

    let mut sum = vec![0.0f32; embeddings.dimension()];
    for token in tokens {
        if let Some(vector) = embeddings.vector(token) {
            for (acc, x) in sum.iter_mut().zip(vector.iter()) {
                *acc += x;
            }
        }
    }

    let n = tokens.len() as f32;
    Some(sum.iter().map(|acc| (acc / n).powi(2)).sum::<f32>().sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{HashedEmbeddings, MockLanguageModel};
    use std::borrow::Cow;
    use std::collections::HashMap;

    struct Table {
        vectors: HashMap<String, Vec<f32>>,
    }

    impl Table {
        fn new(entries: &[(&str, [f32; 2])]) -> Self {
            Self {
                vectors: entries
                    .iter()
                    .map(|(word, v)| (word.to_string(), v.to_vec()))
                    .collect(),
            }
        }
    }

    impl WordEmbeddings for Table {
        fn dimension(&self) -> usize {
            2
        }

        fn vector(&self, token: &str) -> Option<Cow<'_, [f32]>> {
            self.vectors.get(token).map(|v| Cow::Borrowed(v.as_slice()))
        }
    }

    fn sentence(text: &str) -> Sentence {
        Sentence::new(text, text.split_whitespace().map(str::to_string).collect())
    }

    #[test]
    fn test_salience_is_norm_of_mean() {
        let table = Table::new(&[("a", [3.0, 0.0]), ("b", [0.0, 4.0])]);
        let tokens = vec!["a".to_string(), "b".to_string()];

        // mean = (1.5, 2.0) → norm 2.5
        let score = sentence_salience(&tokens, &table).unwrap();
        assert!((score - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_oov_tokens_dilute_the_mean() {
        let table = Table::new(&[("a", [4.0, 0.0])]);
        let alone = sentence_salience(&["a".to_string()], &table).unwrap();
        let diluted = sentence_salience(&["a".to_string(), "zzz".to_string()], &table).unwrap();

        assert!((alone - 4.0).abs() < 1e-6);
        assert!((diluted - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_sorted_descending_ties_in_document_order() {
        let table = Table::new(&[("big", [10.0, 0.0]), ("mid", [0.0, 5.0]), ("same", [0.0, 5.0])]);
        let sentences = vec![sentence("mid"), sentence("big"), sentence("same")];

        let ranked = rank_sentences(&sentences, &table, 5).unwrap();
        let texts: Vec<_> = ranked.iter().map(|s| s.text.as_str()).collect();

        assert_eq!(texts, vec!["big", "mid", "same"]);
    }

    #[test]
    fn test_zero_token_sentences_excluded() {
        let table = Table::new(&[("a", [1.0, 1.0])]);
        let sentences = vec![Sentence::new("...", vec![]), sentence("a")];

        let ranked = rank_sentences(&sentences, &table, 5).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].text, "a");
    }

    #[test]
    fn test_no_sentences_is_error() {
        let table = Table::new(&[]);
        assert!(matches!(
            rank_sentences(&[], &table, 5),
            Err(DigestError::NoSentences)
        ));
        assert!(matches!(
            rank_sentences(&[Sentence::new("", vec![])], &table, 5),
            Err(DigestError::NoSentences)
        ));
    }

    #[test]
    fn test_top_n_bounds_output() {
        let table = Table::new(&[]);
        let sentences: Vec<_> = (0..8).map(|i| sentence(&format!("s{i}"))).collect();

        assert_eq!(rank_sentences(&sentences, &table, 3).unwrap().len(), 3);
        assert_eq!(rank_sentences(&sentences[..2], &table, 3).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rank_with_mock_model() {
        let ranker = SentenceRanker::new(
            Arc::new(MockLanguageModel::new()),
            Arc::new(HashedEmbeddings::new(16)),
        );
        let rmc = crate::sanitize::sanitize("One short line. Another line here! A third?").unwrap();

        let ranked = ranker.rank(&rmc, 2).await.unwrap();

        assert_eq!(ranked.len(), 2);
        assert!(ranked[0].salience >= ranked[1].salience);
    }
}
