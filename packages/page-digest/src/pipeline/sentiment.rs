//! Sliding-window sentiment: classify overlapping token windows, then vote.
//!
//! Windows start at `0, S, 2S, …` while `offset + W ≤ total`. Each window is
//! decoded, re-encoded, truncated to `W`, and bracketed with the begin/end
//! markers; a window that is not exactly `W + 2` ids afterwards is discarded
//! rather than padded. A document shorter than one window therefore has no
//! valid windows and its sentiment is undetermined.

use futures::{stream, StreamExt, TryStreamExt};
use indexmap::IndexMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{DigestError, Result};
use crate::traits::models::SequenceClassifier;
use crate::types::config::SentimentConfig;
use crate::types::document::Rmc;
use crate::types::sentiment::{LabelMap, Sentiment, SentimentWindow};

/// Document sentiment by majority vote over window classifications.
#[derive(Clone)]
pub struct SentimentAggregator {
    classifier: Arc<dyn SequenceClassifier>,
    config: SentimentConfig,
}

impl SentimentAggregator {
    pub fn new(classifier: Arc<dyn SequenceClassifier>, config: SentimentConfig) -> Self {
        Self { classifier, config }
    }

    /// Tokenize `text` and build the bracketed windows that pass the
    /// exact-length check.
    pub fn windows(&self, text: &str) -> Result<Vec<Vec<u32>>> {
        let tokenizer = self.classifier.tokenizer();
        let ids = tokenizer.encode(text)?;
        let size = self.config.window_size;
        let expected = size + 2;

        let mut windows = Vec::new();
        let mut discarded = 0usize;
        for offset in window_offsets(ids.len(), size, self.config.stride) {
            let chunk_text = tokenizer.decode(&ids[offset..offset + size])?;
            let mut body = tokenizer.encode(&chunk_text)?;
            body.truncate(size);

            let mut bracketed = Vec::with_capacity(expected);
            bracketed.push(tokenizer.begin_id());
            bracketed.extend(body);
            bracketed.push(tokenizer.end_id());

            if bracketed.len() != expected {
                discarded += 1;
                debug!(
                    offset,
                    len = bracketed.len(),
                    expected,
                    "discarding sentiment window"
                );
                continue;
            }
            windows.push(bracketed);
        }

        if discarded > 0 {
            warn!(
                kept = windows.len(),
                discarded, "sentiment windows failed the length check"
            );
        }
        debug!(
            tokens = ids.len(),
            windows = windows.len(),
            window_size = size,
            stride = self.config.stride,
            "built sentiment windows"
        );
        Ok(windows)
    }

    /// Classify every valid window of `rmc`, in window order.
    ///
    /// Up to `window_concurrency` classifications are in flight at once. Each
    /// runs under the per-window budget and stops early on cancellation.
    pub async fn classify_windows(
        &self,
        rmc: &Rmc,
        cancel: &CancellationToken,
    ) -> Result<Vec<SentimentWindow>> {
        let windows = self.windows(rmc)?;
        if windows.is_empty() {
            return Err(DigestError::NoValidWindows);
        }

        let classifier = &self.classifier;
        let budget = self.config.window_timeout();

        stream::iter(windows)
            .map(move |tokens| async move {
                let label = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(DigestError::Cancelled),
                    result = tokio::time::timeout(budget, classifier.classify(&tokens)) => {
                        result.map_err(|_| DigestError::Timeout {
                            stage: "sentiment window",
                            budget,
                        })??
                    }
                };
                Ok(SentimentWindow { tokens, label })
            })
            .buffered(self.config.window_concurrency.max(1))
            .try_collect()
            .await
    }

    /// Document sentiment for `rmc`.
    pub async fn classify(&self, rmc: &Rmc, cancel: &CancellationToken) -> Result<Sentiment> {
        let windows = self.classify_windows(rmc, cancel).await?;
        aggregate(&windows, &self.config.labels)
    }
}

/// Window start offsets: `0, stride, 2·stride, …` while the window fits.
pub fn window_offsets(total: usize, window: usize, stride: usize) -> impl Iterator<Item = usize> {
    (0..)
        .step_by(stride.max(1))
        .take_while(move |offset| offset + window <= total)
}

/// The most frequent label; ties go to the label seen first.
pub fn majority_label<'a, I>(labels: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (label, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label)
}

/// Vote over classified windows and map the winner to the public taxonomy.
pub fn aggregate(windows: &[SentimentWindow], labels: &LabelMap) -> Result<Sentiment> {
    let winner = majority_label(windows.iter().map(|w| w.label.as_str()))
        .ok_or(DigestError::NoValidWindows)?;

    let sentiment = labels.map(winner);
    if sentiment == Sentiment::Unknown {
        warn!(label = %winner, "classifier label not in label map");
    }
    debug!(windows = windows.len(), label = %winner, %sentiment, "aggregated sentiment");
    Ok(sentiment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::sanitize;
    use crate::testing::MockClassifier;
    use crate::traits::tokenizer::Tokenizer;
    use async_trait::async_trait;
    use std::time::Duration;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("t{i}")).collect::<Vec<_>>().join(" ")
    }

    fn config(window: usize, stride: usize) -> SentimentConfig {
        SentimentConfig::default()
            .with_window(window, stride)
            .with_window_concurrency(1)
    }

    fn window(label: &str) -> SentimentWindow {
        SentimentWindow {
            tokens: vec![],
            label: label.to_string(),
        }
    }

    #[test]
    fn test_offsets_stop_when_window_no_longer_fits() {
        assert_eq!(window_offsets(20, 8, 4).collect::<Vec<_>>(), vec![0, 4, 8, 12]);
        assert_eq!(window_offsets(8, 8, 4).collect::<Vec<_>>(), vec![0]);
        assert!(window_offsets(7, 8, 4).next().is_none());
        assert_eq!(window_offsets(1024, 510, 256).collect::<Vec<_>>(), vec![0, 256, 512]);
    }

    #[test]
    fn test_short_document_has_no_windows() {
        let aggregator = SentimentAggregator::new(Arc::new(MockClassifier::new()), config(8, 4));
        assert!(aggregator.windows(&words(7)).unwrap().is_empty());
    }

    #[test]
    fn test_exact_length_document_has_one_window() {
        let classifier = MockClassifier::new();
        let aggregator = SentimentAggregator::new(Arc::new(classifier), config(8, 4));

        let windows = aggregator.windows(&words(8)).unwrap();

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].len(), 10);
    }

    #[test]
    fn test_windows_are_bracketed() {
        let classifier = Arc::new(MockClassifier::new());
        let aggregator = SentimentAggregator::new(classifier.clone(), config(4, 2));

        let windows = aggregator.windows(&words(9)).unwrap();
        let tokenizer = classifier.tokenizer();

        assert_eq!(windows.len(), 3);
        for w in &windows {
            assert_eq!(w.len(), 6);
            assert_eq!(w[0], tokenizer.begin_id());
            assert_eq!(w[5], tokenizer.end_id());
        }
        assert_eq!(tokenizer.decode(&windows[1]).unwrap(), "t2 t3 t4 t5");
    }

    /// Tokenizer whose "gap" token disappears on decode.
    struct LossyTokenizer;

    impl Tokenizer for LossyTokenizer {
        fn encode(&self, text: &str) -> Result<Vec<u32>> {
            Ok(text
                .split_whitespace()
                .map(|w| match w {
                    "gap" => 999,
                    other => other.trim_start_matches('t').parse::<u32>().unwrap_or(0) + 10,
                })
                .collect())
        }

        fn decode(&self, ids: &[u32]) -> Result<String> {
            Ok(ids
                .iter()
                .filter(|&&id| id >= 10 && id != 999)
                .map(|id| format!("t{}", id - 10))
                .collect::<Vec<_>>()
                .join(" "))
        }

        fn begin_id(&self) -> u32 {
            1
        }

        fn end_id(&self) -> u32 {
            2
        }
    }

    struct LossyClassifier(LossyTokenizer);

    #[async_trait]
    impl SequenceClassifier for LossyClassifier {
        fn tokenizer(&self) -> &dyn Tokenizer {
            &self.0
        }

        async fn classify(&self, _input_ids: &[u32]) -> Result<String> {
            Ok("LABEL_1".to_string())
        }
    }

    #[tokio::test]
    async fn test_windows_that_shrink_are_discarded_not_padded() {
        let aggregator =
            SentimentAggregator::new(Arc::new(LossyClassifier(LossyTokenizer)), config(4, 2));

        // offsets 0, 2, 4: windows starting at 0 and 2 contain "gap"
        let windows = aggregator.windows("t0 t1 t2 gap t4 t5 t6 t7").unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0], vec![1, 14, 15, 16, 17, 2]);

        // one window of four, and it contains the gap
        let rmc = sanitize("t0 gap t2 t3").unwrap();
        let err = aggregator
            .classify(&rmc, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DigestError::NoValidWindows));
    }

    #[tokio::test]
    async fn test_short_document_is_undetermined_not_neutral() {
        let aggregator = SentimentAggregator::new(Arc::new(MockClassifier::new()), config(8, 4));
        let rmc = sanitize(&words(5)).unwrap();

        let err = aggregator
            .classify(&rmc, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DigestError::NoValidWindows));
    }

    #[test]
    fn test_majority_label_prefers_first_seen_on_tie() {
        assert_eq!(majority_label(["a", "b", "b", "a"]), Some("a"));
        assert_eq!(majority_label(["b", "a", "a", "b"]), Some("b"));
        assert_eq!(majority_label(["c", "a", "b", "b"]), Some("b"));
        assert_eq!(majority_label(Vec::<&str>::new()), None);
    }

    #[test]
    fn test_majority_label_deterministic() {
        let labels = ["LABEL_0", "LABEL_2", "LABEL_2", "LABEL_0", "LABEL_1"];
        let first = majority_label(labels);
        for _ in 0..50 {
            assert_eq!(majority_label(labels), first);
        }
    }

    #[test]
    fn test_aggregate_maps_labels() {
        let labels = LabelMap::default();
        let windows = vec![window("LABEL_2"), window("LABEL_0"), window("LABEL_2")];
        assert_eq!(aggregate(&windows, &labels).unwrap(), Sentiment::Positive);

        let unmapped = vec![window("LABEL_9")];
        assert_eq!(aggregate(&unmapped, &labels).unwrap(), Sentiment::Unknown);

        assert!(matches!(
            aggregate(&[], &labels),
            Err(DigestError::NoValidWindows)
        ));
    }

    #[tokio::test]
    async fn test_classify_votes_across_windows() {
        let classifier = Arc::new(MockClassifier::new().with_labels(["LABEL_0", "LABEL_2", "LABEL_2"]));
        let aggregator = SentimentAggregator::new(classifier.clone(), config(4, 2));
        let rmc = sanitize(&words(8)).unwrap();

        let windows = aggregator
            .classify_windows(&rmc, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].label, "LABEL_0");
        assert_eq!(classifier.call_count(), 3);

        let sentiment = aggregate(&windows, &LabelMap::default()).unwrap();
        assert_eq!(sentiment, Sentiment::Positive);
    }

    #[tokio::test]
    async fn test_concurrent_windows_keep_order() {
        let classifier = Arc::new(MockClassifier::new());
        let aggregator = SentimentAggregator::new(
            classifier,
            config(4, 2).with_window_concurrency(8),
        );
        let rmc = sanitize("good great love fine fine bad awful hate terrible").unwrap();

        let windows = aggregator
            .classify_windows(&rmc, &CancellationToken::new())
            .await
            .unwrap();
        let labels: Vec<_> = windows.iter().map(|w| w.label.as_str()).collect();

        assert_eq!(labels, vec!["LABEL_2", "LABEL_1", "LABEL_0"]);
    }

    #[tokio::test]
    async fn test_classifier_failure_propagates() {
        let aggregator =
            SentimentAggregator::new(Arc::new(MockClassifier::new().failing()), config(4, 2));
        let rmc = sanitize(&words(8)).unwrap();

        let err = aggregator
            .classify(&rmc, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DigestError::ModelInference(_)));
    }

    #[tokio::test]
    async fn test_slow_window_times_out() {
        let classifier = MockClassifier::new().with_delay(Duration::from_secs(5));
        let aggregator = SentimentAggregator::new(
            Arc::new(classifier),
            config(4, 2).with_window_timeout(Duration::from_millis(20)),
        );
        let rmc = sanitize(&words(4)).unwrap();

        let err = aggregator
            .classify(&rmc, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DigestError::Timeout {
                stage: "sentiment window",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_classification() {
        let classifier = Arc::new(MockClassifier::new());
        let aggregator = SentimentAggregator::new(classifier.clone(), config(4, 2));
        let rmc = sanitize(&words(8)).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = aggregator.classify(&rmc, &cancel).await.unwrap_err();

        assert!(matches!(err, DigestError::Cancelled));
    }
}
