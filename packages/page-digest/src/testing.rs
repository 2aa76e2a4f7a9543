//! Testing utilities including mock implementations.
//!
//! These let applications exercise the digest pipeline without model files
//! or network calls. Every mock is deterministic for a given input.

use async_trait::async_trait;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::backends::rules::RuleBasedLanguageModel;
use crate::error::{DigestError, FetchError, FetchResult, Result};
use crate::pipeline::Models;
use crate::traits::{
    fetcher::Fetcher,
    language::{AnalyzedText, LanguageModel},
    models::{GenerationParams, Generator, SequenceClassifier, WordEmbeddings},
    tokenizer::Tokenizer,
};
use crate::types::document::RawDocument;

/// Id of the begin marker in [`MockTokenizer`].
pub const MOCK_BEGIN_ID: u32 = 1;

/// Id of the end marker in [`MockTokenizer`].
pub const MOCK_END_ID: u32 = 2;

/// First id handed to a word; everything below is special.
const FIRST_WORD_ID: u32 = 100;

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "love", "excellent", "happy", "wonderful", "best", "enjoyed",
];
const NEGATIVE_WORDS: &[&str] = &[
    "bad", "awful", "hate", "terrible", "sad", "worst", "poor", "broken",
];

/// A word-level tokenizer that assigns ids as it sees new words.
///
/// Decoding joins words with single spaces, so decode-then-encode is stable
/// for any whitespace-separated text.
#[derive(Default)]
pub struct MockTokenizer {
    vocab: RwLock<MockVocab>,
}

#[derive(Default)]
struct MockVocab {
    ids: HashMap<String, u32>,
    words: Vec<String>,
}

impl MockTokenizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tokenizer for MockTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let mut vocab = self.vocab.write().unwrap();
        let ids = text
            .split_whitespace()
            .map(|word| {
                if let Some(&id) = vocab.ids.get(word) {
                    return id;
                }
                let id = FIRST_WORD_ID + vocab.words.len() as u32;
                vocab.words.push(word.to_string());
                vocab.ids.insert(word.to_string(), id);
                id
            })
            .collect();
        Ok(ids)
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        let vocab = self.vocab.read().unwrap();
        let mut words = Vec::with_capacity(ids.len());
        for &id in ids {
            if id < FIRST_WORD_ID {
                continue;
            }
            let word = vocab
                .words
                .get((id - FIRST_WORD_ID) as usize)
                .ok_or_else(|| DigestError::inference(format!("unknown mock token {id}")))?;
            words.push(word.as_str());
        }
        Ok(words.join(" "))
    }

    fn begin_id(&self) -> u32 {
        MOCK_BEGIN_ID
    }

    fn end_id(&self) -> u32 {
        MOCK_END_ID
    }
}

/// A mock language model.
///
/// Falls back to [`RuleBasedLanguageModel`] for texts without a predefined
/// analysis.
#[derive(Default)]
pub struct MockLanguageModel {
    rules: RuleBasedLanguageModel,

    /// Predefined analyses by exact text
    analyses: RwLock<HashMap<String, AnalyzedText>>,

    fail: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `analyzed` whenever `text` is analyzed.
    pub fn with_analysis(self, text: impl Into<String>, analyzed: AnalyzedText) -> Self {
        self.analyses.write().unwrap().insert(text.into(), analyzed);
        self
    }

    /// Fail every call with a model inference error.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn analyze(&self, text: &str) -> Result<AnalyzedText> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(DigestError::inference("mock language model failure"));
        }

        let predefined = self.analyses.read().unwrap().get(text).cloned();
        Ok(predefined.unwrap_or_else(|| self.rules.analyze_text(text)))
    }
}

/// Word vectors derived from a SHA-256 of the lowercased token.
///
/// Every token is in vocabulary; words listed with [`Self::with_oov`] are not.
pub struct HashedEmbeddings {
    dimension: usize,
    oov: Vec<String>,
}

impl HashedEmbeddings {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            oov: Vec::new(),
        }
    }

    /// Treat these tokens as out of vocabulary.
    pub fn with_oov<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.oov.extend(words.into_iter().map(|w| w.into().to_lowercase()));
        self
    }

    fn hashed_vector(&self, token: &str) -> Vec<f32> {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        let hash = hasher.finalize();

        (0..self.dimension)
            .map(|i| {
                let byte = hash[i % hash.len()].rotate_left((i / hash.len()) as u32);
                (byte as f32 / 255.0) * 2.0 - 1.0
            })
            .collect()
    }
}

impl WordEmbeddings for HashedEmbeddings {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn vector(&self, token: &str) -> Option<Cow<'_, [f32]>> {
        let token = token.to_lowercase();
        if self.oov.contains(&token) {
            return None;
        }
        Some(Cow::Owned(self.hashed_vector(&token)))
    }
}

/// Record of a call made to the mock generator.
#[derive(Debug, Clone)]
pub struct MockGeneratorCall {
    /// Number of input ids received
    pub input_len: usize,
    pub params: GenerationParams,
}

/// A mock summarizer.
///
/// By default it echoes the first `max_length` words of its input with the
/// task prefix removed.
pub struct MockGenerator {
    tokenizer: MockTokenizer,
    max_input_tokens: usize,
    output: Option<String>,
    fail: bool,
    delay: Option<Duration>,
    calls: Arc<RwLock<Vec<MockGeneratorCall>>>,
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            tokenizer: MockTokenizer::new(),
            max_input_tokens: 1024,
            output: None,
            fail: false,
            delay: None,
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_max_input_tokens(mut self, max: usize) -> Self {
        self.max_input_tokens = max;
        self
    }

    /// Return this text from every call.
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockGeneratorCall> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    fn tokenizer(&self) -> &dyn Tokenizer {
        &self.tokenizer
    }

    fn max_input_tokens(&self) -> usize {
        self.max_input_tokens
    }

    async fn generate(&self, input_ids: &[u32], params: &GenerationParams) -> Result<String> {
        self.calls.write().unwrap().push(MockGeneratorCall {
            input_len: input_ids.len(),
            params: params.clone(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(DigestError::inference("mock generator failure"));
        }
        if let Some(output) = &self.output {
            return Ok(output.clone());
        }

        let input = self.tokenizer.decode(input_ids)?;
        Ok(input
            .split_whitespace()
            .skip_while(|word| word.ends_with(':'))
            .take(params.max_length)
            .collect::<Vec<_>>()
            .join(" "))
    }
}

/// A mock sentiment classifier.
///
/// Without scripted labels it scores the decoded window against a small
/// lexicon and answers `LABEL_0` (negative), `LABEL_1` (neutral) or
/// `LABEL_2` (positive), regardless of call order.
#[derive(Default)]
pub struct MockClassifier {
    tokenizer: MockTokenizer,

    /// Labels returned by call index, cycling
    script: Vec<String>,

    fixed: Option<String>,
    fail: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer with these labels in call order. Only meaningful when windows
    /// are classified one at a time.
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.script = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Answer every call with `label`.
    pub fn with_fixed_label(mut self, label: impl Into<String>) -> Self {
        self.fixed = Some(label.into());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lexicon_label(text: &str) -> &'static str {
        let mut score = 0i32;
        for word in text.split_whitespace() {
            let word = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if POSITIVE_WORDS.contains(&word.as_str()) {
                score += 1;
            } else if NEGATIVE_WORDS.contains(&word.as_str()) {
                score -= 1;
            }
        }
        match score.signum() {
            1 => "LABEL_2",
            -1 => "LABEL_0",
            _ => "LABEL_1",
        }
    }
}

#[async_trait]
impl SequenceClassifier for MockClassifier {
    fn tokenizer(&self) -> &dyn Tokenizer {
        &self.tokenizer
    }

    async fn classify(&self, input_ids: &[u32]) -> Result<String> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(DigestError::inference("mock classifier failure"));
        }
        if let Some(label) = &self.fixed {
            return Ok(label.clone());
        }
        if !self.script.is_empty() {
            return Ok(self.script[index % self.script.len()].clone());
        }

        let text = self.tokenizer.decode(input_ids)?;
        Ok(Self::lexicon_label(&text).to_string())
    }
}

/// A mock fetcher.
///
/// Returns predefined documents without making network requests.
#[derive(Default)]
pub struct MockFetcher {
    /// Predefined documents by URL
    documents: Arc<RwLock<HashMap<String, RawDocument>>>,

    /// URLs that should fail at the connection level
    fail_urls: Arc<RwLock<Vec<String>>>,

    /// Call tracking
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` as HTML at `url`.
    pub fn with_page(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        let url = url.into();
        let document = RawDocument::new(body)
            .with_url(url.clone())
            .with_content_type("text/html");
        self.documents.write().unwrap().insert(url, document);
        self
    }

    /// Mark a URL as failing.
    pub fn fail_url(self, url: impl Into<String>) -> Self {
        self.fail_urls.write().unwrap().push(url.into());
        self
    }

    /// URLs fetched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<RawDocument> {
        self.calls.write().unwrap().push(url.to_string());

        if self.fail_urls.read().unwrap().iter().any(|u| u == url) {
            return Err(FetchError::Http(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Mock connection refused",
            ))));
        }

        self.documents
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 404,
                url: url.to_string(),
            })
    }
}

/// Builder for a full set of mock models.
pub struct TestScenario {
    language: Arc<dyn LanguageModel>,
    embeddings: Arc<dyn WordEmbeddings>,
    generator: Arc<dyn Generator>,
    classifier: Arc<dyn SequenceClassifier>,
}

impl TestScenario {
    /// Default mocks: rule-based language, 32-dimensional hashed vectors,
    /// echoing generator, lexicon classifier.
    pub fn new() -> Self {
        Self {
            language: Arc::new(MockLanguageModel::new()),
            embeddings: Arc::new(HashedEmbeddings::new(32)),
            generator: Arc::new(MockGenerator::new()),
            classifier: Arc::new(MockClassifier::new()),
        }
    }

    pub fn with_language(mut self, language: Arc<dyn LanguageModel>) -> Self {
        self.language = language;
        self
    }

    pub fn with_embeddings(mut self, embeddings: Arc<dyn WordEmbeddings>) -> Self {
        self.embeddings = embeddings;
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn SequenceClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn build(self) -> Models {
        Models {
            language: self.language,
            embeddings: self.embeddings,
            generator: self.generator,
            classifier: self.classifier,
        }
    }
}

impl Default for TestScenario {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_tokenizer_round_trips_words() {
        let tokenizer = MockTokenizer::new();
        let ids = tokenizer.encode("the cat  sat on the mat").unwrap();

        assert_eq!(ids.len(), 6);
        assert_eq!(ids[0], ids[4]);
        assert_eq!(tokenizer.decode(&ids).unwrap(), "the cat sat on the mat");
    }

    #[test]
    fn test_mock_tokenizer_skips_markers() {
        let tokenizer = MockTokenizer::new();
        let mut ids = vec![MOCK_BEGIN_ID];
        ids.extend(tokenizer.encode("hello world").unwrap());
        ids.push(MOCK_END_ID);

        assert_eq!(tokenizer.decode(&ids).unwrap(), "hello world");
        assert!(tokenizer.decode(&[5000]).is_err());
    }

    #[test]
    fn test_hashed_embeddings_deterministic() {
        let embeddings = HashedEmbeddings::new(128);

        let a = embeddings.vector("hello").unwrap();
        let b = embeddings.vector("Hello").unwrap();
        let c = embeddings.vector("world").unwrap();

        assert_eq!(a.len(), 128);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_hashed_embeddings_oov() {
        let embeddings = HashedEmbeddings::new(8).with_oov(["Zyzzyva"]);
        assert!(embeddings.vector("zyzzyva").is_none());
        assert!(embeddings.vector("aardvark").is_some());
    }

    #[tokio::test]
    async fn test_mock_language_model_predefined_and_default() {
        let model = MockLanguageModel::new().with_analysis("fixed", AnalyzedText::default());

        assert!(model.analyze("fixed").await.unwrap().sentences.is_empty());
        let analyzed = model.analyze("Alice met Bob.").await.unwrap();
        assert_eq!(analyzed.sentences.len(), 1);
        assert_eq!(analyzed.entities.len(), 2);
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_generator_echoes_without_prefix() {
        let generator = MockGenerator::new();
        let ids = generator.tokenizer().encode("summarize: a b c d").unwrap();
        let params = GenerationParams {
            max_length: 2,
            min_length: 1,
            num_beams: 4,
            length_penalty: 2.0,
            early_stopping: true,
        };

        assert_eq!(generator.generate(&ids, &params).await.unwrap(), "a b");

        let calls = generator.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].input_len, 5);
    }

    #[tokio::test]
    async fn test_mock_classifier_lexicon() {
        let classifier = MockClassifier::new();
        let tokenizer = classifier.tokenizer();

        let positive = tokenizer.encode("what a great day, I love it").unwrap();
        let negative = tokenizer.encode("awful and broken").unwrap();
        let neutral = tokenizer.encode("the meeting is at noon").unwrap();

        assert_eq!(classifier.classify(&positive).await.unwrap(), "LABEL_2");
        assert_eq!(classifier.classify(&negative).await.unwrap(), "LABEL_0");
        assert_eq!(classifier.classify(&neutral).await.unwrap(), "LABEL_1");
        assert_eq!(classifier.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_classifier_script_cycles() {
        let classifier = MockClassifier::new().with_labels(["a", "b"]);
        let labels = [
            classifier.classify(&[]).await.unwrap(),
            classifier.classify(&[]).await.unwrap(),
            classifier.classify(&[]).await.unwrap(),
        ];
        assert_eq!(labels, ["a", "b", "a"]);
    }

    #[tokio::test]
    async fn test_mock_fetcher() {
        let fetcher = MockFetcher::new()
            .with_page("https://example.com/a", "<p>A</p>")
            .fail_url("https://down.example");

        let doc = fetcher.fetch("https://example.com/a").await.unwrap();
        assert_eq!(doc.body, "<p>A</p>");
        assert_eq!(doc.url.as_deref(), Some("https://example.com/a"));

        assert!(matches!(
            fetcher.fetch("https://example.com/missing").await,
            Err(FetchError::Status { status: 404, .. })
        ));
        assert!(matches!(
            fetcher.fetch("https://down.example").await,
            Err(FetchError::Http(_))
        ));
        assert_eq!(fetcher.calls().len(), 3);
    }
}
