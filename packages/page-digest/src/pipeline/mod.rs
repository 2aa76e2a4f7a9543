//! Digest pipeline: sanitize once, fan out to four stages, fan back in.
//!
//! The stages are:
//! - Entity ranking ([`entities`])
//! - Sentence salience ([`salience`])
//! - Windowed summarization ([`summarize`])
//! - Sliding-window sentiment ([`sentiment`])
//!
//! Each stage runs as its own tokio task over a shared [`Rmc`]. The first
//! failure (error, panic or timeout) ends the request and aborts the other
//! tasks; a request never yields a partial result.

pub mod entities;
pub mod salience;
pub mod sentiment;
pub mod summarize;

pub use entities::{rank_entities, EntityRanker};
pub use salience::{rank_sentences, sentence_salience, SentenceRanker};
pub use sentiment::{aggregate, majority_label, window_offsets, SentimentAggregator};
pub use summarize::Summarizer;

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{DigestError, Result};
use crate::sanitize::{sanitize, sanitize_document};
use crate::traits::{
    fetcher::Fetcher,
    language::LanguageModel,
    models::{Generator, SequenceClassifier, WordEmbeddings},
};
use crate::types::{
    config::{OverflowPolicy, PipelineConfig},
    document::{RawDocument, Rmc},
    entity::Entity,
    result::{DigestRequest, DigestResponse, PipelineResult, RankedSentence},
    sentiment::Sentiment,
};

static GLOBAL: OnceLock<Pipeline> = OnceLock::new();

/// The model instances a pipeline runs on.
///
/// Built once per process and shared read-only across requests.
#[derive(Clone)]
pub struct Models {
    pub language: Arc<dyn LanguageModel>,
    pub embeddings: Arc<dyn WordEmbeddings>,
    pub generator: Arc<dyn Generator>,
    pub classifier: Arc<dyn SequenceClassifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Entities,
    Salience,
    Summarizer,
    Sentiment,
}

impl Stage {
    fn name(self) -> &'static str {
        match self {
            Self::Entities => "entities",
            Self::Salience => "salience",
            Self::Summarizer => "summarizer",
            Self::Sentiment => "sentiment",
        }
    }
}

enum StageOutput {
    Entities(Vec<Entity>),
    KeySentences(Vec<RankedSentence>),
    Summary(String),
    Sentiment(Sentiment),
}

type StageOutcome = std::thread::Result<Result<StageOutput>>;

enum Input<'a> {
    Raw(&'a str),
    Document(&'a RawDocument),
}

impl Input<'_> {
    fn len(&self) -> usize {
        match self {
            Self::Raw(raw) => raw.len(),
            Self::Document(doc) => doc.content_length(),
        }
    }

    fn sanitize(&self) -> Result<Rmc> {
        match self {
            Self::Raw(raw) => sanitize(raw),
            Self::Document(doc) => sanitize_document(doc),
        }
    }
}

/// Runs documents through the digest stages.
///
/// Cheap to clone; clones share the models and the inference pool.
///
/// # Example
///
/// ```rust,ignore
/// use page_digest::{DigestRequest, Pipeline, PipelineConfig};
/// use page_digest::testing::TestScenario;
///
/// let pipeline = Pipeline::new(TestScenario::new().build(), PipelineConfig::default())?;
/// let response = pipeline.run(&DigestRequest::new("<p>Some page</p>")).await;
/// println!("{}", serde_json::to_string(&response)?);
/// ```
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    entities: EntityRanker,
    salience: SentenceRanker,
    summarizer: Summarizer,
    sentiment: SentimentAggregator,
    pool: Arc<Semaphore>,
}

impl Pipeline {
    /// Build a pipeline after validating `config`.
    pub fn new(models: Models, config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            entities: EntityRanker::new(models.language.clone()),
            salience: SentenceRanker::new(models.language, models.embeddings),
            summarizer: Summarizer::new(models.generator, config.summarizer.clone()),
            sentiment: SentimentAggregator::new(models.classifier, config.sentiment.clone()),
            pool: Arc::new(Semaphore::new(config.pool.capacity)),
            config: Arc::new(config),
        })
    }

    /// Install `pipeline` as the process-wide instance. Fails if one is
    /// already installed.
    pub fn install_global(pipeline: Pipeline) -> Result<&'static Pipeline> {
        let mut installed = false;
        let global = GLOBAL.get_or_init(|| {
            installed = true;
            pipeline
        });
        if !installed {
            return Err(DigestError::Config(
                "a global pipeline is already installed".into(),
            ));
        }
        info!(
            pool_capacity = global.config.pool.capacity,
            "installed global pipeline"
        );
        Ok(global)
    }

    /// The process-wide instance, if installed.
    pub fn global() -> Option<&'static Pipeline> {
        GLOBAL.get()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Digest a request. Never fails: errors become `{error}` responses.
    ///
    /// A document shorter than one sentiment window (510 tokens with the
    /// default [`SentimentConfig`](crate::types::config::SentimentConfig))
    /// has no valid window and yields
    /// `{"error": "sentiment undetermined: no valid classification windows"}`.
    /// Windows are never padded; lower `window_size` for short pages.
    pub async fn run(&self, request: &DigestRequest) -> DigestResponse {
        self.try_run(request).await.into()
    }

    pub async fn run_with_cancel(
        &self,
        request: &DigestRequest,
        cancel: &CancellationToken,
    ) -> DigestResponse {
        self.try_run_with_cancel(request, cancel).await.into()
    }

    pub async fn try_run(&self, request: &DigestRequest) -> Result<PipelineResult> {
        self.try_run_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Digest a request, stopping early once `cancel` fires.
    pub async fn try_run_with_cancel(
        &self,
        request: &DigestRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult> {
        self.digest(
            Input::Raw(&request.raw_html_or_text),
            request.summary_length,
            request.entity_limit,
            cancel,
        )
        .await
    }

    /// Digest an already fetched document, honouring its content type.
    pub async fn try_digest_document(
        &self,
        document: &RawDocument,
        summary_length: Option<usize>,
        entity_limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult> {
        self.digest(Input::Document(document), summary_length, entity_limit, cancel)
            .await
    }

    /// Fetch `url` and digest it. A fetch failure is reported as
    /// `fetch failed: …`; nothing is retried.
    pub async fn try_digest_url(
        &self,
        fetcher: &dyn Fetcher,
        url: &str,
        summary_length: Option<usize>,
        entity_limit: Option<usize>,
    ) -> Result<PipelineResult> {
        let document = fetcher.fetch(url).await.map_err(|e| {
            warn!(url = %url, error = %e, "fetch failed");
            DigestError::from(e)
        })?;
        self.try_digest_document(&document, summary_length, entity_limit, &CancellationToken::new())
            .await
    }

    pub async fn digest_url(
        &self,
        fetcher: &dyn Fetcher,
        url: &str,
        summary_length: Option<usize>,
        entity_limit: Option<usize>,
    ) -> DigestResponse {
        self.try_digest_url(fetcher, url, summary_length, entity_limit)
            .await
            .into()
    }

    async fn digest(
        &self,
        input: Input<'_>,
        summary_length: Option<usize>,
        entity_limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult> {
        let request_id = Uuid::new_v4();
        let span = info_span!("digest", %request_id);

        async move {
            let started = Instant::now();
            info!(input_len = input.len(), "digest started");

            let work = self.execute(input, summary_length, entity_limit, cancel);
            let result = match self.config.pipeline_timeout() {
                Some(budget) => tokio::time::timeout(budget, work)
                    .await
                    .unwrap_or_else(|_| {
                        Err(DigestError::Timeout {
                            stage: "pipeline",
                            budget,
                        })
                    }),
                None => work.await,
            };

            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(digest) => info!(
                    elapsed_ms,
                    entities = digest.entities().len(),
                    sentiment = %digest.sentiment(),
                    "digest finished"
                ),
                Err(e) => warn!(elapsed_ms, error = %e, "digest failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        input: Input<'_>,
        summary_length: Option<usize>,
        entity_limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult> {
        let rmc = input.sanitize()?;
        debug!(words = rmc.word_count(), "content sanitized");
        let summary_length = summary_length.unwrap_or(self.config.summary_length);
        let entity_limit = entity_limit.unwrap_or(self.config.entity_limit);

        let _permit = self.acquire_permit(cancel).await?;

        let stages = cancel.child_token();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DigestError::Cancelled),
            result = self.fan_out(rmc, summary_length, entity_limit, &stages) => result,
        };
        stages.cancel();
        result
    }

    async fn acquire_permit(&self, cancel: &CancellationToken) -> Result<OwnedSemaphorePermit> {
        let capacity = self.config.pool.capacity;
        match self.config.pool.policy {
            OverflowPolicy::Reject => self.pool.clone().try_acquire_owned().map_err(|_| {
                warn!(capacity, "inference pool full, rejecting document");
                DigestError::Overloaded { capacity }
            }),
            OverflowPolicy::Queue => {
                if self.pool.available_permits() == 0 {
                    debug!(capacity, "inference pool full, queueing document");
                }
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(DigestError::Cancelled),
                    permit = self.pool.clone().acquire_owned() => {
                        permit.map_err(|_| DigestError::Cancelled)
                    }
                }
            }
        }
    }

    async fn fan_out(
        &self,
        rmc: Rmc,
        summary_length: usize,
        entity_limit: usize,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult> {
        let mut tasks: JoinSet<(Stage, StageOutcome)> = JoinSet::new();

        {
            let ranker = self.entities.clone();
            let rmc = rmc.clone();
            spawn_stage(&mut tasks, Stage::Entities, async move {
                ranker
                    .rank(&rmc, entity_limit)
                    .await
                    .map(StageOutput::Entities)
            });
        }
        {
            let ranker = self.salience.clone();
            let rmc = rmc.clone();
            let top_n = self.config.salience.top_n;
            spawn_stage(&mut tasks, Stage::Salience, async move {
                ranker.rank(&rmc, top_n).await.map(StageOutput::KeySentences)
            });
        }
        {
            let summarizer = self.summarizer.clone();
            let rmc = rmc.clone();
            spawn_stage(&mut tasks, Stage::Summarizer, async move {
                summarizer
                    .summarize(&rmc, summary_length)
                    .await
                    .map(StageOutput::Summary)
            });
        }
        {
            let aggregator = self.sentiment.clone();
            let rmc = rmc.clone();
            let cancel = cancel.clone();
            spawn_stage(&mut tasks, Stage::Sentiment, async move {
                aggregator
                    .classify(&rmc, &cancel)
                    .await
                    .map(StageOutput::Sentiment)
            });
        }

        let mut entities = None;
        let mut key_sentences = None;
        let mut summary = None;
        let mut sentiment = None;
        let mut summary_failure = None;

        while let Some(joined) = tasks.join_next().await {
            // stage panics are caught inside the task, so a join error means abort
            let (stage, outcome) = joined.map_err(|_| DigestError::Cancelled)?;
            let result = outcome.unwrap_or_else(|panic| {
                error!(
                    stage = stage.name(),
                    panic = %panic_message(panic.as_ref()),
                    "stage panicked"
                );
                Err(DigestError::StagePanicked {
                    stage: stage.name(),
                })
            });

            match result {
                Ok(StageOutput::Entities(v)) => entities = Some(v),
                Ok(StageOutput::KeySentences(v)) => key_sentences = Some(v),
                Ok(StageOutput::Summary(v)) => summary = Some(v),
                Ok(StageOutput::Sentiment(v)) => sentiment = Some(v),
                Err(e)
                    if stage == Stage::Summarizer
                        && self.config.summary_fallback
                        && e.is_recoverable_summary_failure() =>
                {
                    warn!(error = %e, "summarizer failed, falling back to key sentences");
                    summary_failure = Some(e);
                }
                Err(e) => {
                    warn!(stage = stage.name(), error = %e, "stage failed");
                    return Err(e);
                }
            }
        }

        let entities = collected(entities, Stage::Entities)?;
        let key_sentences = collected(key_sentences, Stage::Salience)?;
        let sentiment = collected(sentiment, Stage::Sentiment)?;
        let summary = match (summary, summary_failure) {
            (Some(summary), _) => summary,
            (None, Some(_)) => fallback_summary(&key_sentences),
            (None, None) => return Err(missing(Stage::Summarizer)),
        };

        Ok(PipelineResult::new(
            summary,
            entities,
            sentiment,
            rmc,
            key_sentences,
        ))
    }
}

fn spawn_stage<F>(tasks: &mut JoinSet<(Stage, StageOutcome)>, stage: Stage, work: F)
where
    F: Future<Output = Result<StageOutput>> + Send + 'static,
{
    tasks.spawn(
        async move {
            let started = Instant::now();
            let outcome = AssertUnwindSafe(work).catch_unwind().await;
            debug!(
                stage = stage.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                ok = matches!(outcome, Ok(Ok(_))),
                "stage finished"
            );
            (stage, outcome)
        }
        .in_current_span(),
    );
}

fn collected<T>(value: Option<T>, stage: Stage) -> Result<T> {
    value.ok_or_else(|| missing(stage))
}

fn missing(stage: Stage) -> DigestError {
    DigestError::StagePanicked {
        stage: stage.name(),
    }
}

/// Summary built from the key sentences, highest salience first.
pub fn fallback_summary(key_sentences: &[RankedSentence]) -> String {
    key_sentences
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
