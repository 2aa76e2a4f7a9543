//! Digest one document from a file, a URL, or stdin.
//!
//! Prints the JSON response on stdout and exits with status 1 when the
//! response is an `{error}`.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use page_digest::{
    DigestRequest, DigestResponse, EmbeddingTable, HttpFetcher, ModelEndpoint, Models, Pipeline,
    PipelineConfig, RemoteClassifier, RemoteGenerator, RuleBasedLanguageModel, Tokenizer,
    VocabTokenizer,
};

const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co/models";

#[derive(Parser)]
#[command(name = "page-digest")]
#[command(about = "Summarize, rank entities and score sentiment for a web document")]
struct Cli {
    /// Read HTML from a file
    #[arg(long, conflicts_with = "url")]
    file: Option<PathBuf>,

    /// Fetch the document from a URL
    #[arg(long)]
    url: Option<String>,

    /// Summary decode budget in tokens (default from DIGEST_SUMMARY_LENGTH)
    #[arg(long)]
    summary_length: Option<usize>,

    /// Maximum entities returned (default from DIGEST_ENTITY_LIMIT)
    #[arg(long)]
    entity_limit: Option<usize>,

    /// Pretty-print the JSON response
    #[arg(long)]
    pretty: bool,
}

/// Model resources named by `DIGEST_*` variables.
///
/// Both hosted models must share the WordPiece vocabulary at `vocab_path`
/// (`[CLS]`/`[SEP]`/`[UNK]`), so there are no default model names.
#[derive(Debug, PartialEq)]
struct ModelSettings {
    vocab_path: String,
    embeddings_path: String,
    lowercase: bool,
    inference_url: String,
    api_key: Option<String>,
    summary_model: String,
    sentiment_model: String,
}

impl ModelSettings {
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .with_context(|| format!("{key} must be set"))
        };

        Ok(Self {
            vocab_path: required("DIGEST_VOCAB_PATH")?,
            embeddings_path: required("DIGEST_EMBEDDINGS_PATH")?,
            lowercase: lookup("DIGEST_VOCAB_LOWERCASE").as_deref() != Some("false"),
            inference_url: lookup("DIGEST_INFERENCE_URL")
                .unwrap_or_else(|| DEFAULT_INFERENCE_URL.to_string()),
            api_key: lookup("DIGEST_API_KEY"),
            summary_model: required("DIGEST_SUMMARY_MODEL")
                .context("the summarizer must use the DIGEST_VOCAB_PATH vocabulary")?,
            sentiment_model: required("DIGEST_SENTIMENT_MODEL")
                .context("the sentiment classifier must use the DIGEST_VOCAB_PATH vocabulary")?,
        })
    }
}

fn build_models(settings: ModelSettings, config: &PipelineConfig) -> Result<Models> {
    let vocab_path = &settings.vocab_path;
    let embeddings_path = &settings.embeddings_path;

    let tokenizer: Arc<dyn Tokenizer> = Arc::new(
        VocabTokenizer::from_path(vocab_path, settings.lowercase)
            .with_context(|| format!("loading vocabulary from {vocab_path}"))?,
    );
    let embeddings = EmbeddingTable::from_path(embeddings_path)
        .with_context(|| format!("loading embeddings from {embeddings_path}"))?;

    let endpoint = |model: String| {
        let endpoint = ModelEndpoint::new(settings.inference_url.clone(), model);
        match &settings.api_key {
            Some(key) => endpoint.with_api_key(key.clone()),
            None => endpoint,
        }
    };

    let generator = RemoteGenerator::new(
        endpoint(settings.summary_model.clone()),
        tokenizer.clone(),
        config.summarizer.max_input_tokens,
    )?;
    let classifier = RemoteClassifier::new(endpoint(settings.sentiment_model.clone()), tokenizer)?;

    Ok(Models {
        language: Arc::new(RuleBasedLanguageModel::new()),
        embeddings: Arc::new(embeddings),
        generator: Arc::new(generator),
        classifier: Arc::new(classifier),
    })
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("reading stdin")?;
            Ok(input)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .init();

    let cli = Cli::parse();

    let config = PipelineConfig::from_env().context("loading configuration")?;
    let models = build_models(ModelSettings::from_env()?, &config)?;
    let pipeline = Pipeline::install_global(Pipeline::new(models, config)?)?;

    let response: DigestResponse = match &cli.url {
        Some(url) => {
            let fetcher = HttpFetcher::new()?;
            pipeline
                .digest_url(&fetcher, url, cli.summary_length, cli.entity_limit)
                .await
        }
        None => {
            let mut request = DigestRequest::new(read_input(cli.file.as_ref())?);
            request.summary_length = cli.summary_length;
            request.entity_limit = cli.entity_limit;
            pipeline.run(&request).await
        }
    };

    let json = if cli.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{json}");

    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const COMPLETE: &[(&str, &str)] = &[
        ("DIGEST_VOCAB_PATH", "vocab.txt"),
        ("DIGEST_EMBEDDINGS_PATH", "vectors.txt"),
        ("DIGEST_SUMMARY_MODEL", "org/bert-summarizer"),
        ("DIGEST_SENTIMENT_MODEL", "org/bert-sentiment"),
    ];

    #[test]
    fn test_complete_settings_use_defaults_for_optional_vars() {
        let settings = ModelSettings::from_lookup(lookup(COMPLETE)).unwrap();

        assert_eq!(settings.summary_model, "org/bert-summarizer");
        assert_eq!(settings.sentiment_model, "org/bert-sentiment");
        assert_eq!(settings.inference_url, DEFAULT_INFERENCE_URL);
        assert!(settings.lowercase);
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn test_model_names_have_no_defaults() {
        for missing in ["DIGEST_SUMMARY_MODEL", "DIGEST_SENTIMENT_MODEL"] {
            let vars: Vec<(&str, &str)> = COMPLETE
                .iter()
                .copied()
                .filter(|(key, _)| *key != missing)
                .collect();

            let err = ModelSettings::from_lookup(lookup(&vars)).unwrap_err();
            assert!(format!("{err:#}").contains(missing), "{err:#}");
        }
    }

    #[test]
    fn test_blank_model_name_rejected() {
        let vars: Vec<(&str, &str)> = COMPLETE
            .iter()
            .map(|&(key, value)| match key {
                "DIGEST_SENTIMENT_MODEL" => (key, "  "),
                _ => (key, value),
            })
            .collect();

        assert!(ModelSettings::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn test_lowercase_can_be_disabled() {
        let mut vars = COMPLETE.to_vec();
        vars.push(("DIGEST_VOCAB_LOWERCASE", "false"));

        assert!(!ModelSettings::from_lookup(lookup(&vars)).unwrap().lowercase);
    }
}
