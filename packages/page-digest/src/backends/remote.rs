//! Hosted models reached over HTTP.
//!
//! Requests follow the Hugging Face Inference API shape: `{"inputs": ...}`
//! with optional `parameters`. Input ids are decoded with the local tokenizer
//! before sending, so the tokenizer must match the hosted model's vocabulary
//! for window and budget arithmetic to mean anything.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{DigestError, Result};
use crate::security::credentials::ModelEndpoint;
use crate::traits::models::{GenerationParams, Generator, SequenceClassifier};
use crate::traits::tokenizer::Tokenizer;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct InferenceRequest<'a, P: Serialize> {
    inputs: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<P>,
}

#[derive(Serialize)]
struct GenerateParameters {
    max_length: usize,
    min_length: usize,
    num_beams: usize,
    length_penalty: f32,
    early_stopping: bool,
    do_sample: bool,
}

impl From<&GenerationParams> for GenerateParameters {
    fn from(p: &GenerationParams) -> Self {
        Self {
            max_length: p.max_length,
            min_length: p.min_length,
            num_beams: p.num_beams,
            length_penalty: p.length_penalty,
            early_stopping: p.early_stopping,
            do_sample: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    #[serde(alias = "generated_text")]
    summary_text: String,
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassificationOutput {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| DigestError::ModelInference(Box::new(e)))
}

async fn post_json<T: Serialize + ?Sized>(
    client: &reqwest::Client,
    endpoint: &ModelEndpoint,
    body: &T,
) -> Result<String> {
    let mut request = client.post(endpoint.url()).json(body);
    if let Some(key) = &endpoint.api_key {
        request = request.header(reqwest::header::AUTHORIZATION, key.bearer());
    }

    let response = request.send().await.map_err(|e| {
        warn!(model = %endpoint.model, error = %e, "inference request failed");
        DigestError::ModelInference(Box::new(e))
    })?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| DigestError::ModelInference(Box::new(e)))?;

    if !status.is_success() {
        return Err(DigestError::inference(format!(
            "{} answered {}: {}",
            endpoint.model,
            status.as_u16(),
            text.chars().take(200).collect::<String>()
        )));
    }
    Ok(text)
}

/// Parse a `[{"summary_text": ...}]` or `[{"generated_text": ...}]` body.
pub fn parse_generation(body: &str) -> Result<String> {
    let outputs: Vec<GeneratedText> =
        serde_json::from_str(body).map_err(|e| DigestError::ModelInference(Box::new(e)))?;
    outputs
        .into_iter()
        .next()
        .map(|o| o.summary_text)
        .ok_or_else(|| DigestError::inference("generation response was empty"))
}

/// Parse a classification body and return the highest-scoring label.
pub fn parse_classification(body: &str) -> Result<String> {
    let output: ClassificationOutput =
        serde_json::from_str(body).map_err(|e| DigestError::ModelInference(Box::new(e)))?;
    let scores = match output {
        ClassificationOutput::Nested(outer) => outer.into_iter().next().unwrap_or_default(),
        ClassificationOutput::Flat(scores) => scores,
    };

    scores
        .into_iter()
        .fold(None::<LabelScore>, |best, candidate| match best {
            Some(b) if b.score >= candidate.score => Some(b),
            _ => Some(candidate),
        })
        .map(|s| s.label)
        .ok_or_else(|| DigestError::inference("classification response had no labels"))
}

/// Summarization model behind an HTTP endpoint.
pub struct RemoteGenerator {
    client: reqwest::Client,
    endpoint: ModelEndpoint,
    tokenizer: Arc<dyn Tokenizer>,
    max_input_tokens: usize,
}

impl RemoteGenerator {
    pub fn new(
        endpoint: ModelEndpoint,
        tokenizer: Arc<dyn Tokenizer>,
        max_input_tokens: usize,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            endpoint,
            tokenizer,
            max_input_tokens,
        })
    }
}

#[async_trait]
impl Generator for RemoteGenerator {
    fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    fn max_input_tokens(&self) -> usize {
        self.max_input_tokens
    }

    async fn generate(&self, input_ids: &[u32], params: &GenerationParams) -> Result<String> {
        let inputs = self.tokenizer.decode(input_ids)?;
        let request = InferenceRequest {
            inputs: &inputs,
            parameters: Some(GenerateParameters::from(params)),
        };

        debug!(model = %self.endpoint.model, input_ids = input_ids.len(), "remote generate");
        let body = post_json(&self.client, &self.endpoint, &request).await?;
        parse_generation(&body)
    }
}

/// Sequence classifier behind an HTTP endpoint.
pub struct RemoteClassifier {
    client: reqwest::Client,
    endpoint: ModelEndpoint,
    tokenizer: Arc<dyn Tokenizer>,
}

impl RemoteClassifier {
    pub fn new(endpoint: ModelEndpoint, tokenizer: Arc<dyn Tokenizer>) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            endpoint,
            tokenizer,
        })
    }
}

#[async_trait]
impl SequenceClassifier for RemoteClassifier {
    fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    async fn classify(&self, input_ids: &[u32]) -> Result<String> {
        // markers are re-added server side
        let inputs = self.tokenizer.decode(input_ids)?;
        let request: InferenceRequest<'_, ()> = InferenceRequest {
            inputs: &inputs,
            parameters: None,
        };

        let body = post_json(&self.client, &self.endpoint, &request).await?;
        parse_classification(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_summary_text() {
        let body = r#"[{"summary_text": "A short summary."}]"#;
        assert_eq!(parse_generation(body).unwrap(), "A short summary.");
    }

    #[test]
    fn test_parse_generated_text_alias() {
        let body = r#"[{"generated_text": "Other shape."}]"#;
        assert_eq!(parse_generation(body).unwrap(), "Other shape.");
    }

    #[test]
    fn test_parse_generation_errors() {
        assert!(matches!(parse_generation("[]"), Err(DigestError::ModelInference(_))));
        assert!(matches!(
            parse_generation(r#"{"error": "Model is loading"}"#),
            Err(DigestError::ModelInference(_))
        ));
    }

    #[test]
    fn test_parse_classification_picks_top_score() {
        let nested = r#"[[{"label":"LABEL_0","score":0.1},{"label":"LABEL_2","score":0.8},{"label":"LABEL_1","score":0.1}]]"#;
        assert_eq!(parse_classification(nested).unwrap(), "LABEL_2");

        let flat = r#"[{"label":"negative","score":0.7},{"label":"positive","score":0.3}]"#;
        assert_eq!(parse_classification(flat).unwrap(), "negative");
    }

    #[test]
    fn test_parse_classification_tie_keeps_first() {
        let body = r#"[{"label":"a","score":0.5},{"label":"b","score":0.5}]"#;
        assert_eq!(parse_classification(body).unwrap(), "a");
    }

    #[test]
    fn test_parse_classification_empty() {
        assert!(parse_classification("[[]]").is_err());
        assert!(parse_classification("[]").is_err());
    }

    #[test]
    fn test_generate_request_shape() {
        let params = GenerationParams {
            max_length: 100,
            min_length: 40,
            num_beams: 4,
            length_penalty: 2.0,
            early_stopping: true,
        };
        let request = InferenceRequest {
            inputs: "summarize: text",
            parameters: Some(GenerateParameters::from(&params)),
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["inputs"], "summarize: text");
        assert_eq!(json["parameters"]["num_beams"], 4);
        assert_eq!(json["parameters"]["do_sample"], false);

        let bare: InferenceRequest<'_, ()> = InferenceRequest {
            inputs: "x",
            parameters: None,
        };
        assert!(serde_json::to_value(&bare).unwrap().get("parameters").is_none());
    }
}
