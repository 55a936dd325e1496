
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{ApiKey, Config};
use crate::embeddings::{Embedder, EmbeddingVector, prepare_input};

/// Blocking client for an OpenAI-compatible `/embeddings` endpoint
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    endpoint: String,
    model: String,
    api_key: ApiKey,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    input: [&'a str; 1],
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: EmbeddingVector,
}

impl OpenAiEmbedder {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .require_api_key()
            .context("Embedding client needs a provider credential")?
            .clone();

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.openai.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            endpoint: config.openai.endpoint("embeddings"),
            model: config.openai.embedding_model.clone(),
            api_key,
            agent,
        })
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed `text` after flattening its newlines
    #[inline]
    pub fn generate_embedding(&self, text: &str) -> Result<EmbeddingVector> {
        let input = prepare_input(text);
        info!("{}", input);

        let request = EmbedRequest {
            input: [input.as_str()],
            model: &self.model,
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let response_text = match self
            .agent
            .post(self.endpoint.as_str())
            .header("Authorization", self.api_key.bearer())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
        {
            Ok(text) => text,
            Err(ureq::Error::StatusCode(status)) => {
                warn!("Embedding endpoint returned HTTP {}", status);
                return Err(anyhow!("Embedding request failed: HTTP {}", status));
            }
            Err(e) => {
                warn!("Embedding request transport error: {}", e);
                return Err(anyhow::Error::from(e))
                    .with_context(|| format!("Failed to reach {}", self.endpoint));
            }
        };

        let embed_response: EmbedResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;

        let embedding = embed_response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| anyhow!("Embedding response contained no vectors"))?;

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}

impl Embedder for OpenAiEmbedder {
    #[inline]
    fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        self.generate_embedding(text)
    }
}
