//! Prompt-to-completion pipeline.
//!
//! One call runs the whole chain in order: completion request, extraction,
//! sanitization, three embeddings and one appended table row. A failure at
//! any step stops the chain, so a rejected completion never reaches the
//! embedding endpoint or the table.


use anyhow::Context;
use thiserror::Error;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::completion::{
    CompletionClient, CompletionError, CompletionRequest, ModelOption, sanitize,
};
use crate::config::Config;
use crate::embeddings::{Embedder, OpenAiEmbedder};
use crate::storage::{CsvEmbeddingStore, EmbeddingRecord, EmbeddingStore};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to generate text")]
    Generation,

    #[error("Invalid response from OpenAI")]
    InvalidResponse,

    #[error("Failed to compute embeddings")]
    Embedding(#[source] anyhow::Error),

    #[error("Failed to persist embeddings")]
    Persistence(#[source] anyhow::Error),
}

impl From<CompletionError> for PipelineError {
    fn from(error: CompletionError) -> Self {
        match error {
            CompletionError::Generation => Self::Generation,
            CompletionError::InvalidResponse => Self::InvalidResponse,
        }
    }
}

pub struct CompletionPipeline {
    completion: CompletionClient,
    embedder: Box<dyn Embedder>,
    store: Box<dyn EmbeddingStore>,
}

impl CompletionPipeline {
    #[inline]
    pub fn new(
        completion: CompletionClient,
        embedder: Box<dyn Embedder>,
        store: Box<dyn EmbeddingStore>,
    ) -> Self {
        Self {
            completion,
            embedder,
            store,
        }
    }

    /// Wire the OpenAI clients and the CSV table described by `config`
    #[inline]
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let completion =
            CompletionClient::new(config).context("Failed to create completion client")?;
        let embedder = OpenAiEmbedder::new(config).context("Failed to create embedding client")?;
        let store = CsvEmbeddingStore::new(config.embeddings_path());

        Ok(Self::new(completion, Box::new(embedder), Box::new(store)))
    }

    /// Run the full chain for `request` and return the sanitized completion
    #[inline]
    pub fn generate(&self, request: &CompletionRequest) -> Result<String, PipelineError> {
        let span = info_span!(
            "completion",
            request_id = %Uuid::new_v4(),
            model = %request.model_id
        );
        let _entered = span.enter();

        let result = self.run(request);
        match &result {
            Ok(text) => info!("{}", text),
            Err(error) => match error {
                PipelineError::Embedding(cause) | PipelineError::Persistence(cause) => {
                    warn!("{}: {:#}", error, cause);
                }
                _ => warn!("{}", error),
            },
        }
        result
    }

    #[inline]
    pub fn list_models(&self) -> anyhow::Result<Vec<ModelOption>> {
        self.completion.list_models()
    }

    fn run(&self, request: &CompletionRequest) -> Result<String, PipelineError> {
        let raw = self.completion.complete(request)?;
        let text = sanitize(&raw);

        let record = self
            .capture_embeddings(&request.prompt, &text)
            .map_err(PipelineError::Embedding)?;

        self.store
            .append(&record)
            .map_err(PipelineError::Persistence)?;

        Ok(text)
    }

    fn capture_embeddings(&self, prompt: &str, text: &str) -> anyhow::Result<EmbeddingRecord> {
        let concat_text = format!("{} {}", prompt, text);

        let prompt_embedding = self
            .embedder
            .embed(prompt)
            .context("Failed to embed prompt")?;
        let text_embedding = self
            .embedder
            .embed(text)
            .context("Failed to embed completion")?;
        let concat_text_embedding = self
            .embedder
            .embed(&concat_text)
            .context("Failed to embed concatenated text")?;

        Ok(EmbeddingRecord {
            prompt_embedding,
            text_embedding,
            concat_text_embedding,
            concat_text,
        })
    }
}
