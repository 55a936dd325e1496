// Embeddings module
// Vectors for prompts and completions, produced by a remote embedding model

pub mod openai;

use std::sync::Arc;

pub use openai::OpenAiEmbedder;

/// A single embedding vector; its dimensionality is fixed by the model
pub type EmbeddingVector = Vec<f32>;

/// Anything that can turn text into an embedding vector
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> anyhow::Result<EmbeddingVector>;
}

impl<T: Embedder + ?Sized> Embedder for Arc<T> {
    #[inline]
    fn embed(&self, text: &str) -> anyhow::Result<EmbeddingVector> {
        (**self).embed(text)
    }
}

/// Embedding models treat literal newlines as signal, so they are flattened
/// to spaces before every call.
#[inline]
pub fn prepare_input(text: &str) -> String {
    text.replace('\n', " ")
}
