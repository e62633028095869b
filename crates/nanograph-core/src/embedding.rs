//! Embedding function wrapper.
//!
//! [`EmbeddingFunc`] pairs an async [`Embedder`] with the vector width and input
//! limit the indexer needs to know about. To cap concurrent provider calls,
//! compose it with a gate through [`EmbeddingFunc::limited`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::concurrency_gate::ConcurrencyGate;
use crate::error::{GraphError, GraphResult};

/// Provider that turns a batch of texts into one vector per text.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>>;
}

struct FnEmbedder<F> {
    func: F,
}

#[async_trait]
impl<F, Fut> Embedder for FnEmbedder<F>
where
    F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Vec<Vec<f32>>>> + Send + 'static,
{
    async fn embed(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        (self.func)(texts).await
    }
}

struct GatedEmbedder {
    gate: ConcurrencyGate,
    inner: Arc<dyn Embedder>,
}

#[async_trait]
impl Embedder for GatedEmbedder {
    async fn embed(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        self.gate.run(self.inner.embed(texts)).await
    }
}

#[derive(Clone)]
pub struct EmbeddingFunc {
    embedding_dim: usize,
    max_token_size: usize,
    embedder: Arc<dyn Embedder>,
}

impl fmt::Debug for EmbeddingFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingFunc")
            .field("embedding_dim", &self.embedding_dim)
            .field("max_token_size", &self.max_token_size)
            .finish_non_exhaustive()
    }
}

impl EmbeddingFunc {
    pub fn new(embedding_dim: usize, max_token_size: usize, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedding_dim,
            max_token_size,
            embedder,
        }
    }

    /// Build from an async closure taking the batch of texts.
    pub fn from_fn<F, Fut>(embedding_dim: usize, max_token_size: usize, func: F) -> Self
    where
        F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<Vec<f32>>>> + Send + 'static,
    {
        Self::new(embedding_dim, max_token_size, Arc::new(FnEmbedder { func }))
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Largest input, in tokens, the provider accepts per text.
    pub fn max_token_size(&self) -> usize {
        self.max_token_size
    }

    /// Copy of this function whose provider calls are admitted through `gate`.
    pub fn limited(&self, gate: &ConcurrencyGate) -> Self {
        Self {
            embedding_dim: self.embedding_dim,
            max_token_size: self.max_token_size,
            embedder: Arc::new(GatedEmbedder {
                gate: gate.clone(),
                inner: self.embedder.clone(),
            }),
        }
    }

    /// Embed `texts`, checking every returned vector has `embedding_dim` entries.
    #[tracing::instrument(
        skip(self, texts),
        fields(batch_size = texts.len(), embedding_dim = self.embedding_dim)
    )]
    pub async fn call(&self, texts: Vec<String>) -> GraphResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.embedder.embed(texts).await.map_err(|e| {
            tracing::warn!(error = %e, "Embedding provider call failed");
            GraphError::Embedding(format!("{:#}", e))
        })?;

        if let Some(bad) = vectors.iter().find(|v| v.len() != self.embedding_dim) {
            return Err(GraphError::EmbeddingDimensionMismatch {
                expected: self.embedding_dim,
                actual: bad.len(),
            });
        }

        Ok(vectors)
    }
}
