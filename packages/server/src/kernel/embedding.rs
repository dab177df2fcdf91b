//! Stub embedding service.

use anyhow::Result;
use async_trait::async_trait;

use super::traits::Embedder;

/// Deterministic zero-vector embedder used until a real provider is wired.
pub struct ZeroVectorEmbedder {
    dim: usize,
}

impl ZeroVectorEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Default for ZeroVectorEmbedder {
    fn default() -> Self {
        Self { dim: 1536 }
    }
}

#[async_trait]
impl Embedder for ZeroVectorEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![0.0; self.dim]).collect())
    }
}

/// True when every vector is an all-zero stub; such vectors are not worth
/// persisting.
pub fn all_zero_stubs(vectors: &[Vec<f32>]) -> bool {
    vectors.iter().all(|v| v.iter().all(|x| *x == 0.0))
}
