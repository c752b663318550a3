//! Hash-based embedding backend (deterministic, no model needed)
//!
//! Token hashes are scattered across the output dimensions and the result
//! is L2-normalized. Quality is far below a real model but the output is
//! stable across runs, which makes this the fallback of last resort and
//! the embedding backend used by the test suite.

use async_trait::async_trait;

use super::Embedder;
use crate::error::Result;

/// Default output dimension when none is configured
pub const DEFAULT_DIMENSION: usize = 384;

/// Deterministic offline embedder
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Create a hash embedder with the given output dimension
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f64> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut embedding = vec![0.0f64; self.dimension];

        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            token.to_lowercase().hash(&mut hasher);
            (i as u64).hash(&mut hasher);
            let hash = hasher.finish();

            for (j, slot) in embedding.iter_mut().enumerate() {
                let mut hasher = DefaultHasher::new();
                hash.hash(&mut hasher);
                (j as u64).hash(&mut hasher);
                let val = hasher.finish();
                *slot += (val as f64 / u64::MAX as f64) * 2.0 - 1.0;
            }
        }

        // L2-normalize
        let mag: f64 = embedding.iter().map(|x| x * x).sum::<f64>().sqrt();
        if mag > 0.0 {
            for val in embedding.iter_mut() {
                *val /= mag;
            }
        }

        embedding
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deterministic() {
        let embedder = HashEmbedder::default();
        let texts = vec!["hello world".to_string()];

        let a = embedder.embed(&texts).await.unwrap();
        let b = embedder.embed(&texts).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_distinct_texts_differ() {
        let embedder = HashEmbedder::default();
        let texts = vec!["hello world".to_string(), "goodbye moon".to_string()];

        let batch = embedder.embed(&texts).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_ne!(batch[0], batch[1]);
    }

    #[tokio::test]
    async fn test_normalized() {
        let embedder = HashEmbedder::new(64);
        let batch = embedder
            .embed(&["the quick brown fox".to_string()])
            .await
            .unwrap();

        assert_eq!(batch[0].len(), 64);
        let mag: f64 = batch[0].iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((mag - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new(8);
        let batch = embedder.embed(&["".to_string()]).await.unwrap();
        assert!(batch[0].iter().all(|&x| x == 0.0));
    }
}
