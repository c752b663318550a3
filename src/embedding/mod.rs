//! Pluggable embedding backends
//!
//! Supports:
//! - OpenRouter embeddings (uses your existing API key)
//! - OpenAI embeddings directly
//! - Hash-based fallback (free, offline, deterministic, lower quality)
//!
//! The engine only depends on the [`Embedder`] contract: a batch of texts
//! in, one fixed-length vector per text out, in input order. Backends are
//! chosen by an explicit preference list supplied by the caller; there is
//! no environment probing inside this module.

pub mod api;
pub mod hash;

pub use api::ApiEmbedder;
pub use hash::HashEmbedder;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, VoiceError};

/// Contract every embedding backend must satisfy.
///
/// `embed` must return exactly one vector per input text, in input order,
/// each of length `dimension()`. Backends fail explicitly when the model
/// or network is unavailable; they never silently return zero vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts in a single call
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f64>>>;

    /// Output dimension, constant for the lifetime of the backend
    fn dimension(&self) -> usize;

    /// Backend name for logs and selection errors
    fn name(&self) -> &str;
}

/// Available embedding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Use OpenRouter (same API key works for many models)
    OpenRouter,
    /// Use OpenAI directly (requires separate key)
    OpenAi,
    /// Use local hash-based fallback (free, no network, lower quality)
    Hash,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenRouter => write!(f, "OpenRouter"),
            Self::OpenAi => write!(f, "OpenAI"),
            Self::Hash => write!(f, "Hash"),
        }
    }
}

/// Embedding backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderConfig {
    /// Backend provider
    pub provider: ProviderKind,
    /// Model name (provider-specific)
    pub model_name: String,
    /// API key for cloud providers; `None` means the backend is unusable
    pub api_key: Option<String>,
    /// Maximum sequence length in tokens
    pub max_length: usize,
    /// Embedding dimension
    pub embedding_dim: usize,
    /// Batch size for API calls
    pub batch_size: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenRouter,
            // OpenRouter proxies the OpenAI embedding models
            model_name: "openai/text-embedding-3-small".to_string(),
            api_key: None,
            max_length: 8191,
            embedding_dim: 1536,
            batch_size: 100,
        }
    }
}

impl EmbedderConfig {
    /// Config for OpenRouter
    pub fn openrouter() -> Self {
        Self::default()
    }

    /// Config for OpenAI directly
    pub fn openai(api_key: String) -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model_name: "text-embedding-3-small".to_string(),
            api_key: Some(api_key),
            ..Default::default()
        }
    }

    /// Config for the hash-based fallback (no key, no download)
    pub fn hash() -> Self {
        Self {
            provider: ProviderKind::Hash,
            model_name: "hash-based".to_string(),
            api_key: None,
            embedding_dim: 384,
            max_length: 512,
            batch_size: 256,
        }
    }
}

/// Build the first usable backend from an ordered preference list.
///
/// Each candidate is checked in turn: API backends need a key, the hash
/// backend is always constructible. Fails with a descriptive error naming
/// every rejected candidate when none is usable.
pub fn select_embedder(preferences: &[EmbedderConfig]) -> Result<Arc<dyn Embedder>> {
    let mut rejected = Vec::new();

    for config in preferences {
        match config.provider {
            ProviderKind::OpenRouter | ProviderKind::OpenAi => {
                if config.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
                    info!("Selected embedding backend: {} ({})", config.provider, config.model_name);
                    return Ok(Arc::new(ApiEmbedder::new(config.clone())?));
                }
                debug!("Skipping {} backend: no API key configured", config.provider);
                rejected.push(format!("{}: no API key configured", config.provider));
            }
            ProviderKind::Hash => {
                info!("Selected embedding backend: hash-based ({}d)", config.embedding_dim);
                return Ok(Arc::new(HashEmbedder::new(config.embedding_dim)));
            }
        }
    }

    Err(VoiceError::Provider(format!(
        "no embedding backend available (tried {})",
        if rejected.is_empty() { "empty preference list".to_string() } else { rejected.join("; ") }
    )))
}

/// Verify a backend returned one vector per input, each of the expected
/// dimension. Wrong shapes surface as provider errors, never as silent
/// truncation.
pub(crate) fn ensure_batch_shape(batch: &[Vec<f64>], expected_count: usize, dimension: usize) -> Result<()> {
    if batch.len() != expected_count {
        return Err(VoiceError::Provider(format!(
            "backend returned {} vectors for {} inputs",
            batch.len(),
            expected_count
        )));
    }
    for vector in batch {
        if vector.len() != dimension {
            return Err(VoiceError::Provider(format!(
                "backend returned a {}-dim vector, expected {}",
                vector.len(),
                dimension
            )));
        }
    }
    Ok(())
}

/// Cosine similarity between two vectors
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

/// Arithmetic mean of a non-empty batch of equal-length vectors
pub fn mean_vector(rows: &[Vec<f64>]) -> Vec<f64> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };

    let mut mean = vec![0.0f64; first.len()];
    for row in rows {
        for (acc, value) in mean.iter_mut().zip(row.iter()) {
            *acc += value;
        }
    }
    let n = rows.len() as f64;
    for value in mean.iter_mut() {
        *value /= n;
    }
    mean
}

/// Percentile with linear interpolation between closest ranks.
///
/// `p` is in `[0, 100]`. Matches the conventional definition: sort the
/// values, take rank `p/100 * (n-1)`, and interpolate between the two
/// neighbouring order statistics.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let weight = rank - lo as f64;
    sorted[lo] * (1.0 - weight) + sorted[hi] * weight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        let c = vec![0.0, 1.0, 0.0];

        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-12);
        assert!(cosine_similarity(&a, &c).abs() < 1e-12);
        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_mean_vector() {
        let rows = vec![vec![1.0, 3.0], vec![3.0, 5.0]];
        assert_eq!(mean_vector(&rows), vec![2.0, 4.0]);
        assert!(mean_vector(&[]).is_empty());
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = vec![4.0, 1.0, 3.0, 2.0];
        // rank = 0.1 * 3 = 0.3 -> 1.0 + 0.3 * (2.0 - 1.0)
        assert!((percentile(&values, 10.0) - 1.3).abs() < 1e-12);
        assert!((percentile(&values, 0.0) - 1.0).abs() < 1e-12);
        assert!((percentile(&values, 100.0) - 4.0).abs() < 1e-12);
        assert!((percentile(&[5.0], 10.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_ensure_batch_shape() {
        let batch = vec![vec![0.0; 4], vec![0.0; 4]];
        assert!(ensure_batch_shape(&batch, 2, 4).is_ok());
        assert!(ensure_batch_shape(&batch, 3, 4).is_err());
        assert!(ensure_batch_shape(&batch, 2, 8).is_err());
    }

    #[test]
    fn test_select_embedder_preference_order() {
        // API backend without a key is skipped, hash fallback is taken
        let prefs = vec![EmbedderConfig::openrouter(), EmbedderConfig::hash()];
        let embedder = select_embedder(&prefs).unwrap();
        assert_eq!(embedder.name(), "hash");
        assert_eq!(embedder.dimension(), 384);
    }

    #[test]
    fn test_select_embedder_exhausted() {
        let prefs = vec![EmbedderConfig::openrouter()];
        let err = select_embedder(&prefs).err().unwrap();
        assert!(err.to_string().contains("no API key"));

        let err = select_embedder(&[]).err().unwrap();
        assert!(err.to_string().contains("empty preference list"));
    }

    #[test]
    fn test_select_embedder_prefers_api_with_key() {
        let mut api = EmbedderConfig::openrouter();
        api.api_key = Some("sk-test".to_string());
        let embedder = select_embedder(&[api, EmbedderConfig::hash()]).unwrap();
        assert_eq!(embedder.name(), "openrouter");
        assert_eq!(embedder.dimension(), 1536);
    }
}
