//! Remote embedding backends (OpenRouter / OpenAI)
//!
//! One HTTPS call per batch, never per text. Recently computed embeddings
//! are kept in an LRU cache keyed by content hash so repeated feedback or
//! evaluation rounds on the same text skip the network entirely.

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{ensure_batch_shape, Embedder, EmbedderConfig, ProviderKind};
use crate::error::{Result, VoiceError};

/// Number of cached embeddings kept per backend instance
const CACHE_ENTRIES: usize = 1000;

/// Embedding backend talking to an OpenAI-compatible embeddings endpoint
pub struct ApiEmbedder {
    config: EmbedderConfig,
    client: Client,
    /// Cache for recently computed embeddings
    cache: Arc<RwLock<lru::LruCache<String, Vec<f64>>>>,
}

impl ApiEmbedder {
    /// Create a new API-backed embedder from an explicit configuration
    pub fn new(config: EmbedderConfig) -> Result<Self> {
        if config.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(VoiceError::Provider(format!(
                "{} backend requires an API key",
                config.provider
            )));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(VoiceError::provider)?;

        let cache = Arc::new(RwLock::new(lru::LruCache::new(
            NonZeroUsize::new(CACHE_ENTRIES).expect("cache size is non-zero"),
        )));

        Ok(Self { config, client, cache })
    }

    /// Endpoint URL and request headers for the configured provider
    fn endpoint(&self) -> Result<(&'static str, Vec<(&'static str, String)>)> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| VoiceError::Provider("API key not configured".to_string()))?;

        match self.config.provider {
            ProviderKind::OpenRouter => Ok((
                "https://openrouter.ai/api/v1/embeddings",
                vec![
                    ("Authorization", format!("Bearer {}", api_key)),
                    ("Content-Type", "application/json".to_string()),
                    ("HTTP-Referer", "https://github.com/voicesig".to_string()),
                    ("X-Title", "voicesig".to_string()),
                ],
            )),
            ProviderKind::OpenAi => Ok((
                "https://api.openai.com/v1/embeddings",
                vec![
                    ("Authorization", format!("Bearer {}", api_key)),
                    ("Content-Type", "application/json".to_string()),
                ],
            )),
            ProviderKind::Hash => Err(VoiceError::Provider(
                "hash backend does not use the embeddings API".to_string(),
            )),
        }
    }

    /// Send one batch to the embeddings endpoint
    async fn embed_batch_api(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        let truncated: Vec<String> = texts.iter().map(|t| self.truncate_text(t).to_string()).collect();

        let request = EmbeddingRequest {
            model: self.config.model_name.clone(),
            input: truncated,
        };

        let (url, headers) = self.endpoint()?;
        let mut req = self.client.post(url);
        for (key, value) in headers {
            req = req.header(key, value);
        }

        let response = req
            .json(&request)
            .send()
            .await
            .map_err(|e| VoiceError::Provider(format!("failed to send embedding request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Embedding API error ({}): {}", status, error_text);
            return Err(VoiceError::Provider(format!(
                "embedding API returned {}: {}",
                status, error_text
            )));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Provider(format!("failed to parse embedding response: {}", e)))?;

        // Sort by index to maintain input order
        let mut data = result.data;
        data.sort_by_key(|d| d.index);

        let batch: Vec<Vec<f64>> = data.into_iter().map(|d| d.embedding).collect();
        ensure_batch_shape(&batch, texts.len(), self.config.embedding_dim)?;
        Ok(batch)
    }

    /// Truncate text to the model's maximum length (rough 4 chars/token)
    fn truncate_text<'a>(&self, text: &'a str) -> &'a str {
        let max_chars = self.config.max_length * 4;
        match text.char_indices().nth(max_chars) {
            Some((idx, _)) => &text[..idx],
            None => text,
        }
    }

    /// Cache key for a text
    fn cache_key(text: &str) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        format!("{:x}", hasher.finish())
    }
}

#[async_trait]
impl Embedder for ApiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        // Consult the cache first; only misses go over the wire
        let keys: Vec<String> = texts.iter().map(|t| Self::cache_key(t)).collect();
        let mut results: Vec<Option<Vec<f64>>> = vec![None; texts.len()];
        let mut misses: Vec<usize> = Vec::new();

        {
            let mut cache = self.cache.write().await;
            for (i, key) in keys.iter().enumerate() {
                match cache.get(key) {
                    Some(cached) => results[i] = Some(cached.clone()),
                    None => misses.push(i),
                }
            }
        }

        if !misses.is_empty() {
            debug!(
                "Embedding {} texts via {} ({} cached)",
                misses.len(),
                self.config.provider,
                texts.len() - misses.len()
            );

            for batch_indices in misses.chunks(self.config.batch_size) {
                let batch_texts: Vec<String> =
                    batch_indices.iter().map(|&i| texts[i].clone()).collect();
                let embeddings = self.embed_batch_api(&batch_texts).await?;

                let mut cache = self.cache.write().await;
                for (&i, embedding) in batch_indices.iter().zip(embeddings) {
                    cache.put(keys[i].clone(), embedding.clone());
                    results[i] = Some(embedding);
                }
            }
        }

        let mut out = Vec::with_capacity(results.len());
        for slot in results {
            match slot {
                Some(embedding) => out.push(embedding),
                None => {
                    return Err(VoiceError::Provider(
                        "embedding batch left an input unfilled".to_string(),
                    ))
                }
            }
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.config.embedding_dim
    }

    fn name(&self) -> &str {
        match self.config.provider {
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Hash => "hash",
        }
    }
}

/// OpenAI-style embedding request
#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

/// OpenAI-style embedding response
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f64>,
    index: i64,
}
