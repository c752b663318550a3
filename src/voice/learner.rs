//! Signature learning: chunking, fresh creation, incremental merge,
//! and contrast addition
//!
//! Samples are chunked on word boundaries, embedded in one batched call,
//! and averaged into the signature vector. The acceptance threshold is
//! calibrated from the writer's own chunks: the 10th percentile of their
//! similarities to the mean, so the bottom of the writer's genuine range
//! still just barely passes.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::embedding::{cosine_similarity, ensure_batch_shape, mean_vector, percentile, Embedder};
use crate::error::{Result, VoiceError};
use crate::voice::signature::{clamp_threshold, ContrastVector, VoiceSignature};

/// Target words per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Chunks below this word count carry too little stylistic signal
const MIN_CHUNK_WORDS: usize = 100;

/// Threshold percentile over per-chunk similarities
const THRESHOLD_PERCENTILE: f64 = 10.0;

/// Split text on word boundaries into contiguous chunks of `chunk_size`
/// words, discarding chunks under the minimum. A sample that produces no
/// viable chunk is kept whole rather than dropped.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut chunks = Vec::new();

    for window in words.chunks(chunk_size) {
        if window.len() >= MIN_CHUNK_WORDS {
            chunks.push(window.join(" "));
        }
    }

    if chunks.is_empty() {
        chunks.push(text.to_string());
    }
    chunks
}

/// Whitespace-delimited word count
pub fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// Stable content hash of a raw sample (SHA-256 truncated to 16 hex
/// chars). Dedup tracking only, not security.
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// Mean vector and calibration threshold derived from one batch of samples
struct BatchProfile {
    vector: Vec<f64>,
    threshold: f64,
    chunk_count: usize,
}

/// Builds fresh signatures and merges new samples into existing ones
pub struct SignatureLearner {
    embedder: Arc<dyn Embedder>,
    chunk_size: usize,
}

impl SignatureLearner {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the target chunk size
    pub fn with_chunk_size(embedder: Arc<dyn Embedder>, chunk_size: usize) -> Self {
        Self { embedder, chunk_size }
    }

    /// Chunk and embed a batch of samples in one provider call, then
    /// compute its mean vector and raw calibration threshold.
    async fn profile_batch(&self, samples: &[String]) -> Result<BatchProfile> {
        let mut chunks = Vec::new();
        for sample in samples {
            chunks.extend(chunk_text(sample, self.chunk_size));
        }

        debug!("Embedding {} chunks from {} samples", chunks.len(), samples.len());
        let embeddings = self.embedder.embed(&chunks).await?;
        ensure_batch_shape(&embeddings, chunks.len(), self.embedder.dimension())?;

        let vector = mean_vector(&embeddings);
        let similarities: Vec<f64> = embeddings
            .iter()
            .map(|e| cosine_similarity(e, &vector))
            .collect();
        let threshold = percentile(&similarities, THRESHOLD_PERCENTILE);

        Ok(BatchProfile {
            vector,
            threshold,
            chunk_count: chunks.len(),
        })
    }

    /// Build a fresh signature from an initial batch of samples
    pub async fn learn(&self, samples: &[String], writer_id: &str) -> Result<VoiceSignature> {
        if samples.is_empty() {
            return Err(VoiceError::NoSamples);
        }

        let profile = self.profile_batch(samples).await?;
        let sample_count = samples.len() as u64;
        let now = Utc::now();

        let signature = VoiceSignature {
            writer_id: writer_id.to_string(),
            created_at: now,
            updated_at: now,
            vector: profile.vector,
            dimension: self.embedder.dimension(),
            sample_count,
            sample_fingerprints: samples.iter().map(|s| fingerprint(s)).collect(),
            total_word_count: samples.iter().map(|s| word_count(s)).sum(),
            threshold: clamp_threshold(profile.threshold),
            // More initial samples buys more initial trust, capped below certainty
            confidence: (0.3 + 0.1 * sample_count as f64).min(0.9),
            positive_feedback_count: 0,
            negative_feedback_count: 0,
            contrast_vectors: Vec::new(),
        };

        info!(
            "Learned signature for '{}': {} samples, {} chunks, threshold {:.3}",
            writer_id, sample_count, profile.chunk_count, signature.threshold
        );
        Ok(signature)
    }

    /// Merge new samples into an existing signature.
    ///
    /// The new batch is profiled alone, then re-centered into the old
    /// vector weighted by sample counts: exact incremental re-centering,
    /// so historical raw text never needs re-embedding. The threshold
    /// only ever loosens; more evidence makes acceptance easier.
    ///
    /// Samples whose fingerprint is already recorded still count toward
    /// `sample_count` and `total_word_count`; fingerprints track what has
    /// been seen, they do not gate the arithmetic.
    pub async fn merge(
        &self,
        samples: &[String],
        existing: &VoiceSignature,
    ) -> Result<VoiceSignature> {
        if samples.is_empty() {
            return Err(VoiceError::NoSamples);
        }
        existing.check_dimension(self.embedder.dimension())?;

        let profile = self.profile_batch(samples).await?;

        let old_weight = existing.sample_count as f64;
        let new_weight = samples.len() as f64;
        let total_weight = old_weight + new_weight;

        let vector: Vec<f64> = existing
            .vector
            .iter()
            .zip(profile.vector.iter())
            .map(|(old, new)| (old * old_weight + new * new_weight) / total_weight)
            .collect();

        let mut fingerprints: BTreeSet<String> = existing.sample_fingerprints.clone();
        fingerprints.extend(samples.iter().map(|s| fingerprint(s)));

        let merged = VoiceSignature {
            writer_id: existing.writer_id.clone(),
            created_at: existing.created_at,
            updated_at: Utc::now(),
            vector,
            dimension: existing.dimension,
            sample_count: existing.sample_count + samples.len() as u64,
            sample_fingerprints: fingerprints,
            total_word_count: existing.total_word_count
                + samples.iter().map(|s| word_count(s)).sum::<u64>(),
            threshold: clamp_threshold(existing.threshold.min(profile.threshold)),
            confidence: (existing.confidence + 0.05 * new_weight).min(0.95),
            positive_feedback_count: existing.positive_feedback_count,
            negative_feedback_count: existing.negative_feedback_count,
            contrast_vectors: existing.contrast_vectors.clone(),
        };

        info!(
            "Merged {} samples into '{}': {} total, threshold {:.3}",
            samples.len(),
            merged.writer_id,
            merged.sample_count,
            merged.threshold
        );
        Ok(merged)
    }

    /// Append a labeled counter-example anchor: the mean embedding of the
    /// given texts. Purely additive; vector and threshold are untouched.
    pub async fn add_contrast(
        &self,
        signature: &mut VoiceSignature,
        texts: &[String],
        label: &str,
    ) -> Result<()> {
        if texts.is_empty() {
            return Err(VoiceError::NoSamples);
        }
        signature.check_dimension(self.embedder.dimension())?;

        let mut chunks = Vec::new();
        for text in texts {
            chunks.extend(chunk_text(text, self.chunk_size));
        }

        let embeddings = self.embedder.embed(&chunks).await?;
        ensure_batch_shape(&embeddings, chunks.len(), self.embedder.dimension())?;

        signature.contrast_vectors.push(ContrastVector {
            vector: mean_vector(&embeddings),
            label: label.to_string(),
        });
        signature.touch();

        info!(
            "Added contrast '{}' to '{}' from {} texts",
            label,
            signature.writer_id,
            texts.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_chunk_text_splits_on_word_boundaries() {
        let text = words(600);
        let chunks = chunk_text(&text, 500);
        assert_eq!(chunks.len(), 2);
        assert_eq!(word_count(&chunks[0]), 500);
        assert_eq!(word_count(&chunks[1]), 100);
    }

    #[test]
    fn test_chunk_text_discards_short_tail() {
        // 550 words: 500-word chunk plus a 50-word tail below the minimum
        let chunks = chunk_text(&words(550), 500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(word_count(&chunks[0]), 500);
    }

    #[test]
    fn test_chunk_text_never_drops_a_sample() {
        let text = words(40);
        let chunks = chunk_text(&text, 500);
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn test_chunk_text_deterministic() {
        let text = words(1234);
        assert_eq!(chunk_text(&text, 500), chunk_text(&text, 500));
    }

    #[test]
    fn test_fingerprint_stable() {
        let a = fingerprint("the same text");
        let b = fingerprint("the same text");
        let c = fingerprint("different text");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("one  two\nthree"), 3);
        assert_eq!(word_count(""), 0);
    }
}
