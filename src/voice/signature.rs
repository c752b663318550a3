//! The persisted voice signature
//!
//! One record per writer: a mean embedding plus the calibration state
//! (threshold, confidence, feedback tallies, contrast anchors) learned
//! around it. This is the sole unit of persistence; everything else in
//! the engine either builds one, mutates one, or reads one.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VoiceError};

/// Lowest acceptance threshold a signature may reach
pub const THRESHOLD_FLOOR: f64 = 0.3;

/// Highest acceptance threshold a signature may reach
pub const THRESHOLD_CEILING: f64 = 0.95;

/// Confidence cap after feedback refinement
pub const CONFIDENCE_CEILING: f64 = 0.98;

/// A labeled counter-example anchor: the mean embedding of texts the
/// writer's voice should NOT resemble (e.g. "ai_generated")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContrastVector {
    pub vector: Vec<f64>,
    pub label: String,
}

/// A learned voice signature capturing writing style holistically.
///
/// Unlike a statistical profile that counts words, this is a dense vector
/// representation of the "feel" of the writing, refined over time by
/// merges, feedback, and contrast anchors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSignature {
    /// Opaque writer identifier, immutable after creation
    pub writer_id: String,
    pub created_at: DateTime<Utc>,
    /// Advances on every mutation
    pub updated_at: DateTime<Utc>,

    /// Mean embedding of all absorbed sample chunks
    pub vector: Vec<f64>,
    /// Embedding dimension, fixed at creation from the provider in use
    pub dimension: usize,

    /// Number of raw samples absorbed; weight used in merge arithmetic
    pub sample_count: u64,
    /// Content hashes of absorbed samples, for dedup tracking (set union
    /// across merges, not re-count protection)
    pub sample_fingerprints: BTreeSet<String>,
    pub total_word_count: u64,

    /// Minimum adjusted similarity for text to sound like this writer,
    /// always within `[THRESHOLD_FLOOR, THRESHOLD_CEILING]`
    pub threshold: f64,
    /// Accumulated-evidence scalar in `[0, CONFIDENCE_CEILING]`, never
    /// decreases across operations
    pub confidence: f64,

    pub positive_feedback_count: u64,
    pub negative_feedback_count: u64,

    /// Labeled counter-example anchors, append-only
    pub contrast_vectors: Vec<ContrastVector>,
}

impl VoiceSignature {
    /// Fail unless `len` matches this signature's recorded dimension
    pub fn check_dimension(&self, len: usize) -> Result<()> {
        if len != self.dimension {
            return Err(VoiceError::DimensionMismatch {
                expected: self.dimension,
                got: len,
            });
        }
        Ok(())
    }

    /// Total feedback events recorded so far
    pub fn feedback_total(&self) -> u64 {
        self.positive_feedback_count + self.negative_feedback_count
    }

    /// Distinct contrast labels, in first-seen order
    pub fn contrast_labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for contrast in &self.contrast_vectors {
            if !labels.contains(&contrast.label.as_str()) {
                labels.push(&contrast.label);
            }
        }
        labels
    }

    /// Mark the signature as mutated
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Clamp a raw threshold into the legal acceptance range
pub fn clamp_threshold(threshold: f64) -> f64 {
    threshold.clamp(THRESHOLD_FLOOR, THRESHOLD_CEILING)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_signature() -> VoiceSignature {
        VoiceSignature {
            writer_id: "ada".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            vector: vec![0.5; 8],
            dimension: 8,
            sample_count: 2,
            sample_fingerprints: BTreeSet::from(["abc123".to_string()]),
            total_word_count: 1200,
            threshold: 0.6,
            confidence: 0.5,
            positive_feedback_count: 0,
            negative_feedback_count: 0,
            contrast_vectors: vec![],
        }
    }

    #[test]
    fn test_clamp_threshold() {
        assert_eq!(clamp_threshold(0.1), THRESHOLD_FLOOR);
        assert_eq!(clamp_threshold(0.99), THRESHOLD_CEILING);
        assert_eq!(clamp_threshold(0.5), 0.5);
    }

    #[test]
    fn test_check_dimension() {
        let sig = sample_signature();
        assert!(sig.check_dimension(8).is_ok());
        let err = sig.check_dimension(16).unwrap_err();
        assert!(matches!(
            err,
            VoiceError::DimensionMismatch { expected: 8, got: 16 }
        ));
    }

    #[test]
    fn test_contrast_labels_dedup_in_order() {
        let mut sig = sample_signature();
        for label in ["ai_generated", "generic_academic", "ai_generated"] {
            sig.contrast_vectors.push(ContrastVector {
                vector: vec![0.0; 8],
                label: label.to_string(),
            });
        }
        assert_eq!(sig.contrast_labels(), vec!["ai_generated", "generic_academic"]);
    }

    #[test]
    fn test_serde_round_trip() {
        let sig = sample_signature();
        let json = serde_json::to_string(&sig).unwrap();
        let back: VoiceSignature = serde_json::from_str(&json).unwrap();

        assert_eq!(back.writer_id, sig.writer_id);
        assert_eq!(back.vector, sig.vector);
        assert_eq!(back.dimension, sig.dimension);
        assert_eq!(back.sample_fingerprints, sig.sample_fingerprints);
        assert_eq!(back.threshold, sig.threshold);
        // Timestamps survive as RFC-3339 strings
        assert_eq!(back.created_at, sig.created_at);
    }
}
