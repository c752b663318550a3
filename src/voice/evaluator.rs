//! Evaluation of arbitrary text against a signature
//!
//! Raw cosine similarity to the signature vector, penalized by the
//! strongest resemblance to any contrast anchor: text can sound like the
//! writer and still fail because it also sounds like the thing the
//! writer wants to avoid. Read-only; never mutates the signature.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::embedding::{cosine_similarity, ensure_batch_shape, Embedder};
use crate::error::Result;
use crate::voice::signature::VoiceSignature;

/// Weight of the strongest contrast resemblance in the adjusted score
const CONTRAST_PENALTY: f64 = 0.3;

/// Result of evaluating one text against a signature
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    /// Raw cosine similarity to the signature vector
    pub similarity: f64,
    /// Similarity minus the contrast penalty
    pub adjusted_similarity: f64,
    pub sounds_like_me: bool,
    pub threshold: f64,
    pub confidence: f64,
    /// Per-label similarity to each contrast anchor (lower = better)
    pub contrast_scores: BTreeMap<String, f64>,
}

/// Which of two texts sits closer to the voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Closer {
    A,
    B,
}

impl std::fmt::Display for Closer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Closer::A => write!(f, "a"),
            Closer::B => write!(f, "b"),
        }
    }
}

/// A/B comparison of two texts against the same signature
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub text_a_similarity: f64,
    pub text_b_similarity: f64,
    pub closer_to_voice: Closer,
    pub difference: f64,
}

/// Scores text against a signature without mutating it
pub struct Evaluator {
    embedder: Arc<dyn Embedder>,
}

impl Evaluator {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Score one text against the signature
    pub async fn evaluate(&self, signature: &VoiceSignature, text: &str) -> Result<Evaluation> {
        signature.check_dimension(self.embedder.dimension())?;

        let batch = self.embedder.embed(std::slice::from_ref(&text.to_string())).await?;
        ensure_batch_shape(&batch, 1, self.embedder.dimension())?;
        let embedding = &batch[0];

        let similarity = cosine_similarity(embedding, &signature.vector);

        let mut contrast_scores = BTreeMap::new();
        for contrast in &signature.contrast_vectors {
            contrast_scores.insert(
                contrast.label.clone(),
                cosine_similarity(embedding, &contrast.vector),
            );
        }

        let max_contrast = contrast_scores
            .values()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let adjusted_similarity = if contrast_scores.is_empty() {
            similarity
        } else {
            similarity - CONTRAST_PENALTY * max_contrast
        };

        Ok(Evaluation {
            similarity,
            adjusted_similarity,
            sounds_like_me: adjusted_similarity >= signature.threshold,
            threshold: signature.threshold,
            confidence: signature.confidence,
            contrast_scores,
        })
    }

    /// Evaluate two texts independently and report which one sits closer
    /// to the voice by raw similarity
    pub async fn compare(
        &self,
        signature: &VoiceSignature,
        text_a: &str,
        text_b: &str,
    ) -> Result<Comparison> {
        let eval_a = self.evaluate(signature, text_a).await?;
        let eval_b = self.evaluate(signature, text_b).await?;

        Ok(Comparison {
            text_a_similarity: eval_a.similarity,
            text_b_similarity: eval_b.similarity,
            closer_to_voice: if eval_a.similarity > eval_b.similarity {
                Closer::A
            } else {
                Closer::B
            },
            difference: (eval_a.similarity - eval_b.similarity).abs(),
        })
    }
}
