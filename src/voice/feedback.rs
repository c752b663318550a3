//! Online feedback adjustment
//!
//! A single "sounds like me" / "doesn't sound like me" judgment nudges
//! the signature vector toward or away from the judged text. The learning
//! rate is small enough that no single event can dominate a signature
//! built from hundreds of chunks. The threshold moves only when the
//! feedback disagrees with what the current threshold would have
//! predicted: error-driven calibration, not unconditional drift.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::embedding::{cosine_similarity, ensure_batch_shape, Embedder};
use crate::error::Result;
use crate::voice::signature::{
    VoiceSignature, CONFIDENCE_CEILING, THRESHOLD_CEILING, THRESHOLD_FLOOR,
};

/// Fraction of the gap the vector drifts per feedback event
const LEARNING_RATE: f64 = 0.01;

/// Threshold correction per miscalibrated feedback event
const THRESHOLD_STEP: f64 = 0.02;

/// Feedback events required before confidence starts accruing
const CONFIDENCE_WARMUP: u64 = 5;

/// Signature state after one feedback event
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackOutcome {
    /// Cosine similarity of the judged text to the signature before the update
    pub similarity: f64,
    pub threshold: f64,
    pub confidence: f64,
    pub positive_feedback_count: u64,
    pub negative_feedback_count: u64,
}

/// Applies single-event feedback updates to a signature
pub struct FeedbackAdjuster {
    embedder: Arc<dyn Embedder>,
}

impl FeedbackAdjuster {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Apply one piece of feedback on one text.
    ///
    /// `strength` in `(0, 1]` scales both the vector drift and any
    /// threshold correction; values outside that range are clamped.
    pub async fn apply(
        &self,
        signature: &mut VoiceSignature,
        text: &str,
        sounds_like_me: bool,
        strength: f64,
    ) -> Result<FeedbackOutcome> {
        signature.check_dimension(self.embedder.dimension())?;
        let strength = strength.clamp(0.0, 1.0);

        let batch = self.embedder.embed(std::slice::from_ref(&text.to_string())).await?;
        ensure_batch_shape(&batch, 1, self.embedder.dimension())?;
        let embedding = &batch[0];

        let similarity = cosine_similarity(embedding, &signature.vector);
        let rate = strength * LEARNING_RATE;

        if sounds_like_me {
            signature.positive_feedback_count += 1;

            // Pull the signature slightly toward this example
            for (v, e) in signature.vector.iter_mut().zip(embedding.iter()) {
                *v += rate * (e - *v);
            }

            // The evaluator would have wrongly rejected it: loosen
            if similarity < signature.threshold {
                signature.threshold =
                    (signature.threshold - THRESHOLD_STEP * strength).max(THRESHOLD_FLOOR);
            }
        } else {
            signature.negative_feedback_count += 1;

            // Push the signature slightly away from this example
            for (v, e) in signature.vector.iter_mut().zip(embedding.iter()) {
                *v += rate * (*v - e);
            }

            // The evaluator would have wrongly accepted it: tighten
            if similarity >= signature.threshold {
                signature.threshold =
                    (signature.threshold + THRESHOLD_STEP * strength).min(THRESHOLD_CEILING);
            }
        }

        if signature.feedback_total() > CONFIDENCE_WARMUP {
            signature.confidence = (signature.confidence + 0.01).min(CONFIDENCE_CEILING);
        }

        signature.touch();

        debug!(
            "Feedback on '{}': sounds_like_me={}, similarity={:.3}, threshold={:.3}",
            signature.writer_id, sounds_like_me, similarity, signature.threshold
        );

        Ok(FeedbackOutcome {
            similarity,
            threshold: signature.threshold,
            confidence: signature.confidence,
            positive_feedback_count: signature.positive_feedback_count,
            negative_feedback_count: signature.negative_feedback_count,
        })
    }
}
