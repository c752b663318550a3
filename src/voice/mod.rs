//! Adaptive voice-signature learning
//!
//! Provides:
//! - Embedding-based voice signatures (holistic style, not word counts)
//! - Continuous learning as more samples arrive
//! - Feedback-driven refinement from "sounds like me" / "doesn't"
//! - Contrastive anchors for what the voice is NOT
//! - SQLite-backed signature persistence
//!
//! Data flow: raw samples -> chunking -> embedding backend -> learner ->
//! [`VoiceSignature`] (persisted) -> evaluator / prompt composer consume
//! it -> feedback adjuster mutates it -> re-persisted.

pub mod evaluator;
pub mod feedback;
pub mod learner;
pub mod prompt;
pub mod signature;
pub mod store;

use std::collections::HashMap;
use std::sync::Arc;

pub use evaluator::{Closer, Comparison, Evaluation, Evaluator};
pub use feedback::{FeedbackAdjuster, FeedbackOutcome};
pub use learner::{chunk_text, fingerprint, word_count, SignatureLearner, DEFAULT_CHUNK_SIZE};
pub use prompt::{compose_prompt, PromptOptions};
pub use signature::{
    clamp_threshold, ContrastVector, VoiceSignature, CONFIDENCE_CEILING, THRESHOLD_CEILING,
    THRESHOLD_FLOOR,
};
pub use store::SignatureStore;

use crate::embedding::Embedder;
use crate::error::{Result, VoiceError};

/// High-level interface for voice learning.
///
/// Owns the embedding backend, the signature store, and a per-session
/// working set of raw samples kept only for prompt exemplars; the
/// signature itself never depends on retained raw text. Mutations follow
/// load -> modify -> save; callers serialize operations per writer.
pub struct VoiceManager {
    learner: SignatureLearner,
    adjuster: FeedbackAdjuster,
    evaluator: Evaluator,
    store: SignatureStore,
    /// Raw samples seen this session, per writer (prompt exemplars only)
    session_samples: HashMap<String, Vec<String>>,
}

impl VoiceManager {
    pub fn new(embedder: Arc<dyn Embedder>, store: SignatureStore) -> Self {
        Self {
            learner: SignatureLearner::new(embedder.clone()),
            adjuster: FeedbackAdjuster::new(embedder.clone()),
            evaluator: Evaluator::new(embedder),
            store,
            session_samples: HashMap::new(),
        }
    }

    /// Override the learner's chunk size (words per embedded chunk)
    pub fn with_chunk_size(embedder: Arc<dyn Embedder>, store: SignatureStore, chunk_size: usize) -> Self {
        let mut manager = Self::new(embedder.clone(), store);
        manager.learner = SignatureLearner::with_chunk_size(embedder, chunk_size);
        manager
    }

    async fn require_signature(&self, writer_id: &str) -> Result<VoiceSignature> {
        self.store
            .load(writer_id)
            .await?
            .ok_or_else(|| VoiceError::NoSignature {
                writer_id: writer_id.to_string(),
            })
    }

    fn remember_samples(&mut self, writer_id: &str, samples: &[String]) {
        self.session_samples
            .entry(writer_id.to_string())
            .or_default()
            .extend(samples.iter().cloned());
    }

    /// Seed the session working set with exemplar texts without touching
    /// the signature (e.g. re-supplying samples in a fresh process)
    pub fn add_exemplars(&mut self, writer_id: &str, samples: Vec<String>) {
        self.remember_samples(writer_id, &samples);
    }

    /// Learn a fresh signature from initial samples and persist it
    pub async fn setup_voice(
        &mut self,
        writer_id: &str,
        samples: Vec<String>,
    ) -> Result<VoiceSignature> {
        let signature = self.learner.learn(&samples, writer_id).await?;
        self.store.save(&signature).await?;
        self.remember_samples(writer_id, &samples);
        Ok(signature)
    }

    /// Merge more samples into an existing signature (or learn fresh if
    /// none exists yet) and persist the result
    pub async fn add_samples(
        &mut self,
        writer_id: &str,
        samples: Vec<String>,
    ) -> Result<VoiceSignature> {
        let signature = match self.store.load(writer_id).await? {
            Some(existing) => self.learner.merge(&samples, &existing).await?,
            None => self.learner.learn(&samples, writer_id).await?,
        };
        self.store.save(&signature).await?;
        self.remember_samples(writer_id, &samples);
        Ok(signature)
    }

    /// Append a labeled counter-example anchor and persist
    pub async fn add_contrast(
        &mut self,
        writer_id: &str,
        texts: Vec<String>,
        label: &str,
    ) -> Result<VoiceSignature> {
        let mut signature = self.require_signature(writer_id).await?;
        self.learner.add_contrast(&mut signature, &texts, label).await?;
        self.store.save(&signature).await?;
        Ok(signature)
    }

    /// Apply one piece of user feedback and persist the adjusted signature
    pub async fn feedback(
        &mut self,
        writer_id: &str,
        text: &str,
        sounds_like_me: bool,
        strength: f64,
    ) -> Result<FeedbackOutcome> {
        let mut signature = self.require_signature(writer_id).await?;
        let outcome = self
            .adjuster
            .apply(&mut signature, text, sounds_like_me, strength)
            .await?;
        self.store.save(&signature).await?;
        Ok(outcome)
    }

    /// Score a text against the stored signature (read-only)
    pub async fn evaluate(&self, writer_id: &str, text: &str) -> Result<Evaluation> {
        let signature = self.require_signature(writer_id).await?;
        self.evaluator.evaluate(&signature, text).await
    }

    /// A/B-compare two texts against the stored signature (read-only)
    pub async fn compare(&self, writer_id: &str, text_a: &str, text_b: &str) -> Result<Comparison> {
        let signature = self.require_signature(writer_id).await?;
        self.evaluator.compare(&signature, text_a, text_b).await
    }

    /// Render the voice-conditioning prompt fragment, using this
    /// session's samples as exemplars
    pub async fn compose_prompt(&self, writer_id: &str, options: &PromptOptions) -> Result<String> {
        let signature = self.require_signature(writer_id).await?;
        let exemplars = self
            .session_samples
            .get(writer_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        Ok(compose_prompt(&signature, exemplars, options))
    }

    /// Load a stored signature, if any
    pub async fn load_voice(&self, writer_id: &str) -> Result<Option<VoiceSignature>> {
        self.store.load(writer_id).await
    }

    /// Remove a stored signature; returns whether one existed
    pub async fn delete_voice(&mut self, writer_id: &str) -> Result<bool> {
        self.session_samples.remove(writer_id);
        self.store.delete(writer_id).await
    }

    /// Writer identifiers with stored signatures
    pub async fn list_voices(&self) -> Result<Vec<String>> {
        self.store.list().await
    }
}
