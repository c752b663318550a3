//! voicesig - Adaptive Voice-Signature Learning Library
//!
//! Learns a holistic "voice signature" for a writer from sample texts,
//! represented as a point in a semantic embedding space, and refines it
//! over time with:
//! - Incremental merges as more samples arrive
//! - "Sounds like me" / "doesn't sound like me" feedback adjustment
//! - Contrastive counter-examples (e.g. "this sounds AI-generated")
//! - Evaluation of arbitrary text against the learned voice
//! - A prompt fragment that conditions downstream generation
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use voicesig::embedding::HashEmbedder;
//! use voicesig::voice::{SignatureStore, VoiceManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let embedder = Arc::new(HashEmbedder::default());
//!     let store = SignatureStore::new("voices.db").await?;
//!     let mut manager = VoiceManager::new(embedder, store);
//!
//!     let signature = manager.setup_voice("ada", samples).await?;
//!     let verdict = manager.evaluate("ada", "Some new draft...").await?;
//!     println!("sounds like ada: {}", verdict.sounds_like_me);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod voice;

// Re-export commonly used types for convenience
pub use config::VoiceConfig;

pub use embedding::{
    cosine_similarity, select_embedder, ApiEmbedder, Embedder, EmbedderConfig, HashEmbedder,
    ProviderKind,
};

pub use error::VoiceError;

pub use voice::{
    compose_prompt, Comparison, Evaluation, Evaluator, FeedbackAdjuster, FeedbackOutcome,
    PromptOptions, SignatureLearner, SignatureStore, VoiceManager, VoiceSignature,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get the library info
pub fn info() -> String {
    format!("{} v{} - Adaptive Voice-Signature Learning", NAME, VERSION)
}
