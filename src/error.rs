//! Error taxonomy for the voice-signature engine
//!
//! Every failure the core can produce is one of these variants. Nothing
//! is retried internally; retry policy belongs to the embedding backend
//! boundary, not here.

use thiserror::Error;

/// Errors surfaced by the voice-signature engine
#[derive(Debug, Error)]
pub enum VoiceError {
    /// Learning was invoked with an empty sample sequence
    #[error("no writing samples provided")]
    NoSamples,

    /// An operation that needs a signature ran before one was learned
    #[error("no voice signature exists for writer '{writer_id}'")]
    NoSignature { writer_id: String },

    /// The embedding backend was unreachable or returned malformed output
    #[error("embedding provider failed: {0}")]
    Provider(String),

    /// A vector's length disagrees with the signature's recorded dimension,
    /// e.g. after switching embedding providers mid-lifecycle
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// The persistence layer failed to load or save a signature
    #[error("signature storage error: {0}")]
    Storage(String),
}

impl VoiceError {
    /// Wrap a backend failure, preserving its message
    pub fn provider(err: impl std::fmt::Display) -> Self {
        Self::Provider(err.to_string())
    }

    /// Wrap a storage failure, preserving its message
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<rusqlite::Error> for VoiceError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for VoiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("signature record (de)serialization failed: {}", err))
    }
}

/// Convenience alias used throughout the engine
pub type Result<T> = std::result::Result<T, VoiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = VoiceError::NoSignature { writer_id: "ada".to_string() };
        assert!(e.to_string().contains("ada"));

        let e = VoiceError::DimensionMismatch { expected: 384, got: 1536 };
        assert!(e.to_string().contains("384"));
        assert!(e.to_string().contains("1536"));
    }
}
