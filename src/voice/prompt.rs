//! Prompt composition
//!
//! Renders a signature's state into a structured text block that
//! conditions a downstream generator. Purely formatting: the only
//! branches are whether contrast labels exist, whether exemplars were
//! requested and are available, and whether any feedback was recorded.

use crate::voice::learner::word_count;
use crate::voice::signature::VoiceSignature;

/// Words kept from each exemplar excerpt
const EXCERPT_WORDS: usize = 400;

/// Options controlling prompt rendering
#[derive(Debug, Clone)]
pub struct PromptOptions {
    /// Include verbatim excerpts of stored samples
    pub include_exemplars: bool,
    /// Maximum number of exemplars to include
    pub max_exemplars: usize,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            include_exemplars: true,
            max_exemplars: 3,
        }
    }
}

/// Render the signature (and optionally session exemplars) into a
/// voice-conditioning prompt fragment. Deterministic and side-effect
/// free: same inputs, same output.
pub fn compose_prompt(
    signature: &VoiceSignature,
    exemplars: &[String],
    options: &PromptOptions,
) -> String {
    let mut parts = Vec::new();

    parts.push(format!(
        "## VOICE SIGNATURE\n\n\
         You are writing in a specific person's voice. This voice was learned from \
         {} samples ({} words total).\n\n\
         The voice signature has a confidence level of {:.0}%.\n\
         Similarity threshold: {:.2}\n\n\
         When generating text, match the FEEL and RHYTHM of this writing, not just \
         surface features like word choice.",
        signature.sample_count,
        signature.total_word_count,
        signature.confidence * 100.0,
        signature.threshold,
    ));

    let labels = signature.contrast_labels();
    if !labels.is_empty() {
        parts.push(format!(
            "## WHAT THIS VOICE IS NOT\n\n\
             This voice has been contrasted against:\n{}\n\n\
             Actively avoid characteristics of these contrast categories.",
            labels.join(", "),
        ));
    }

    if options.include_exemplars && !exemplars.is_empty() {
        let mut section = String::from(
            "## VOICE EXEMPLARS\n\n\
             Study these examples carefully. Match their:\n\
             - Sentence rhythm and variation\n\
             - Level of formality and directness\n\
             - Way of making claims and hedging\n\
             - Authorial presence (I/we usage)\n",
        );
        for (i, sample) in exemplars.iter().take(options.max_exemplars).enumerate() {
            section.push_str(&format!("\n### Example {}:\n{}\n", i + 1, excerpt(sample)));
        }
        parts.push(section);
    }

    if signature.feedback_total() > 0 {
        parts.push(format!(
            "## LEARNED FROM FEEDBACK\n\n\
             This voice profile has been refined through {} feedback instances \
             ({} approvals, {} rejections). Trust the examples and constraints; \
             they reflect what the author actually approves.",
            signature.feedback_total(),
            signature.positive_feedback_count,
            signature.negative_feedback_count,
        ));
    }

    parts.join("\n\n")
}

/// First `EXCERPT_WORDS` words of a sample
fn excerpt(sample: &str) -> String {
    if word_count(sample) <= EXCERPT_WORDS as u64 {
        return sample.trim().to_string();
    }
    sample
        .split_whitespace()
        .take(EXCERPT_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::signature::ContrastVector;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn signature() -> VoiceSignature {
        VoiceSignature {
            writer_id: "ada".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            vector: vec![0.0; 4],
            dimension: 4,
            sample_count: 3,
            sample_fingerprints: BTreeSet::new(),
            total_word_count: 1800,
            threshold: 0.62,
            confidence: 0.6,
            positive_feedback_count: 0,
            negative_feedback_count: 0,
            contrast_vectors: vec![],
        }
    }

    #[test]
    fn test_base_prompt_sections() {
        let prompt = compose_prompt(&signature(), &[], &PromptOptions::default());
        assert!(prompt.contains("## VOICE SIGNATURE"));
        assert!(prompt.contains("3 samples"));
        assert!(prompt.contains("1800 words"));
        assert!(prompt.contains("60%"));
        assert!(prompt.contains("0.62"));
        // No contrasts, no feedback, no exemplars supplied
        assert!(!prompt.contains("## WHAT THIS VOICE IS NOT"));
        assert!(!prompt.contains("## VOICE EXEMPLARS"));
        assert!(!prompt.contains("## LEARNED FROM FEEDBACK"));
    }

    #[test]
    fn test_contrast_section() {
        let mut sig = signature();
        sig.contrast_vectors.push(ContrastVector {
            vector: vec![0.0; 4],
            label: "ai_generated".to_string(),
        });
        let prompt = compose_prompt(&sig, &[], &PromptOptions::default());
        assert!(prompt.contains("## WHAT THIS VOICE IS NOT"));
        assert!(prompt.contains("ai_generated"));
    }

    #[test]
    fn test_exemplar_section_respects_options() {
        let exemplars = vec![
            "first sample text".to_string(),
            "second sample text".to_string(),
            "third sample text".to_string(),
        ];

        let prompt = compose_prompt(
            &signature(),
            &exemplars,
            &PromptOptions { include_exemplars: true, max_exemplars: 2 },
        );
        assert!(prompt.contains("### Example 1:"));
        assert!(prompt.contains("### Example 2:"));
        assert!(!prompt.contains("### Example 3:"));

        let prompt = compose_prompt(
            &signature(),
            &exemplars,
            &PromptOptions { include_exemplars: false, max_exemplars: 3 },
        );
        assert!(!prompt.contains("## VOICE EXEMPLARS"));
    }

    #[test]
    fn test_feedback_section() {
        let mut sig = signature();
        sig.positive_feedback_count = 4;
        sig.negative_feedback_count = 2;
        let prompt = compose_prompt(&sig, &[], &PromptOptions::default());
        assert!(prompt.contains("## LEARNED FROM FEEDBACK"));
        assert!(prompt.contains("6 feedback instances"));
        assert!(prompt.contains("4 approvals"));
    }

    #[test]
    fn test_excerpt_truncates_long_samples() {
        let long: String = (0..500).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let cut = excerpt(&long);
        assert_eq!(word_count(&cut), EXCERPT_WORDS as u64);
        assert_eq!(excerpt("short sample"), "short sample");
    }

    #[test]
    fn test_deterministic() {
        let sig = signature();
        let a = compose_prompt(&sig, &[], &PromptOptions::default());
        let b = compose_prompt(&sig, &[], &PromptOptions::default());
        assert_eq!(a, b);
    }
}
