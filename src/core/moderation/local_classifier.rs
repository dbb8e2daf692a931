// Local fallback classifier.
//
// Used only when the moderation service cannot be reached or answers with
// something unusable. Produces the same report shape as the service. Scoring
// is a deterministic keyword heuristic: the same input always yields the same
// report, with no network and no shared state.

use super::decision_engine::{DEFAULT_LABEL, HARMFUL_LABEL};
use super::moderation_models::{ContentKind, ModerationReport, ModerationResult, TextAnalysis};

/// Score given to content with nothing suspicious in it.
const NEUTRAL_CONFIDENCE: f64 = 50.0;

/// Score given to a severe phrase hit. Above the auto-remove threshold.
const SEVERE_CONFIDENCE: f64 = 99.5;

/// Mild hits start here and add `MILD_STEP` per extra hit, capped at `MILD_CAP`.
const MILD_BASE: f64 = 60.0;
const MILD_STEP: f64 = 10.0;
const MILD_CAP: f64 = 95.0;

/// Threats and incitement. Matched as phrases on whitespace-normalized text.
const SEVERE_PHRASES: &[&str] = &[
    "i will kill you",
    "i'm going to kill you",
    "kill yourself",
    "you should die",
    "i will hurt you",
    "death to",
];

/// Insults. Matched as whole words.
const MILD_WORDS: &[&str] = &[
    "hate", "stupid", "idiot", "moron", "loser", "ugly", "dumb", "pathetic", "trash", "worthless",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClassifier;

impl LocalClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, content: &str, kind: ContentKind) -> ModerationReport {
        match kind {
            ContentKind::Text => Self::classify_text(content),
            // No OCR here: images always get the neutral result.
            ContentKind::Image => Self::neutral(kind),
        }
    }

    fn classify_text(text: &str) -> ModerationReport {
        let normalized = text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        if let Some(phrase) = SEVERE_PHRASES.iter().find(|p| normalized.contains(**p)) {
            return Self::harmful(
                SEVERE_CONFIDENCE,
                format!("Local text moderation: severe phrase \"{}\"", phrase),
            );
        }

        let hits = normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| MILD_WORDS.contains(word))
            .count();

        if hits > 0 {
            let confidence = (MILD_BASE + MILD_STEP * (hits - 1) as f64).min(MILD_CAP);
            return Self::harmful(
                confidence,
                format!("Local text moderation: {} insulting term(s)", hits),
            );
        }

        Self::neutral(ContentKind::Text)
    }

    fn harmful(confidence: f64, summary: String) -> ModerationReport {
        ModerationReport {
            action: Some("human_review".to_string()),
            result: ModerationResult {
                is_harmful: true,
                confidence,
                label: Some(HARMFUL_LABEL.to_string()),
                text_analysis: None,
            },
            summary: Some(summary),
        }
    }

    fn neutral(kind: ContentKind) -> ModerationReport {
        let text_analysis = match kind {
            ContentKind::Image => Some(TextAnalysis {
                confidence: NEUTRAL_CONFIDENCE,
            }),
            ContentKind::Text => None,
        };

        ModerationReport {
            action: Some("pass".to_string()),
            result: ModerationResult {
                is_harmful: false,
                confidence: NEUTRAL_CONFIDENCE,
                label: Some(DEFAULT_LABEL.to_string()),
                text_analysis,
            },
            summary: Some(format!("Local {} moderation result", kind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::decision_engine::decide;
    use crate::core::moderation::moderation_models::{BanDecision, PostStatus};

    #[test]
    fn test_clean_text_is_neutral() {
        let report = LocalClassifier::new().classify("this is great", ContentKind::Text);

        assert!(!report.result.is_harmful);
        assert_eq!(report.result.confidence, NEUTRAL_CONFIDENCE);
        assert_eq!(report.result.label.as_deref(), Some("POSITIVE"));
        assert!(report.result.text_analysis.is_none());
    }

    #[test]
    fn test_severe_phrase_scores_above_threshold() {
        let report = LocalClassifier::new().classify("I  WILL kill\nyou", ContentKind::Text);

        assert!(report.result.is_harmful);
        assert_eq!(report.result.confidence, SEVERE_CONFIDENCE);
        assert_eq!(
            decide(&report.result, ContentKind::Text),
            (PostStatus::AutoRemove, BanDecision::Ban)
        );
    }

    #[test]
    fn test_mild_words_scale_and_cap() {
        let classifier = LocalClassifier::new();

        let one = classifier.classify("you are stupid", ContentKind::Text);
        assert_eq!(one.result.confidence, 60.0);

        let two = classifier.classify("stupid, ugly.", ContentKind::Text);
        assert_eq!(two.result.confidence, 70.0);

        let many = classifier.classify(
            "hate stupid idiot moron loser ugly dumb",
            ContentKind::Text,
        );
        assert_eq!(many.result.confidence, MILD_CAP);
        assert_eq!(
            decide(&many.result, ContentKind::Text),
            (PostStatus::HumanReview, BanDecision::None)
        );
    }

    #[test]
    fn test_words_match_whole_words_only() {
        let report = LocalClassifier::new().classify("whatever, chateau", ContentKind::Text);
        assert!(!report.result.is_harmful);
    }

    #[test]
    fn test_image_has_text_analysis() {
        let report = LocalClassifier::new().classify("aGVsbG8=", ContentKind::Image);

        assert!(!report.result.is_harmful);
        assert_eq!(
            report.result.text_analysis,
            Some(TextAnalysis {
                confidence: NEUTRAL_CONFIDENCE
            })
        );
        assert_eq!(
            report.summary.as_deref(),
            Some("Local image moderation result")
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        let classifier = LocalClassifier::new();
        let input = "what an idiot, I hate this";
        assert_eq!(
            classifier.classify(input, ContentKind::Text),
            classifier.classify(input, ContentKind::Text)
        );
    }
}
