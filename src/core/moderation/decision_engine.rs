// Decision engine - maps a moderation result to a post disposition.
//
// This is the whole moderation policy. It is a pure function: no I/O, no
// store access, so policy changes never touch the client or the store.

use super::moderation_models::{BanDecision, ContentKind, ModerationResult, PostStatus};

/// Confidence above which harmful content is removed and its author banned.
pub const AUTO_REMOVE_THRESHOLD: f64 = 98.0;

/// The label the moderation service uses for harmful content.
pub const HARMFUL_LABEL: &str = "NEGATIVE";

/// Assumed when the result carries no label.
pub const DEFAULT_LABEL: &str = "POSITIVE";

/// Decide what happens to a post and its author.
///
/// Text posts are scored on `result.confidence`. Image posts are scored on
/// the nested `text_analysis.confidence`, or 0 when it is missing.
///
/// Rules, first match wins:
/// 1. harmful, confidence > 98, label `NEGATIVE` → `AutoRemove` + ban
/// 2. harmful, label `NEGATIVE` → `HumanReview`
/// 3. anything else → `Pass`
pub fn decide(result: &ModerationResult, kind: ContentKind) -> (PostStatus, BanDecision) {
    let confidence = match kind {
        ContentKind::Text => result.confidence,
        ContentKind::Image => result
            .text_analysis
            .as_ref()
            .map(|t| t.confidence)
            .unwrap_or(0.0),
    };
    let label = result.label.as_deref().unwrap_or(DEFAULT_LABEL);
    let flagged = result.is_harmful && label == HARMFUL_LABEL;

    if flagged && confidence > AUTO_REMOVE_THRESHOLD {
        (PostStatus::AutoRemove, BanDecision::Ban)
    } else if flagged {
        (PostStatus::HumanReview, BanDecision::None)
    } else {
        (PostStatus::Pass, BanDecision::None)
    }
}
