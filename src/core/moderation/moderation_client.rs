// Moderation client - gets a harm assessment for a piece of content.
//
// Wraps a `ModerationProvider` (the external service) with:
// - an allow-phrase override checked before any network I/O
// - a hard timeout around the provider call
// - a fallback to the local classifier on any provider failure
//
// `classify` never fails. Provider errors are logged and swallowed.

use super::decision_engine::DEFAULT_LABEL;
use super::local_classifier::LocalClassifier;
use super::moderation_models::{ContentKind, ModerationReport, ModerationResult, SessionId};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Moderation request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Moderation service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed moderation response: {0}")]
    Malformed(String),
}

/// Port for the external moderation service.
#[async_trait]
pub trait ModerationProvider: Send + Sync {
    async fn moderate(
        &self,
        content: &str,
        kind: ContentKind,
        owner: &SessionId,
    ) -> Result<ModerationReport, ClassifierError>;
}

// Lets the composition root pick a provider at runtime.
#[async_trait]
impl ModerationProvider for Box<dyn ModerationProvider> {
    async fn moderate(
        &self,
        content: &str,
        kind: ContentKind,
        owner: &SessionId,
    ) -> Result<ModerationReport, ClassifierError> {
        (**self).moderate(content, kind, owner).await
    }
}

pub struct ModerationClient<P: ModerationProvider> {
    provider: P,
    fallback: LocalClassifier,
    timeout: Duration,
    /// `None` disables the override.
    allow_phrase: Option<String>,
}

impl<P: ModerationProvider> ModerationClient<P> {
    pub fn new(provider: P, timeout: Duration, allow_phrase: Option<String>) -> Self {
        let allow_phrase = allow_phrase
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        Self {
            provider,
            fallback: LocalClassifier::new(),
            timeout,
            allow_phrase,
        }
    }

    pub async fn classify(
        &self,
        content: &str,
        kind: ContentKind,
        owner: &SessionId,
    ) -> ModerationReport {
        if let Some(report) = self.allow_phrase_override(content, kind) {
            tracing::info!(owner = %owner, "Allow phrase matched, skipping moderation service");
            return report;
        }

        let outcome = match tokio::time::timeout(
            self.timeout,
            self.provider.moderate(content, kind, owner),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ClassifierError::Timeout(self.timeout)),
        };

        let outcome = outcome.and_then(|report| {
            if report.result.scores_in_range() {
                Ok(report)
            } else {
                Err(ClassifierError::Malformed(format!(
                    "confidence out of range: {:?}",
                    report.result
                )))
            }
        });

        match outcome {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(
                    owner = %owner,
                    kind = %kind,
                    error = %e,
                    "Moderation service failed, using local classifier"
                );
                self.fallback.classify(content, kind)
            }
        }
    }

    fn allow_phrase_override(&self, content: &str, kind: ContentKind) -> Option<ModerationReport> {
        let phrase = self.allow_phrase.as_deref()?;
        if kind != ContentKind::Text || !content.to_lowercase().contains(&phrase.to_lowercase()) {
            return None;
        }

        Some(ModerationReport {
            action: Some("pass".to_string()),
            result: ModerationResult {
                is_harmful: false,
                confidence: 50.0,
                label: Some(DEFAULT_LABEL.to_string()),
                text_analysis: None,
            },
            summary: Some(format!("Approved due to {}", phrase)),
        })
    }
}
