// =============================================================================
// GUARDIAN CLIENT - external moderation service integration
// =============================================================================
//
// Implements `ModerationProvider` over HTTP.
//
// **Endpoints:**
// - `POST {base}/moderate/text`  body `{ "text": ..., "user_id": ... }`
// - `POST {base}/moderate/image` body `{ "image": <base64>, "user_id": ... }`
//
// Both answer `{ action, result: { is_harmful, confidence, label?, text_analysis? }, summary }`.
// Any transport error, non-2xx status or body that does not parse is returned
// as a `ClassifierError`; the core client turns that into a local fallback.

use crate::core::moderation::{
    ClassifierError, ContentKind, ModerationProvider, ModerationReport, SessionId,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize)]
struct TextRequest<'a> {
    text: &'a str,
    user_id: &'a str,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    image: &'a str,
    user_id: &'a str,
}

pub struct GuardianApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl GuardianApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClassifierError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("SafeCommunity/0.1")
            .build()
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn endpoint(&self, kind: ContentKind) -> String {
        format!("{}/moderate/{}", self.base_url, kind.as_str())
    }

    /// Turn a status and raw body into a report.
    fn parse_response(status: StatusCode, body: &str) -> Result<ModerationReport, ClassifierError> {
        if !status.is_success() {
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        serde_json::from_str(body).map_err(|e| ClassifierError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl ModerationProvider for GuardianApiClient {
    async fn moderate(
        &self,
        content: &str,
        kind: ContentKind,
        owner: &SessionId,
    ) -> Result<ModerationReport, ClassifierError> {
        let request = self.client.post(self.endpoint(kind));
        let request = match kind {
            ContentKind::Text => request.json(&TextRequest {
                text: content,
                user_id: owner.as_str(),
            }),
            ContentKind::Image => request.json(&ImageRequest {
                image: content,
                user_id: owner.as_str(),
            }),
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClassifierError::Timeout(self.timeout)
            } else {
                ClassifierError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        tracing::debug!(status = %status, kind = %kind, "Moderation service responded");
        Self::parse_response(status, &body)
    }
}
