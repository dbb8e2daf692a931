// Runtime configuration, read from the environment (and `.env` via dotenv).

use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://guardianai-app-146374580513.us-central1.run.app";
pub const DEFAULT_ALLOW_PHRASE: &str = "GDG Solution Challenge 2025";

/// The moderation service call is bounded to this range.
const MIN_TIMEOUT_SECS: u64 = 5;
const MAX_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub moderation_api_url: String,
    pub request_timeout: Duration,
    /// `None` disables the allow-phrase override.
    pub allow_phrase: Option<String>,
    /// SQLite file to use instead of the in-memory store.
    pub database_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            moderation_api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(MAX_TIMEOUT_SECS),
            allow_phrase: Some(DEFAULT_ALLOW_PHRASE.to_string()),
            database_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Kept separate from `from_env` so
    /// tests don't have to mutate the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let moderation_api_url = lookup("MODERATION_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.moderation_api_url);

        let timeout_secs = match lookup("MODERATION_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Invalid MODERATION_TIMEOUT_SECS, using default");
                MAX_TIMEOUT_SECS
            }),
            None => MAX_TIMEOUT_SECS,
        };
        let clamped = timeout_secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS);
        if clamped != timeout_secs {
            tracing::warn!(
                requested = timeout_secs,
                used = clamped,
                "MODERATION_TIMEOUT_SECS out of range"
            );
        }

        // Present but empty means "disabled".
        let allow_phrase = match lookup("MODERATION_ALLOW_PHRASE") {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v),
            None => defaults.allow_phrase,
        };

        let database_path = lookup("MODERATION_DB_PATH").filter(|v| !v.trim().is_empty());

        Self {
            moderation_api_url,
            request_timeout: Duration::from_secs(clamped),
            allow_phrase,
            database_path,
        }
    }
}
