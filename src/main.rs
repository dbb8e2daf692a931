// This is the entry point of the community moderation service.
//
// **Architecture Overview:**
// - `core/` = Business logic (decision rules, classifier fallback, service)
// - `infra/` = Implementations of core traits (stores, moderation API client)
// - `console/` = Line-oriented front end (submissions and moderator review)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Hand control to the console front end

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with several mod.rs files that all look the same.
#[path = "console/console_layer.rs"]
mod console;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use crate::config::AppConfig;
use crate::console::Data;
use crate::core::moderation::{
    ModerationClient, ModerationProvider, ModerationService, ModerationStore,
};
use crate::infra::moderation::{GuardianApiClient, InMemoryModerationStore, SqliteModerationStore};
use anyhow::Context;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = AppConfig::from_env();
    tracing::info!(
        api_url = %config.moderation_api_url,
        timeout_secs = config.request_timeout.as_secs(),
        durable = config.database_path.is_some(),
        "Starting moderation service"
    );

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let store: Box<dyn ModerationStore> = match &config.database_path {
        Some(path) => Box::new(
            SqliteModerationStore::new(path)
                .await
                .with_context(|| format!("Failed to open moderation database at {}", path))?,
        ),
        None => Box::new(InMemoryModerationStore::new()),
    };

    let provider: Box<dyn ModerationProvider> = Box::new(
        GuardianApiClient::new(config.moderation_api_url.clone(), config.request_timeout)
            .context("Failed to build moderation API client")?,
    );
    let client = ModerationClient::new(provider, config.request_timeout, config.allow_phrase);

    let data = Data {
        moderation: Arc::new(ModerationService::new(store, client)),
    };

    console::run(data)
        .await
        .map_err(|e| anyhow::anyhow!("Console error: {}", e))?;

    tracing::info!("Shutting down");
    Ok(())
}
