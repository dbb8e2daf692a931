// Implementations for the moderation system.

pub mod guardian_client;
pub mod in_memory;
pub mod sqlite_store;

// Re-export for convenience
pub use guardian_client::GuardianApiClient;
pub use in_memory::InMemoryModerationStore;
pub use sqlite_store::SqliteModerationStore;
