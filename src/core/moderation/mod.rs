// Core moderation module - contains the content moderation business logic.
// Leaves first: models, then the pure policy and fallback classifier, then
// the client and the service that tie them to the store.

pub mod decision_engine;
pub mod local_classifier;
pub mod moderation_client;
pub mod moderation_models;
pub mod moderation_service;

pub use decision_engine::decide;
pub use local_classifier::LocalClassifier;
pub use moderation_client::*;
pub use moderation_models::*;
pub use moderation_service::*;
