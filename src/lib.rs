pub mod commands;
pub mod config;
pub mod ingest;
pub mod llm;
pub mod mention;
pub mod prompt;
pub mod query;
pub mod store;
pub mod vector;

use std::sync::Arc;

/// Custom data passed to all commands
pub struct Data {
    pub config: config::Config,
    pub messages: store::messages::MessageStore,
    pub listening: store::listening::ListeningFlags,
    pub vectors: Arc<dyn vector::VectorSearch>,
    pub llm: llm::LlmClient,
    /// Bot's own user ID, used to strip self-mentions
    pub bot_id: u64,
    /// Bot's display name, used in the prompt and as the retrieval author filter
    pub bot_name: String,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
