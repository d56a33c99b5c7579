pub mod qdrant;
pub mod recency;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata stored alongside each embedded message. These fields exist purely
/// for filtering and recency ranking; only the record text is prose.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordMeta {
    pub author: String,
    pub posted_at: DateTime<Utc>,
    pub channel_id: u64,
    pub guild_id: u64,
}

/// One similarity hit returned by the vector backend.
#[derive(Clone, Debug)]
pub struct ScoredRecord {
    pub text: String,
    pub meta: RecordMeta,
    pub score: f32,
}

/// Pluggable vector-search backend. Embeddings are computed by the caller so
/// the backend stays a pure storage/search concern.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    async fn insert(&self, text: &str, meta: &RecordMeta, embedding: &[f32])
        -> anyhow::Result<()>;

    /// Similarity search restricted to `guild_id`, excluding records authored
    /// by `exclude_author` (the bot's own replies).
    async fn search(
        &self,
        embedding: &[f32],
        guild_id: u64,
        exclude_author: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<ScoredRecord>>;

    /// Delete every record tagged with `guild_id`. Idempotent.
    async fn purge_guild(&self, guild_id: u64) -> anyhow::Result<()>;
}
