use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

use super::snapshot::{self, StoreError};

/// Prefix of the bot's query command; `/llama` and its `/l` alias both match.
pub const QUERY_TRIGGER_PREFIX: &str = "/l";

/// One recorded chat message. Immutable once recorded; removed only by a
/// whole-guild purge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub author: String,
    pub posted_at: DateTime<Utc>,
    pub channel_id: u64,
    pub guild_id: u64,
    /// Mention-normalized original content, used for command-prefix detection
    /// and as auxiliary embedding input
    pub raw_text: String,
    /// Rendered `[timestamp] - @author on #[channel]: \`text\`` line used as
    /// both the vector payload and the prompt context
    pub formatted: String,
    pub is_in_thread: bool,
}

impl ChatMessage {
    /// Render the canonical context line for a message.
    pub fn format_line(
        posted_at: DateTime<Utc>,
        author: &str,
        channel_name: &str,
        text: &str,
    ) -> String {
        let channel: String = channel_name.chars().take(15).collect();
        format!(
            "[{}] - @{} on #[{}]: `{}`",
            posted_at.format("%m-%d-%Y %H:%M:%S"),
            author,
            channel,
            text
        )
    }

    /// True when this record is a query invocation rather than chat.
    pub fn is_query_trigger(&self) -> bool {
        self.raw_text.starts_with(QUERY_TRIGGER_PREFIX)
    }
}

type GuildMessages = HashMap<u64, Vec<ChatMessage>>;

/// Per-guild message memory with snapshot-on-write persistence. The map and
/// its snapshot are guarded by one mutex so append + write form a single
/// critical section.
pub struct MessageStore {
    path: PathBuf,
    inner: Mutex<GuildMessages>,
}

impl MessageStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let inner = snapshot::load_or_init(&path)?;
        Ok(Self {
            path,
            inner: Mutex::new(inner),
        })
    }

    /// Append a message to its guild's list and persist the snapshot before
    /// returning. A persistence failure propagates: a message we cannot
    /// snapshot is a message we never recorded.
    pub fn record(&self, guild_id: u64, message: ChatMessage) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.entry(guild_id).or_default().push(message);
        snapshot::write_atomic(&self.path, &*inner)
    }

    /// Short-term context window: up to `limit - 1` of the channel's most
    /// recent messages, in chronological order. A prefix invocation records
    /// its own trigger line last and that line is dropped from the window;
    /// slash invocations produce no message event, so nothing is dropped.
    pub fn recent_for_channel(
        &self,
        guild_id: u64,
        channel_id: u64,
        limit: usize,
    ) -> Vec<ChatMessage> {
        let inner = self.inner.lock().unwrap();
        let Some(list) = inner.get(&guild_id) else {
            return Vec::new();
        };
        let in_channel: Vec<&ChatMessage> = list
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .collect();

        let end = match in_channel.last() {
            Some(last) if last.is_query_trigger() => in_channel.len() - 1,
            _ => in_channel.len(),
        };
        let start = end.saturating_sub(limit.saturating_sub(1));
        in_channel[start..end].iter().map(|m| (*m).clone()).collect()
    }

    /// True iff the guild has at least one message a query could draw on:
    /// authored by a real user and not a command invocation.
    pub fn has_user_messages(&self, guild_id: u64, bot_name: &str) -> bool {
        let inner = self.inner.lock().unwrap();
        inner
            .get(&guild_id)
            .map(|list| {
                list.iter()
                    .any(|m| m.author != bot_name && !m.raw_text.starts_with('/'))
            })
            .unwrap_or(false)
    }

    /// Drop the guild's entire list and persist.
    pub fn forget(&self, guild_id: u64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.remove(&guild_id).is_some() {
            info!("Message store: purged all messages for guild {}", guild_id);
        }
        snapshot::write_atomic(&self.path, &*inner)
    }

    #[cfg(test)]
    pub fn guild_len(&self, guild_id: u64) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.get(&guild_id).map(Vec::len).unwrap_or(0)
    }
}
