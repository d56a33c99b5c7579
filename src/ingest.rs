//! Message ingestion. Every inbound guild message is normalized and, when the
//! guild is listening, recorded to the message store; most messages are also
//! embedded into the vector store.

use chrono::{DateTime, TimeZone, Utc};
use poise::serenity_prelude as serenity;
use tracing::{error, info};

use crate::mention::normalize_message;
use crate::store::messages::{ChatMessage, QUERY_TRIGGER_PREFIX};
use crate::vector::RecordMeta;
use crate::{Data, Error};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestAction {
    /// Not recorded at all (a command that is not the query trigger)
    Skip,
    /// Recorded in the message store only, never embedded
    StoreOnly,
    /// Recorded and embedded into the vector store
    StoreAndEmbed,
}

/// Decide what to do with a message based on its raw text. Only the bot's own
/// query trigger is stored-without-embedding (it keeps conversational
/// continuity in the store but stays out of retrieval); other slash commands
/// are dropped, and everything else (including the bot's replies) is
/// embedded. Bot-authored records are filtered out again at retrieval time.
pub fn classify(raw_text: &str) -> IngestAction {
    if raw_text.starts_with('/') {
        if raw_text.starts_with(QUERY_TRIGGER_PREFIX) {
            IngestAction::StoreOnly
        } else {
            IngestAction::Skip
        }
    } else {
        IngestAction::StoreAndEmbed
    }
}

/// The full ingest decision for one message. DMs and not-listening guilds are
/// dropped before the text is ever classified, so they never reach the
/// message store or the vector index.
pub fn ingest_action(guild_id: Option<u64>, listening: bool, raw_text: &str) -> IngestAction {
    if guild_id.is_none() || !listening {
        return IngestAction::Skip;
    }
    classify(raw_text)
}

/// Handle one inbound message event. Guilds that are not listening never
/// reach the store or the vector index.
pub async fn handle_message(
    ctx: &serenity::Context,
    data: &Data,
    message: &serenity::Message,
) -> Result<(), Error> {
    let Some(guild_id) = message.guild_id.map(|id| id.get()) else {
        return Ok(());
    };

    let raw_text = normalize_message(message);
    let action = ingest_action(
        Some(guild_id),
        data.listening.is_listening(guild_id),
        &raw_text,
    );
    if action == IngestAction::Skip {
        return Ok(());
    }

    let (channel_name, is_in_thread) = resolve_channel(ctx, message).await;
    let posted_at = message_timestamp(message);
    let author = message.author.name.clone();
    let channel_id = message.channel_id.get();
    let formatted = ChatMessage::format_line(posted_at, &author, &channel_name, &raw_text);

    info!(
        "Remembering new message \"{}\" from {} on channel {}",
        raw_text, author, channel_name
    );

    if action == IngestAction::StoreAndEmbed {
        let meta = RecordMeta {
            author: author.clone(),
            posted_at,
            channel_id,
            guild_id,
        };
        // A failed embed/insert loses one record from retrieval but must not
        // take down the event loop.
        match data.llm.embed(&formatted).await {
            Ok(embedding) => {
                if let Err(err) = data.vectors.insert(&formatted, &meta, &embedding).await {
                    error!("Vector insert failed for guild {}: {:?}", guild_id, err);
                }
            }
            Err(err) => {
                error!("Embedding failed for guild {}: {:?}", guild_id, err);
            }
        }
    }

    // Snapshot failure propagates: an unrecorded message breaks the memory
    // invariant and must surface.
    data.messages.record(
        guild_id,
        ChatMessage {
            author,
            posted_at,
            channel_id,
            guild_id,
            raw_text,
            formatted,
            is_in_thread,
        },
    )?;

    Ok(())
}

async fn resolve_channel(
    ctx: &serenity::Context,
    message: &serenity::Message,
) -> (String, bool) {
    match message.channel(ctx).await {
        Ok(serenity::Channel::Guild(channel)) => {
            let in_thread = matches!(
                channel.kind,
                serenity::ChannelType::PublicThread | serenity::ChannelType::PrivateThread
            );
            (channel.name.clone(), in_thread)
        }
        _ => ("unknown".to_string(), false),
    }
}

fn message_timestamp(message: &serenity::Message) -> DateTime<Utc> {
    Utc.timestamp_opt(message.timestamp.unix_timestamp(), 0)
        .single()
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_messages_are_embedded() {
        assert_eq!(classify("the menu is broken"), IngestAction::StoreAndEmbed);
    }

    #[test]
    fn query_trigger_is_stored_only() {
        assert_eq!(classify("/llama what broke?"), IngestAction::StoreOnly);
        assert_eq!(classify("/l what broke?"), IngestAction::StoreOnly);
    }

    #[test]
    fn other_commands_are_skipped() {
        assert_eq!(classify("/status"), IngestAction::Skip);
        assert_eq!(classify("/forget"), IngestAction::Skip);
    }

    #[test]
    fn slash_inside_text_is_not_a_command() {
        assert_eq!(classify("either/or works"), IngestAction::StoreAndEmbed);
    }

    #[test]
    fn not_listening_guilds_store_nothing() {
        assert_eq!(
            ingest_action(Some(1), false, "the menu is broken"),
            IngestAction::Skip
        );
        assert_eq!(
            ingest_action(Some(1), false, "/llama what broke?"),
            IngestAction::Skip
        );
    }

    #[test]
    fn direct_messages_store_nothing() {
        assert_eq!(ingest_action(None, true, "hello there"), IngestAction::Skip);
    }

    #[test]
    fn listening_guilds_fall_through_to_classification() {
        assert_eq!(
            ingest_action(Some(1), true, "hello there"),
            IngestAction::StoreAndEmbed
        );
        assert_eq!(
            ingest_action(Some(1), true, "/llama what broke?"),
            IngestAction::StoreOnly
        );
    }
}
