use crate::config::DISCORD_MESSAGE_LIMIT;
use crate::query::{self, QueryGate, GENERIC_ERROR_REPLY};
use crate::{Context, Error};
use tracing::error;

/// LlamaBot will answer your query from what it heard in this server.
#[poise::command(prefix_command, slash_command, guild_only, aliases("l"))]
pub async fn llama(
    ctx: Context<'_>,
    #[rest]
    #[description = "Your question"]
    query: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?.get();
    let data = ctx.data();
    let query = query.unwrap_or_default();

    let gate = query::gate(data.listening.is_listening(guild_id), &query, || {
        data.messages.has_user_messages(guild_id, &data.bot_name)
    });
    if let Some(reply) = gate.reply() {
        ctx.reply(reply).await?;
        return Ok(());
    }
    debug_assert_eq!(gate, QueryGate::Ready);

    ctx.defer().await?;

    let asking_user = ctx.author().name.clone();
    let channel_id = ctx.channel_id().get();

    match query::answer(data, guild_id, channel_id, &asking_user, query.trim()).await {
        Ok(answer) => {
            ctx.reply(truncate_reply(answer)).await?;
        }
        Err(err) => {
            // Failure is isolated to this invocation; the bot keeps serving.
            error!("Query handling failed in guild {}: {:?}", guild_id, err);
            ctx.reply(GENERIC_ERROR_REPLY).await?;
        }
    }

    Ok(())
}

/// Clamp a reply to Discord's message limit on a char boundary.
fn truncate_reply(mut text: String) -> String {
    if text.len() <= DISCORD_MESSAGE_LIMIT {
        return text;
    }
    // Leave room for the 3-byte ellipsis
    let mut cut = DISCORD_MESSAGE_LIMIT - 3;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text.push('…');
    text
}
