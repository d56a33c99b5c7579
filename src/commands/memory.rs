use crate::{Context, Error};
use tracing::{info, warn};

/// LlamaBot will start listening to messages in this server from now on.
#[poise::command(prefix_command, slash_command, guild_only, aliases("li"))]
pub async fn listen(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?.get();
    ctx.data().listening.set_listening(guild_id, true)?;
    info!(
        "Listening to messages on channel {} of guild {}",
        ctx.channel_id(),
        guild_id
    );
    ctx.say("Listening to your messages now.").await?;
    Ok(())
}

/// LlamaBot will stop listening to messages in this server from now on.
#[poise::command(prefix_command, slash_command, guild_only, aliases("s"))]
pub async fn stop(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?.get();
    ctx.data().listening.set_listening(guild_id, false)?;
    info!("Stopped listening to messages in guild {}", guild_id);
    ctx.say("Stopped listening to messages.").await?;
    Ok(())
}

/// LlamaBot will forget everything it remembered about this server.
#[poise::command(prefix_command, slash_command, guild_only, aliases("f"))]
pub async fn forget(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?.get();
    let data = ctx.data();

    // Local purges are persistence mutations; failures propagate. The vector
    // purge is best-effort: both sides are idempotent and can be retried by
    // running /forget again.
    data.messages.forget(guild_id)?;
    data.listening.forget(guild_id)?;
    if let Err(err) = data.vectors.purge_guild(guild_id).await {
        warn!(
            "Vector purge for guild {} failed (rerun /forget to retry): {:?}",
            guild_id, err
        );
    }

    ctx.say("All messages forgotten & stopped listening to yall")
        .await?;
    Ok(())
}

/// Status of LlamaBot, whether it's listening or not.
#[poise::command(prefix_command, slash_command, guild_only, aliases("st"))]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be run in a guild")?.get();
    let reply = if ctx.data().listening.is_listening(guild_id) {
        "Listening to yall👂"
    } else {
        "Not Listening 🙉"
    };
    ctx.say(reply).await?;
    Ok(())
}
