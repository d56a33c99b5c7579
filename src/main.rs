use llamabot::commands::{llama, memory};
use llamabot::config::Config;
use llamabot::llm::LlmClient;
use llamabot::store::listening::ListeningFlags;
use llamabot::store::messages::MessageStore;
use llamabot::vector::qdrant::QdrantStore;
use llamabot::vector::VectorSearch;
use llamabot::Data;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let discord_token = config.discord_token.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                memory::listen(),
                memory::stop(),
                memory::forget(),
                memory::status(),
                llama::llama(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("/".to_string()),
                ..Default::default()
            },
            event_handler: |ctx, event, _framework, data| {
                Box::pin(async move {
                    if let serenity::FullEvent::Message { new_message } = event {
                        llamabot::ingest::handle_message(ctx, data, new_message).await?;
                    }
                    Ok(())
                })
            },
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("User: {} (ID: {})", ready.user.name, ready.user.id);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                ctx.set_activity(Some(serenity::ActivityData::custom(
                    config.status_message.clone(),
                )));

                // Startup-time snapshot failures are fatal.
                let messages = MessageStore::load(config.persist_dir.join("messages.json"))?;
                let listening = ListeningFlags::load(config.persist_dir.join("listening.json"))?;
                let vectors: Arc<dyn VectorSearch> = Arc::new(QdrantStore::new(&config)?);
                let llm = LlmClient::new(&config);

                let bot_id = ready.user.id.get();
                let bot_name = ready.user.name.clone();

                Ok(Data {
                    config,
                    messages,
                    listening,
                    vectors,
                    llm,
                    bot_id,
                    bot_name,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MESSAGES;

    let mut client = serenity::ClientBuilder::new(&discord_token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    info!("Starting bot...");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}
