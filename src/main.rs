use std::env;
use std::sync::Arc;

use poise::serenity_prelude as serenity;
use serenity::{Client, GatewayIntents};

mod cache;
mod coc;
mod commands;
mod components;
mod cycle;
mod events;
mod languages;
mod storage;
mod telemetry;
mod utils;

use commands::{clans, debug, lookup_clan_tag, ping, track, untrack};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

// Shared state, accessible in all command invocations and event handlers
pub struct Data {
    pub storage: Arc<storage::ClanStorage>,
    pub coc: Arc<coc::CocClient>,
    pub cycles: Arc<cache::CycleCache>,
    pub components: components::ComponentRegistry,
    pub telemetry: telemetry::Telemetry,
}

/// Inhibitor: drop invocations from outside guilds or from blacklisted sources
fn command_allowed(ctx: &Context<'_>) -> bool {
    let Some(guild_id) = ctx.guild_id() else {
        return false;
    };
    if utils::is_blacklisted_guild(guild_id) || utils::is_blacklisted_user(ctx.author().id) {
        log::debug!(
            "Inhibited command {} from blacklisted source ({})",
            ctx.command().qualified_name,
            ctx.author().name
        );
        return false;
    }
    true
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    // This is our global error handler
    match error {
        poise::FrameworkError::Setup { error, .. } => panic!("Failed to start bot: {:?}", error),
        poise::FrameworkError::Command { error, ctx, .. } => {
            telemetry::command_errored(&ctx, &error).await;
        }
        // Inhibited invocations are dropped without a reply
        poise::FrameworkError::CommandCheckFailed { error: None, .. } => {}
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                log::error!("Error while handling error: {}", e);
            }
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logger
    env_logger::init();

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let token = env::var("DISCORD_TOKEN")
        .expect("Expected a Discord bot token in the environment variable DISCORD_TOKEN");
    let coc_token = env::var("COC_API_TOKEN")
        .expect("Expected a Clash of Clans API token in the environment variable COC_API_TOKEN");
    let coc_base = env::var("COC_API_BASE").unwrap_or_else(|_| coc::DEFAULT_API_BASE.to_string());

    let storage = Arc::new(storage::ClanStorage::from_env());
    let coc_client =
        Arc::new(coc::CocClient::new(coc_token, coc_base).expect("Error creating the API client"));
    let cycles = Arc::new(cache::CycleCache::default());

    // Everything the bot does is interaction-driven
    let intents = GatewayIntents::GUILDS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                ping(),
                debug(),
                track(),
                untrack(),
                clans(),
                lookup_clan_tag(),
            ],
            on_error: |error| Box::pin(on_error(error)),
            pre_command: |ctx| {
                Box::pin(async move {
                    telemetry::command_started(&ctx);
                })
            },
            command_check: Some(|ctx| Box::pin(async move { Ok(command_allowed(&ctx)) })),
            event_handler: |ctx, event, framework, data| {
                Box::pin(events::handle(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                log::info!("Logged in as {}", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                cycle::start(storage.clone(), coc_client.clone(), cycles.clone()).await;
                Ok(Data {
                    storage,
                    coc: coc_client,
                    cycles,
                    components: components::ComponentRegistry::default(),
                    telemetry: telemetry::Telemetry::default(),
                })
            })
        })
        .build();

    let mut client = Client::builder(&token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    // Start the bot
    log::info!("Starting bot...");
    if let Err(why) = client.start().await {
        log::error!("Client error: {:?}", why);
    }
}
