use parking_lot::RwLock;
use poise::serenity_prelude as serenity;
use serde_json::{json, Value};

use crate::{utils, Context, Error};

/// Holds the snapshot of the most recently started command so failure paths
/// outside a command body (the component event handler, mostly) can still
/// report what the bot was last doing.
#[derive(Default)]
pub struct Telemetry {
    last_context: RwLock<Option<Value>>,
}

impl Telemetry {
    pub fn set_context(&self, snapshot: Value) {
        *self.last_context.write() = Some(snapshot);
    }

    pub fn last_context(&self) -> Option<Value> {
        self.last_context.read().clone()
    }
}

/// "Guild Name/username" inside guilds, bare username elsewhere.
pub fn format_label(guild_name: Option<&str>, username: &str) -> String {
    match guild_name {
        Some(guild) => format!("{}/{}", guild, username),
        None => username.to_string(),
    }
}

fn invocation_label(ctx: &Context<'_>) -> String {
    let guild_name = ctx
        .guild_id()
        .and_then(|id| ctx.cache().guild(id).map(|g| g.name.clone()));
    format_label(guild_name.as_deref(), &ctx.author().name)
}

/// Structured snapshot of a command invocation.
pub fn command_snapshot(ctx: &Context<'_>) -> Value {
    let guild = ctx.guild_id().map(|id| {
        let name = ctx.cache().guild(id).map(|g| g.name.clone());
        json!({ "id": id.get(), "name": name })
    });

    json!({
        "user": {
            "id": ctx.author().id.get(),
            "username": ctx.author().name.clone(),
        },
        "guild": guild,
        "channel": ctx.channel_id().get(),
        "command": {
            "name": ctx.command().qualified_name.clone(),
            "category": ctx.command().category.clone(),
        },
        "interaction": ctx.id(),
    })
}

/// Called from poise's `pre_command` hook.
pub fn command_started(ctx: &Context<'_>) {
    let snapshot = command_snapshot(ctx);
    log::info!(
        "Executing command {} [{}]",
        ctx.command().qualified_name,
        invocation_label(ctx)
    );
    log::debug!("command_started {}", snapshot);
    ctx.data().telemetry.set_context(snapshot);
}

/// Called from the global error handler for errors inside a command body.
/// Reports the failure and tells the user; must never fail itself.
pub async fn command_errored(ctx: &Context<'_>, error: &Error) {
    log::error!(
        "{} ~ {} [{}]",
        ctx.command().qualified_name,
        error,
        invocation_label(ctx)
    );
    log::debug!("command_errored {}", command_snapshot(ctx));

    let reply = poise::CreateReply::default()
        .content("\\❌ Something went wrong while running the command.")
        .components(vec![serenity::CreateActionRow::Buttons(vec![
            serenity::CreateButton::new_link(utils::support_server_url()).label("Contact Support"),
        ])])
        .ephemeral(true);

    // poise picks reply vs follow-up depending on whether the command
    // already responded
    if let Err(err) = ctx.send(reply).await {
        log::error!("Failed to deliver the error reply: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(Some("Lost Boys HQ"), "ruby"), "Lost Boys HQ/ruby");
        assert_eq!(format_label(None, "ruby"), "ruby");
    }

    #[test]
    fn test_last_context_roundtrip() {
        let telemetry = Telemetry::default();
        assert!(telemetry.last_context().is_none());

        telemetry.set_context(json!({ "command": { "name": "debug" } }));
        let stored = telemetry.last_context().unwrap();
        assert_eq!(stored["command"]["name"], "debug");

        telemetry.set_context(json!({ "command": { "name": "track" } }));
        assert_eq!(telemetry.last_context().unwrap()["command"]["name"], "track");
    }
}
