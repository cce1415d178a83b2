use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use serenity::{Permissions, RoleId};
use std::time::Duration;

use crate::storage::TrackedClan;
use crate::{utils, Context, Error};

/// Permissions the bot needs in a feed channel, checked one by one
const CHECKED_PERMISSIONS: [(Permissions, &str); 8] = [
    (Permissions::VIEW_CHANNEL, "ViewChannel"),
    (Permissions::SEND_MESSAGES, "SendMessages"),
    (Permissions::EMBED_LINKS, "EmbedLinks"),
    (Permissions::ADD_REACTIONS, "AddReactions"),
    (Permissions::ATTACH_FILES, "AttachFiles"),
    (Permissions::USE_EXTERNAL_EMOJIS, "UseExternalEmojis"),
    (Permissions::READ_MESSAGE_HISTORY, "ReadMessageHistory"),
    (Permissions::MANAGE_WEBHOOKS, "ManageWebhooks"),
];

#[derive(Clone, Copy)]
struct ReportEmojis {
    tick: &'static str,
    cross: &'static str,
    blank: &'static str,
}

const CUSTOM_EMOJIS: ReportEmojis = ReportEmojis {
    tick: "<:tick:696314375429636096>",
    cross: "<:wrong:696314714535762081>",
    blank: "<:blank:696316049701420063>",
};

// Fallback when @everyone can't use external emojis in the channel: the
// report would otherwise render as broken :tick: placeholders
const UNICODE_EMOJIS: ReportEmojis = ReportEmojis {
    tick: "☑️",
    cross: "❌",
    blank: "⬛",
};

/// Shows debug information for clan tracking in a channel
///
/// Reports the bot's permissions in the channel, webhook usage, how long the
/// background refresh loops are taking, and the health of every tracked clan.
#[poise::command(slash_command, guild_only, category = "config")]
pub async fn debug(
    ctx: Context<'_>,
    #[description = "Channel to inspect (defaults to this one)"]
    #[channel_types("Text")]
    channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say("❌ This command can only be used in servers!").await?;
        return Ok(());
    };

    ctx.defer().await?;

    let channel = match channel {
        Some(channel) => channel,
        None => {
            let channel_id = ctx.channel_id();
            ctx.cache()
                .guild(guild_id)
                .and_then(|guild| guild.channels.get(&channel_id).cloned())
                .ok_or("Could not resolve the current channel")?
        }
    };

    let bot_id = ctx.framework().bot_id;
    let bot_member = guild_id.member(ctx.http(), bot_id).await?;
    let bot_name = ctx.cache().current_user().name.clone();
    let shard_count = ctx.cache().shard_count();
    let shard_id = ctx.serenity_context().shard_id;

    // Everything cache-derived gets cloned out before the next await
    let (bot_permissions, everyone_uee) = {
        let guild = ctx
            .cache()
            .guild(guild_id)
            .ok_or("Guild is not in the cache")?;
        let bot_permissions = guild.user_permissions_in(&channel, &bot_member);

        let everyone_role = RoleId::new(guild_id.get());
        let base = guild
            .roles
            .get(&everyone_role)
            .map(|role| role.permissions)
            .unwrap_or_default();
        let everyone = utils::everyone_permissions_in(
            base,
            &channel.permission_overwrites,
            everyone_role,
        );
        (
            bot_permissions,
            everyone.contains(Permissions::USE_EXTERNAL_EMOJIS),
        )
    };

    let emojis = if everyone_uee {
        CUSTOM_EMOJIS
    } else {
        UNICODE_EMOJIS
    };

    let webhook_count = if bot_permissions
        .contains(Permissions::MANAGE_WEBHOOKS | Permissions::VIEW_CHANNEL)
    {
        ctx.http()
            .get_channel_webhooks(channel.id)
            .await
            .map(|hooks| hooks.len())
            .unwrap_or(0)
    } else {
        0
    };

    let clans = ctx.data().storage.find(guild_id.get());
    let mut fetched = Vec::new();
    for entry in &clans {
        if let Ok(clan) = ctx.data().coc.clan(&entry.tag).await {
            fetched.push(clan);
        }
    }

    let cycles = ctx.data().cycles.snapshot();
    let now = Utc::now();

    let mut lines: Vec<String> = vec![
        format!("**{} Debug Menu**", bot_name),
        String::new(),
        "**Server ID**".to_string(),
        guild_id.to_string(),
        "**Shard ID**".to_string(),
        format!("[{} / {}]", shard_id, shard_count),
        "**Channel ID**".to_string(),
        channel.id.to_string(),
        String::new(),
        "**Channel Permissions**".to_string(),
    ];

    for (permission, name) in CHECKED_PERMISSIONS {
        let sign = if bot_permissions.contains(permission) {
            emojis.tick
        } else {
            emojis.cross
        };
        lines.push(format!("{} {}", sign, utils::permission_display_name(name)));
    }

    lines.extend([
        String::new(),
        "**Webhooks**".to_string(),
        webhook_count.to_string(),
        String::new(),
        "**Emoji Permissions**".to_string(),
        format!(
            "{} Use External Emojis (for @everyone)",
            if everyone_uee { emojis.tick } else { emojis.cross }
        ),
        String::new(),
        format!(
            "**Loop Time{}**",
            if cycles.complete() { "" } else { " (Processing...)" }
        ),
        format!(
            "{} ` {:>7} ` ` {:>7} ` ` {:>7} `",
            emojis.blank, "CLANS", "WARS", "PLAYERS"
        ),
        format!(
            "{} ` {:>7} ` ` {:>7} ` ` {:>7} `",
            emojis.tick,
            fix_cycle(cycles.clans),
            fix_cycle(cycles.wars),
            fix_cycle(cycles.players)
        ),
        String::new(),
        "**Clan Status and Refresh Info**".to_string(),
        format!(
            "{} ` {:<15} ` ` {:>7} ` ` {:>7} `",
            emojis.blank, "CLAN NAME", "UPDATED", "WAR LOG"
        ),
    ]);

    if clans.is_empty() {
        lines.push("No clans are tracked in this server.".to_string());
    }
    for entry in &clans {
        let war_log = fetched
            .iter()
            .find(|clan| clan.tag == entry.tag)
            .map(|clan| clan.is_war_log_public);
        lines.push(clan_row(entry, war_log, now, emojis));
    }

    for chunk in utils::split_message(&lines.join("\n"), utils::MESSAGE_LIMIT) {
        ctx.say(chunk).await?;
    }

    Ok(())
}

fn fix_cycle(duration: Option<Duration>) -> String {
    match duration {
        Some(duration) => utils::humanize_millis(duration.as_millis() as u64),
        None => "...".to_string(),
    }
}

fn updated_cell(last_ran: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match last_ran {
        Some(last_ran) => {
            let millis = (now - last_ran).num_milliseconds().max(0) as u64;
            format!("{} ago", utils::humanize_millis(millis))
        }
        None => "...".to_string(),
    }
}

fn clan_row(
    entry: &TrackedClan,
    war_log: Option<bool>,
    now: DateTime<Utc>,
    emojis: ReportEmojis,
) -> String {
    let healthy = entry.active && !entry.paused && war_log == Some(true);
    let sign = if healthy { emojis.tick } else { emojis.cross };
    let name: String = entry.name.chars().take(15).collect();
    let war_log = if war_log == Some(true) {
        "Public"
    } else {
        "Private"
    };
    format!(
        "{} ` {:<15} ` ` {:>7} ` ` {:>7} `",
        sign,
        name,
        updated_cell(entry.last_ran, now),
        war_log
    )
}
