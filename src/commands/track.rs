use poise::serenity_prelude as serenity;
use serenity::{Color, CreateEmbed, CreateEmbedFooter};

use crate::coc::{self, CocError};
use crate::storage::InsertOutcome;
use crate::{languages, Context, Error};

/// Start tracking a clan in this server
#[poise::command(
    slash_command,
    guild_only,
    category = "setup",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn track(
    ctx: Context<'_>,
    #[description = "Clan tag, e.g. #2PP"] tag: String,
) -> Result<(), Error> {
    log::info!(
        "Track command called by {} with tag: '{}'",
        ctx.author().name,
        tag
    );

    let Some(guild_id) = ctx.guild_id() else {
        ctx.say("❌ This command can only be used in servers!").await?;
        return Ok(());
    };

    let tag = match coc::normalize_tag(&tag) {
        Ok(tag) => tag,
        Err(err) => {
            ctx.say(format!("❌ {}", err)).await?;
            return Ok(());
        }
    };

    ctx.defer().await?;

    let clan = match ctx.data().coc.clan(&tag).await {
        Ok(clan) => clan,
        Err(CocError::NotFound) => {
            ctx.say(format!("❌ No clan exists with the tag `{}`.", tag))
                .await?;
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    match ctx
        .data()
        .storage
        .insert(guild_id.get(), &clan, ctx.author().id.get())?
    {
        InsertOutcome::Added => {
            let language = clan
                .chat_language
                .as_ref()
                .map(|l| languages::label(&l.code))
                .unwrap_or_else(|| "Not set".to_string());

            let embed = CreateEmbed::new()
                .title(format!("Now tracking {} ({})", clan.name, clan.tag))
                .color(Color::DARK_GREEN)
                .field("Level", clan.clan_level.to_string(), true)
                .field("Members", format!("{}/50", clan.members), true)
                .field("Language", language, true)
                .field(
                    "War Log",
                    if clan.is_war_log_public {
                        "Public"
                    } else {
                        "Private"
                    },
                    true,
                )
                .footer(CreateEmbedFooter::new(format!(
                    "Tracked by {}",
                    ctx.author().name
                )))
                .timestamp(serenity::Timestamp::now());

            ctx.send(poise::CreateReply::default().embed(embed)).await?;
            log::info!("Clan {} is now tracked in guild {}", clan.tag, guild_id);
        }
        InsertOutcome::Duplicate => {
            ctx.say(format!(
                "❌ `{}` is already tracked in this server. Use `/clans` to see the list.",
                tag
            ))
            .await?;
        }
        InsertOutcome::CapReached => {
            ctx.say("❌ This server has reached its tracked-clan limit. Untrack one first.")
                .await?;
        }
    }

    Ok(())
}

/// Stop tracking a clan in this server
#[poise::command(
    slash_command,
    guild_only,
    category = "setup",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn untrack(
    ctx: Context<'_>,
    #[description = "Clan tag, e.g. #2PP"] tag: String,
) -> Result<(), Error> {
    log::info!(
        "Untrack command called by {} with tag: '{}'",
        ctx.author().name,
        tag
    );

    let Some(guild_id) = ctx.guild_id() else {
        ctx.say("❌ This command can only be used in servers!").await?;
        return Ok(());
    };

    let tag = match coc::normalize_tag(&tag) {
        Ok(tag) => tag,
        Err(err) => {
            ctx.say(format!("❌ {}", err)).await?;
            return Ok(());
        }
    };

    if ctx.data().storage.remove(guild_id.get(), &tag)? {
        ctx.say(format!("✅ `{}` is no longer tracked in this server.", tag))
            .await?;
        log::info!("Clan {} untracked in guild {}", tag, guild_id);
    } else {
        ctx.say(format!("❌ `{}` is not tracked in this server.", tag))
            .await?;
    }

    Ok(())
}
