use poise::serenity_prelude as serenity;
use serenity::{Color, CreateEmbed};

use crate::coc::{self, CocError};
use crate::{languages, Context, Error};

/// Looks up the first clan tag found in a message
#[poise::command(
    context_menu_command = "Lookup Clan Tag",
    guild_only,
    category = "search"
)]
pub async fn lookup_clan_tag(
    ctx: Context<'_>,
    #[description = "Message to scan for a clan tag"] message: serenity::Message,
) -> Result<(), Error> {
    log::info!(
        "Lookup command called by {} on message {}",
        ctx.author().name,
        message.id
    );

    let Some(token) = message
        .content
        .split_whitespace()
        .find(|token| coc::looks_like_tag(token))
    else {
        ctx.send(
            poise::CreateReply::default()
                .content("❌ No clan tag found in that message.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };
    let tag = coc::normalize_tag(token)?;

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

    let language = clan
        .chat_language
        .as_ref()
        .map(|l| languages::label(&l.code))
        .unwrap_or_else(|| "Not set".to_string());

    let embed = CreateEmbed::new()
        .title(format!("{} ({})", clan.name, clan.tag))
        .color(Color::BLUE)
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
        .timestamp(serenity::Timestamp::now());

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
