use poise::serenity_prelude as serenity;
use serenity::{
    ComponentInteraction, CreateInteractionResponse, CreateInteractionResponseMessage,
};

use crate::storage::TrackedClan;
use crate::{languages, Context, Data, Error};

/// Custom-id family the event router dispatches to this module.
pub const FAMILY: &str = "clans";

const PAGE_SIZE: usize = 5;

#[derive(Debug, PartialEq, Eq)]
enum Direction {
    Prev,
    Next,
}

#[derive(Debug, PartialEq, Eq)]
struct PagerAction {
    token: String,
    page: usize,
    direction: Direction,
}

// Custom ids look like "clans:{token}:{page}:{prev|next}"; the token keeps
// two lists by the same user from stealing each other's buttons
fn parse_custom_id(custom_id: &str) -> Option<PagerAction> {
    let mut parts = custom_id.split(':');
    if parts.next()? != FAMILY {
        return None;
    }
    let token = parts.next()?.to_string();
    let page = parts.next()?.parse().ok()?;
    let direction = match parts.next()? {
        "prev" => Direction::Prev,
        "next" => Direction::Next,
        _ => return None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(PagerAction {
        token,
        page,
        direction,
    })
}

fn custom_ids(token: &str, page: usize) -> (String, String) {
    (
        format!("{}:{}:{}:prev", FAMILY, token, page),
        format!("{}:{}:{}:next", FAMILY, token, page),
    )
}

fn page_count(total: usize) -> usize {
    ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1)
}

fn target_page(current: usize, direction: &Direction, pages: usize) -> usize {
    match direction {
        Direction::Prev => current.saturating_sub(1),
        Direction::Next => (current + 1).min(pages - 1),
    }
}

fn render_page(clans: &[TrackedClan], page: usize, pages: usize) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title("Tracked Clans")
        .color(serenity::Color::BLUE);

    for entry in clans.iter().skip(page * PAGE_SIZE).take(PAGE_SIZE) {
        let language = entry
            .chat_language
            .as_deref()
            .map(languages::label)
            .unwrap_or_else(|| "No language".to_string());
        let status = if entry.paused {
            "Paused"
        } else if entry.active {
            "Active"
        } else {
            "Inactive"
        };
        embed = embed.field(
            format!("{} ({})", entry.name, entry.tag),
            format!("{} members • {} • {}", entry.member_count, language, status),
            false,
        );
    }

    embed.footer(serenity::CreateEmbedFooter::new(format!(
        "Page {}/{} • {} clans",
        page + 1,
        pages,
        clans.len()
    )))
}

fn nav_row(prev_id: &str, next_id: &str, page: usize, pages: usize) -> serenity::CreateActionRow {
    serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(prev_id)
            .label("Prev")
            .style(serenity::ButtonStyle::Secondary)
            .disabled(page == 0),
        serenity::CreateButton::new(next_id)
            .label("Next")
            .style(serenity::ButtonStyle::Secondary)
            .disabled(page + 1 >= pages),
    ])
}

/// Lists the clans tracked in this server
#[poise::command(slash_command, guild_only, category = "info")]
pub async fn clans(ctx: Context<'_>) -> Result<(), Error> {
    log::info!("Clans command called by {}", ctx.author().name);

    let Some(guild_id) = ctx.guild_id() else {
        ctx.say("❌ This command can only be used in servers!").await?;
        return Ok(());
    };

    let clans = ctx.data().storage.find(guild_id.get());
    if clans.is_empty() {
        ctx.say("No clans are tracked yet. Use `/track <tag>` to add one.")
            .await?;
        return Ok(());
    }

    let pages = page_count(clans.len());
    let mut reply = poise::CreateReply::default().embed(render_page(&clans, 0, pages));

    if pages > 1 {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let (prev_id, next_id) = custom_ids(&token, 0);
        ctx.data()
            .components
            .register(prev_id.clone(), &[ctx.author().id]);
        ctx.data()
            .components
            .register(next_id.clone(), &[ctx.author().id]);
        reply = reply.components(vec![nav_row(&prev_id, &next_id, 0, pages)]);
    }

    ctx.send(reply).await?;
    Ok(())
}

/// Page-turn handler; the event router has already validated ownership.
pub async fn handle_component(
    ctx: &serenity::Context,
    component: &ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    let Some(action) = parse_custom_id(&component.data.custom_id) else {
        return Ok(());
    };
    let Some(guild_id) = component.guild_id else {
        return Ok(());
    };

    // The buttons being swapped out stop being live either way
    let (old_prev, old_next) = custom_ids(&action.token, action.page);
    data.components.unregister(&old_prev);
    data.components.unregister(&old_next);

    let clans = data.storage.find(guild_id.get());
    if clans.is_empty() {
        component
            .create_response(
                &ctx.http,
                CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new()
                        .content("No clans are tracked in this server anymore.")
                        .embeds(Vec::new())
                        .components(Vec::new()),
                ),
            )
            .await?;
        return Ok(());
    }

    let pages = page_count(clans.len());
    let page = target_page(action.page.min(pages - 1), &action.direction, pages);

    let (prev_id, next_id) = custom_ids(&action.token, page);
    data.components.register(prev_id.clone(), &[component.user.id]);
    data.components.register(next_id.clone(), &[component.user.id]);

    component
        .create_response(
            &ctx.http,
            CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .embed(render_page(&clans, page, pages))
                    .components(vec![nav_row(&prev_id, &next_id, page, pages)]),
            ),
        )
        .await?;

    Ok(())
}
