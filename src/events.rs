use poise::serenity_prelude as serenity;
use serenity::{
    ComponentInteraction, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, FullEvent, Interaction,
};

use crate::components::Ownership;
use crate::telemetry::format_label;
use crate::{commands, utils, Data, Error};

pub async fn handle(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let FullEvent::InteractionCreate {
        interaction: Interaction::Component(component),
    } = event
    {
        component_interaction(ctx, component, data).await?;
    }
    Ok(())
}

/// Gate every component press through ownership validation, then route live
/// ones to the command that owns the custom-id family. Slash and context-menu
/// commands never come through here; poise dispatches those itself.
async fn component_interaction(
    ctx: &serenity::Context,
    component: &ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    // Inhibitor: guild interactions only, and never from blacklisted sources
    let Some(guild_id) = component.guild_id else {
        return Ok(());
    };
    if utils::is_blacklisted_guild(guild_id) || utils::is_blacklisted_user(component.user.id) {
        return Ok(());
    }

    let custom_id = component.data.custom_id.as_str();
    let label = {
        let guild_name = ctx.cache.guild(guild_id).map(|g| g.name.clone());
        format_label(guild_name.as_deref(), &component.user.name)
    };

    match data.components.check(custom_id, component.user.id) {
        Ownership::Blocked => {
            log::debug!("[{}] COMPONENT_BLOCKED {}", label, custom_id);
            component
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content("❌ This component is not for you.")
                            .ephemeral(true),
                    ),
                )
                .await?;
        }
        Ownership::Expired => {
            log::debug!("[{}] COMPONENT_EXPIRED {}", label, custom_id);
            // Strip the dead components so the message stops inviting presses
            component
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::UpdateMessage(
                        CreateInteractionResponseMessage::new().components(Vec::new()),
                    ),
                )
                .await?;
            component
                .create_followup(
                    &ctx.http,
                    CreateInteractionResponseFollowup::new()
                        .content("This component has expired. Run the command again.")
                        .ephemeral(true),
                )
                .await?;
        }
        Ownership::Allowed => {
            let family = custom_id.split(':').next().unwrap_or("");
            let result = match family {
                commands::clans::FAMILY => {
                    commands::clans::handle_component(ctx, component, data).await
                }
                _ => Ok(()),
            };

            if let Err(err) = result {
                log::error!("[{}] Component handler failed for {}: {}", label, custom_id, err);
                if let Some(context) = data.telemetry.last_context() {
                    log::debug!("last command context: {}", context);
                }
            }
        }
    }

    Ok(())
}
