use crate::{Context, Error};

/// Checks the bot's gateway and REST latency
#[poise::command(slash_command, category = "config")]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    log::info!("Ping command called by {}", ctx.author().name);

    let gateway = ctx.ping().await;

    let start_time = std::time::Instant::now();
    let reply = ctx.say("🏓 Pong!").await?;
    let rest = start_time.elapsed();

    reply
        .edit(
            ctx,
            poise::CreateReply::default().content(format!(
                "🏓 Pong! Gateway: `{}ms` • REST: `{}ms`",
                gateway.as_millis(),
                rest.as_millis()
            )),
        )
        .await?;

    Ok(())
}
