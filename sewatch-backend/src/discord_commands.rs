use crate::Context;
use poise::CreateReply;
use poise::command;
use poise::serenity_prelude::CreateEmbed;
use sewatch_backend::availability::AvailabilityState;
use sewatch_backend::helpers::format_playtime;

pub(crate) type Error = Box<dyn std::error::Error + Send + Sync>;

/// Discord caps embeds at 25 fields and messages at 2000 characters.
const MAX_EMBED_FIELDS: usize = 25;
const MAX_MESSAGE_CHARS: usize = 1900;

/// Get the players currently on the server
#[command(slash_command, prefix_command)]
pub async fn playerlist(ctx: Context<'_>) -> Result<(), Error> {
    let view = ctx.data().presence.borrow().clone();

    if !view.has_polled() {
        ctx.say("The player list hasn't been fetched yet, try again in a moment.")
            .await?;
        return Ok(());
    }
    if view.availability == AvailabilityState::Offline {
        ctx.say("Failed to fetch player list. Is the API down?").await?;
        return Ok(());
    }
    if view.players.is_empty() {
        ctx.say("No players are currently online.").await?;
        return Ok(());
    }

    let embed = view
        .players_by_playtime()
        .into_iter()
        .take(MAX_EMBED_FIELDS)
        .fold(
            CreateEmbed::default()
                .title("Current Players")
                .description("Here are the players currently online, sorted by playtime:")
                .color(0x5865F2),
            |embed, player| {
                embed.field(
                    player.name,
                    format!("Playtime: {}", format_playtime(player.playtime_seconds)),
                    false,
                )
            },
        );
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Check the bot's latency
#[command(slash_command, prefix_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let latency = ctx.ping().await;
    ctx.say(format!("Pong! Latency: {:.2}ms", latency.as_secs_f64() * 1000.0))
        .await?;
    Ok(())
}

/// Post join/leave notifications in this channel
#[command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "ADMINISTRATOR"
)]
pub async fn setlogchannel(ctx: Context<'_>) -> Result<(), Error> {
    let channel_id = ctx.channel_id().get().to_string();
    ctx.data().settings.set_log_channel(&channel_id).await?;
    ctx.say("Join and leave notifications will be posted in this channel.")
        .await?;
    Ok(())
}

/// Get pinged whenever a player leaves the server
#[command(slash_command, prefix_command)]
pub async fn subscribe(ctx: Context<'_>) -> Result<(), Error> {
    let user_id = ctx.author().id.get().to_string();
    let reply = if ctx.data().settings.subscribe(&user_id).await? {
        "You will be pinged when a player leaves."
    } else {
        "You are already subscribed."
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Stop getting pinged when players leave
#[command(slash_command, prefix_command)]
pub async fn unsubscribe(ctx: Context<'_>) -> Result<(), Error> {
    let user_id = ctx.author().id.get().to_string();
    let reply = if ctx.data().settings.unsubscribe(&user_id).await? {
        "You will no longer be pinged when a player leaves."
    } else {
        "You were not subscribed."
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Suggest something for the server
#[command(slash_command, prefix_command)]
pub async fn suggest(
    ctx: Context<'_>,
    #[description = "Your suggestion"]
    #[rest]
    text: String,
) -> Result<(), Error> {
    let text = text.trim();
    if text.is_empty() {
        ctx.say("A suggestion can't be empty.").await?;
        return Ok(());
    }
    ctx.data()
        .settings
        .suggest(&format!("{}: {}", ctx.author().name, text))
        .await?;
    ctx.say("Thanks, your suggestion was recorded.").await?;
    Ok(())
}

/// List recorded suggestions
#[command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "ADMINISTRATOR"
)]
pub async fn suggestions(ctx: Context<'_>) -> Result<(), Error> {
    let suggestions = ctx.data().settings.suggestions().await?;
    if suggestions.is_empty() {
        ctx.say("No suggestions yet.").await?;
        return Ok(());
    }

    let mut list = String::new();
    for (i, suggestion) in suggestions.iter().enumerate() {
        let line = format!("{}. {}\n", i + 1, suggestion);
        if list.len() + line.len() > MAX_MESSAGE_CHARS {
            list.push_str(&format!("…and {} more", suggestions.len() - i));
            break;
        }
        list.push_str(&line);
    }
    ctx.say(list).await?;
    Ok(())
}
