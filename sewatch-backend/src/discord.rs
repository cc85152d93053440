use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use sewatch_backend::availability::AvailabilityState;
use sewatch_backend::dispatch::NotificationSink;
use sewatch_backend::error::DispatchError;
use sewatch_backend::scheduler::PresenceView;
use std::sync::Arc;
use tokio::sync::watch;

/// Posts notifications to a Discord channel given by its numeric id.
pub(crate) struct DiscordSink {
    http: Arc<serenity::Http>,
}

impl DiscordSink {
    pub(crate) fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl NotificationSink for DiscordSink {
    async fn send(&self, destination: &str, text: &str) -> Result<(), DispatchError> {
        let channel_id: u64 = destination
            .parse()
            .map_err(|_| DispatchError::UnresolvedDestination)?;
        serenity::ChannelId::new(channel_id)
            .say(&*self.http, text)
            .await
            .map_err(|e| DispatchError::SendFailed(e.to_string()))?;
        Ok(())
    }
}

/// Keep the bot's activity at "N/MAX players online" while the server answers.
pub(crate) async fn update_activity(
    ctx: serenity::Context,
    mut presence: watch::Receiver<PresenceView>,
    max_players: u32,
) {
    let mut last_count = None;
    while presence.changed().await.is_ok() {
        let (availability, count) = {
            let view = presence.borrow_and_update();
            (view.availability, view.player_count())
        };
        if availability == AvailabilityState::Offline || last_count == Some(count) {
            continue;
        }
        last_count = Some(count);
        ctx.set_activity(Some(serenity::ActivityData::playing(format!(
            "{}/{} players online",
            count, max_players
        ))));
    }
}
