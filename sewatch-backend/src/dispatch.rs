//! Turns presence and availability changes into chat notifications.

use std::time::Duration;

use async_trait::async_trait;
use sewatch_db::KeyValueStore;
use tracing::{debug, warn};

use crate::availability::AvailabilityEvent;
use crate::error::DispatchError;
use crate::helpers::{format_duration, format_timestamp, mention};
use crate::settings::Settings;
use crate::tracker::{PlayerDeparture, PlayerSession, PresenceDelta};

/// Something worth telling the log channel about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Joined(PlayerSession),
    Left(PlayerDeparture),
    Availability(AvailabilityEvent),
}

/// Events of one tick in delivery order: joins, then leaves, then availability.
pub fn collect_events(delta: PresenceDelta, availability: Option<AvailabilityEvent>) -> Vec<WatchEvent> {
    let mut events = Vec::with_capacity(delta.joined.len() + delta.left.len() + 1);
    events.extend(delta.joined.into_iter().map(WatchEvent::Joined));
    events.extend(delta.left.into_iter().map(WatchEvent::Left));
    events.extend(availability.map(WatchEvent::Availability));
    events
}

/// Delivery of formatted text to a destination.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, destination: &str, text: &str) -> Result<(), DispatchError>;
}

/// Outcome counts for one [`NotificationDispatcher::dispatch`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    /// No destination configured, or the store could not be read.
    pub dropped: usize,
    /// Send errors and timeouts.
    pub failed: usize,
}

pub struct NotificationDispatcher<S, N> {
    settings: Settings<S>,
    sink: N,
    escalation_contact: String,
    send_timeout: Duration,
}

impl<S: KeyValueStore, N: NotificationSink> NotificationDispatcher<S, N> {
    pub fn new(store: S, sink: N, escalation_contact: impl Into<String>, send_timeout: Duration) -> Self {
        Self {
            settings: Settings::new(store),
            sink,
            escalation_contact: escalation_contact.into(),
            send_timeout,
        }
    }

    /// Send one notification per event, in order.
    ///
    /// Failures are logged and counted; they never stop later events.
    pub async fn dispatch(&self, events: &[WatchEvent]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for event in events {
            match self.deliver(event).await {
                Ok(()) => report.sent += 1,
                Err(DispatchError::UnresolvedDestination) => {
                    warn!(?event, "no log channel configured, dropping notification");
                    report.dropped += 1;
                }
                Err(err) => {
                    warn!(?event, error = %err, "failed to send notification");
                    report.failed += 1;
                }
            }
        }

        report
    }

    async fn deliver(&self, event: &WatchEvent) -> Result<(), DispatchError> {
        let destination = self.resolve_destination().await?;
        let text = self.render(event).await;

        match tokio::time::timeout(self.send_timeout, self.sink.send(&destination, &text)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(DispatchError::SendFailed(format!(
                    "timed out after {}s",
                    self.send_timeout.as_secs_f32()
                )));
            }
        }

        debug!(%destination, "notification sent");
        Ok(())
    }

    async fn resolve_destination(&self) -> Result<String, DispatchError> {
        match self.settings.log_channel().await {
            Ok(Some(channel)) => Ok(channel),
            Ok(None) => Err(DispatchError::UnresolvedDestination),
            Err(err) => {
                warn!(error = %err, "could not read log channel");
                Err(DispatchError::UnresolvedDestination)
            }
        }
    }

    /// Notification text for an event.
    pub async fn render(&self, event: &WatchEvent) -> String {
        match event {
            WatchEvent::Joined(session) => format!(
                "{} joined the server at {}",
                session.name,
                format_timestamp(session.joined_at)
            ),
            WatchEvent::Left(departure) => {
                let text = format!(
                    "{} left the server after {}",
                    departure.name,
                    format_duration(departure.duration)
                );
                let subscribers = match self.settings.subscribers().await {
                    Ok(subscribers) => subscribers,
                    Err(err) => {
                        warn!(error = %err, "could not read leave subscribers, sending without mentions");
                        Vec::new()
                    }
                };
                if subscribers.is_empty() {
                    text
                } else {
                    let mentions: Vec<String> = subscribers.iter().map(|id| mention(id)).collect();
                    format!("{}\n{}", text, mentions.join(" "))
                }
            }
            WatchEvent::Availability(AvailabilityEvent::BecameOffline) => format!(
                "The server appears to be offline. If it does not come back soon, please contact {}.",
                self.escalation_contact
            ),
            WatchEvent::Availability(AvailabilityEvent::BecameOnline) => {
                "The server is back online.".to_string()
            }
        }
    }
}
