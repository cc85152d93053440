//! The poll loop: fetch, diff, notify, publish.

use std::time::Duration;

use serde::Serialize;
use sewatch_db::KeyValueStore;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::availability::{AvailabilityEvent, AvailabilityMonitor, AvailabilityState};
use crate::directory::{PlayerDirectory, PlayerSnapshot};
use crate::dispatch::{DispatchReport, NotificationDispatcher, NotificationSink, WatchEvent, collect_events};
use crate::helpers::now;
use crate::tracker::{PresenceDelta, PresenceTracker};

/// Shortest allowed poll interval; `tokio::time::interval` rejects zero.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A player in the latest snapshot together with their tracked join time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnlinePlayer {
    pub name: String,
    pub playtime_seconds: u64,
    pub joined_at: i64,
}

/// Read-only picture of the server after the last tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceView {
    pub availability: AvailabilityState,
    /// Players from the last successful fetch, in server order.
    pub players: Vec<OnlinePlayer>,
    /// When the last tick finished; None before the first one.
    pub updated_at: Option<i64>,
}

impl Default for PresenceView {
    fn default() -> Self {
        Self {
            availability: AvailabilityState::Online,
            players: Vec::new(),
            updated_at: None,
        }
    }
}

impl PresenceView {
    /// False until the first tick has finished.
    pub fn has_polled(&self) -> bool {
        self.updated_at.is_some()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Players with the longest playtime first.
    pub fn players_by_playtime(&self) -> Vec<OnlinePlayer> {
        let mut players = self.players.clone();
        players.sort_by(|a, b| b.playtime_seconds.cmp(&a.playtime_seconds));
        players
    }
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub fetch_succeeded: bool,
    pub events: Vec<WatchEvent>,
    pub dispatch: DispatchReport,
}

/// Owns the watcher state and runs one tick at a time.
pub struct PollScheduler<D, S, N> {
    directory: D,
    tracker: PresenceTracker,
    monitor: AvailabilityMonitor,
    dispatcher: NotificationDispatcher<S, N>,
    interval: Duration,
    shutdown_grace: Duration,
    view: watch::Sender<PresenceView>,
}

impl<D, S, N> PollScheduler<D, S, N>
where
    D: PlayerDirectory,
    S: KeyValueStore,
    N: NotificationSink,
{
    pub fn new(
        directory: D,
        dispatcher: NotificationDispatcher<S, N>,
        interval: Duration,
        shutdown_grace: Duration,
    ) -> Self {
        let (view, _) = watch::channel(PresenceView::default());
        if interval < MIN_POLL_INTERVAL {
            warn!(
                interval_ms = interval.as_millis() as u64,
                "poll interval too short, using {}ms",
                MIN_POLL_INTERVAL.as_millis()
            );
        }
        Self {
            directory,
            tracker: PresenceTracker::new(),
            monitor: AvailabilityMonitor::new(),
            dispatcher,
            interval: interval.max(MIN_POLL_INTERVAL),
            shutdown_grace,
            view,
        }
    }

    /// Receiver for the view published after every tick.
    pub fn subscribe(&self) -> watch::Receiver<PresenceView> {
        self.view.subscribe()
    }

    pub fn tracker(&self) -> &PresenceTracker {
        &self.tracker
    }

    pub fn availability(&self) -> AvailabilityState {
        self.monitor.state()
    }

    /// Run one poll cycle with `now` as the observation time.
    pub async fn tick(&mut self, now: i64) -> TickReport {
        let fetched = self.directory.fetch().await;
        let availability = self.monitor.update(fetched.is_ok());

        let delta = match &fetched {
            Ok(snapshot) => self.tracker.diff(snapshot, now),
            Err(err) => {
                debug!(error = %err, "player list fetch failed");
                PresenceDelta::default()
            }
        };

        match availability {
            Some(AvailabilityEvent::BecameOffline) => warn!("game server went offline"),
            Some(AvailabilityEvent::BecameOnline) => info!("game server is back online"),
            None => {}
        }

        let events = collect_events(delta, availability);
        let dispatch = self.dispatcher.dispatch(&events).await;
        if !events.is_empty() {
            debug!(events = events.len(), ?dispatch, "tick dispatched");
        }

        self.publish(fetched.as_ref().ok(), now);

        TickReport {
            fetch_succeeded: fetched.is_ok(),
            events,
            dispatch,
        }
    }

    fn publish(&self, snapshot: Option<&PlayerSnapshot>, now: i64) {
        let availability = self.monitor.state();
        let tracker = &self.tracker;
        self.view.send_modify(|view| {
            view.availability = availability;
            view.updated_at = Some(now);
            if let Some(snapshot) = snapshot {
                let mut players = Vec::with_capacity(snapshot.len());
                for record in snapshot {
                    // Duplicate names share a session; list them once
                    if players.iter().any(|p: &OnlinePlayer| p.name == record.name) {
                        continue;
                    }
                    let joined_at = tracker.session(&record.name).map_or(now, |s| s.joined_at);
                    players.push(OnlinePlayer {
                        name: record.name.clone(),
                        playtime_seconds: record.playtime_seconds,
                        joined_at,
                    });
                }
                view.players = players;
            }
        });
    }

    /// Tick every `interval` until `shutdown` becomes true (or its sender is
    /// dropped). An in-flight tick gets the shutdown grace period to finish.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let grace = self.shutdown_grace;

        info!(interval_ms = self.interval.as_millis() as u64, "poll loop started");

        loop {
            tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = ticker.tick() => {}
            }

            let tick = self.tick(now());
            tokio::pin!(tick);

            tokio::select! {
                _ = &mut tick => {}
                _ = wait_for_shutdown(&mut shutdown) => {
                    if tokio::time::timeout(grace, &mut tick).await.is_err() {
                        warn!(grace_secs = grace.as_secs_f32(), "abandoned in-flight tick");
                    }
                    break;
                }
            }
        }

        info!("poll loop stopped");
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender means nobody can ask us to keep going either
    let _ = shutdown.wait_for(|stop| *stop).await;
}
