//! Join/leave detection between consecutive player snapshots.
//!
//! Sessions are keyed by player name only. Two players online under the same
//! name share one session.

use std::collections::HashSet;

use crate::directory::PlayerRecord;

/// A player continuously present since `joined_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSession {
    pub name: String,
    pub joined_at: i64,
}

/// A closed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerDeparture {
    pub name: String,
    pub joined_at: i64,
    /// Seconds between join and the snapshot that no longer listed the player.
    pub duration: i64,
}

/// Changes found by one [`PresenceTracker::diff`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceDelta {
    /// New sessions, in snapshot order.
    pub joined: Vec<PlayerSession>,
    /// Closed sessions, in the order they were opened.
    pub left: Vec<PlayerDeparture>,
}

impl PresenceDelta {
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

/// Open sessions for the players in the last successful snapshot.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    /// Vec rather than a map: player counts are small and join order matters.
    sessions: Vec<PlayerSession>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `snapshot` with the previous one and update the open sessions.
    ///
    /// Afterwards the tracked names are exactly the names in `snapshot`. Only
    /// call this with a successfully fetched snapshot; an outage is not a mass
    /// departure.
    pub fn diff(&mut self, snapshot: &[PlayerRecord], now: i64) -> PresenceDelta {
        let current: HashSet<&str> = snapshot.iter().map(|p| p.name.as_str()).collect();
        let mut delta = PresenceDelta::default();

        let mut still_online = Vec::with_capacity(current.len());
        for session in self.sessions.drain(..) {
            if current.contains(session.name.as_str()) {
                still_online.push(session);
            } else {
                delta.left.push(PlayerDeparture {
                    duration: (now - session.joined_at).max(0),
                    name: session.name,
                    joined_at: session.joined_at,
                });
            }
        }

        for player in snapshot {
            if still_online.iter().any(|s| s.name == player.name) {
                continue;
            }
            let session = PlayerSession {
                name: player.name.clone(),
                joined_at: now,
            };
            delta.joined.push(session.clone());
            still_online.push(session);
        }

        self.sessions = still_online;
        delta
    }

    pub fn sessions(&self) -> &[PlayerSession] {
        &self.sessions
    }

    pub fn session(&self, name: &str) -> Option<&PlayerSession> {
        self.sessions.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(names: &[&str]) -> Vec<PlayerRecord> {
        names
            .iter()
            .map(|name| PlayerRecord {
                name: name.to_string(),
                playtime_seconds: 0,
            })
            .collect()
    }

    fn names(tracker: &PresenceTracker) -> Vec<&str> {
        let mut names: Vec<&str> = tracker.sessions().iter().map(|s| s.name.as_str()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_first_snapshot_joins_everyone() {
        let mut tracker = PresenceTracker::new();
        let delta = tracker.diff(&snapshot(&["Alice", "Bob"]), 100);

        assert_eq!(
            delta.joined,
            vec![
                PlayerSession {
                    name: "Alice".to_string(),
                    joined_at: 100
                },
                PlayerSession {
                    name: "Bob".to_string(),
                    joined_at: 100
                },
            ]
        );
        assert!(delta.left.is_empty());
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_join_then_leave_after_65_seconds() {
        let mut tracker = PresenceTracker::new();
        let base = 1700000000;

        assert!(tracker.diff(&snapshot(&[]), base).is_empty());

        let delta = tracker.diff(&snapshot(&["Alice"]), base + 1);
        assert_eq!(delta.joined.len(), 1);
        assert_eq!(delta.joined[0].name, "Alice");

        let delta = tracker.diff(&snapshot(&[]), base + 66);
        assert!(delta.joined.is_empty());
        assert_eq!(
            delta.left,
            vec![PlayerDeparture {
                name: "Alice".to_string(),
                joined_at: base + 1,
                duration: 65,
            }]
        );
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_unchanged_snapshot_has_no_events() {
        let mut tracker = PresenceTracker::new();
        tracker.diff(&snapshot(&["Alice", "Bob"]), 10);

        let delta = tracker.diff(&snapshot(&["Bob", "Alice"]), 20);
        assert!(delta.is_empty());

        // Join times survive unchanged snapshots
        assert_eq!(tracker.session("Alice").unwrap().joined_at, 10);
    }

    #[test]
    fn test_duration_counts_from_first_join() {
        let mut tracker = PresenceTracker::new();
        tracker.diff(&snapshot(&["Alice"]), 0);
        tracker.diff(&snapshot(&["Alice", "Bob"]), 300);
        tracker.diff(&snapshot(&["Alice"]), 600);

        let delta = tracker.diff(&snapshot(&[]), 3725);
        assert_eq!(delta.left.len(), 1);
        assert_eq!(delta.left[0].duration, 3725);
    }

    #[test]
    fn test_mixed_join_and_leave() {
        let mut tracker = PresenceTracker::new();
        tracker.diff(&snapshot(&["Alice", "Bob", "Carol"]), 0);

        let delta = tracker.diff(&snapshot(&["Bob", "Dave"]), 50);
        let joined: Vec<&str> = delta.joined.iter().map(|s| s.name.as_str()).collect();
        let left: Vec<&str> = delta.left.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(joined, vec!["Dave"]);
        assert_eq!(left, vec!["Alice", "Carol"]);
        assert_eq!(names(&tracker), vec!["Bob", "Dave"]);
    }

    #[test]
    fn test_rejoin_opens_new_session() {
        let mut tracker = PresenceTracker::new();
        tracker.diff(&snapshot(&["Alice"]), 0);
        tracker.diff(&snapshot(&[]), 10);

        let delta = tracker.diff(&snapshot(&["Alice"]), 20);
        assert_eq!(delta.joined[0].joined_at, 20);

        let delta = tracker.diff(&snapshot(&[]), 25);
        assert_eq!(delta.left[0].duration, 5);
    }

    #[test]
    fn test_duplicate_names_collapse() {
        let mut tracker = PresenceTracker::new();
        let delta = tracker.diff(&snapshot(&["Alice", "Alice"]), 0);

        assert_eq!(delta.joined.len(), 1);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_tracked_names_follow_latest_snapshot() {
        let sequence: [&[&str]; 6] = [
            &["A", "B"],
            &["B", "C", "D"],
            &[],
            &["D"],
            &["A", "B", "C", "D"],
            &["C"],
        ];

        let mut tracker = PresenceTracker::new();
        for (i, names_in) in sequence.iter().enumerate() {
            tracker.diff(&snapshot(names_in), i as i64 * 10);

            let mut expected: Vec<&str> = names_in.to_vec();
            expected.sort();
            assert_eq!(names(&tracker), expected);
        }
    }

    #[test]
    fn test_clock_going_backwards_clamps_duration() {
        let mut tracker = PresenceTracker::new();
        tracker.diff(&snapshot(&["Alice"]), 100);

        let delta = tracker.diff(&snapshot(&[]), 90);
        assert_eq!(delta.left[0].duration, 0);
    }
}
