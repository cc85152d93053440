use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityState {
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityEvent {
    BecameOffline,
    BecameOnline,
}

/// Online/offline state of the monitored server, derived from fetch outcomes.
///
/// Starts Online and only reports changes, so an outage of any length yields a
/// single `BecameOffline` and a single `BecameOnline`.
#[derive(Debug)]
pub struct AvailabilityMonitor {
    state: AvailabilityState,
}

impl Default for AvailabilityMonitor {
    fn default() -> Self {
        Self {
            state: AvailabilityState::Online,
        }
    }
}

impl AvailabilityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AvailabilityState {
        self.state
    }

    /// Record one fetch outcome and return the transition it caused, if any.
    pub fn update(&mut self, fetch_succeeded: bool) -> Option<AvailabilityEvent> {
        match (self.state, fetch_succeeded) {
            (AvailabilityState::Online, false) => {
                self.state = AvailabilityState::Offline;
                Some(AvailabilityEvent::BecameOffline)
            }
            (AvailabilityState::Offline, true) => {
                self.state = AvailabilityState::Online;
                Some(AvailabilityEvent::BecameOnline)
            }
            _ => None,
        }
    }
}
