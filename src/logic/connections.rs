//! Per-device connection history
//!
//! Watches each poll's connection snapshots for connect/disconnect edges and
//! keeps "connected since" and "last seen" timestamps. Signals fire only on an
//! edge; identical consecutive states never re-fire.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::syncthing::Connections;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ConnectionHistory {
    /// Set on a disconnected -> connected edge, cleared on disconnect
    pub connected_since: Option<DateTime<Utc>>,
    /// Last poll that saw the device connected
    pub last_seen: Option<DateTime<Utc>>,
    pub is_currently_connected: bool,
}

/// A connectivity transition seen between two polls
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectivityEdge {
    pub device_id: String,
    pub connected: bool,
    /// The device had no history before this poll
    pub first_sighting: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ConnectionHistoryTracker {
    entries: HashMap<String, ConnectionHistory>,
}

impl ConnectionHistoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update every device's history from this poll's snapshots
    ///
    /// Devices missing from `connections` are dropped silently; a device that
    /// was removed from the config is not a disconnect.
    pub fn observe(&mut self, connections: &Connections, now: DateTime<Utc>) -> Vec<ConnectivityEdge> {
        self.entries.retain(|id, _| connections.contains_key(id));

        let mut edges = Vec::new();
        for (device_id, snapshot) in connections {
            let first_sighting = !self.entries.contains_key(device_id);
            let entry = self.entries.entry(device_id.clone()).or_default();

            match (entry.is_currently_connected, snapshot.connected) {
                (false, true) => {
                    entry.connected_since = Some(now);
                    entry.last_seen = Some(now);
                    entry.is_currently_connected = true;
                    edges.push(ConnectivityEdge {
                        device_id: device_id.clone(),
                        connected: true,
                        first_sighting,
                    });
                }
                (true, false) => {
                    entry.connected_since = None;
                    entry.last_seen = Some(now);
                    entry.is_currently_connected = false;
                    edges.push(ConnectivityEdge {
                        device_id: device_id.clone(),
                        connected: false,
                        first_sighting: false,
                    });
                }
                (true, true) => {
                    entry.last_seen = Some(now);
                }
                (false, false) => {}
            }
        }

        edges.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        edges
    }

    pub fn get(&self, device_id: &str) -> Option<&ConnectionHistory> {
        self.entries.get(device_id)
    }

    pub fn entries(&self) -> &HashMap<String, ConnectionHistory> {
        &self.entries
    }

    /// Mark every device disconnected without emitting edges
    ///
    /// Used when the daemon itself is unreachable: devices were not seen, but
    /// nothing says they went away.
    pub fn freeze(&mut self) {
        for entry in self.entries.values_mut() {
            entry.is_currently_connected = false;
            entry.connected_since = None;
        }
    }
}
