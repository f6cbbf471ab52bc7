//! Overall status for the status icon and the "all synced" signal

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::logic::sync_events::effective_state;
use crate::model::syncthing::{Folder, FolderState, FolderStatus, TransferRate};

/// One-word summary of the whole monitor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StatusSummary {
    Disconnected,
    /// Every folder is paused
    Paused,
    /// At least one folder is effectively syncing
    Syncing,
    /// Nothing is syncing but data is moving above the activity threshold
    Transferring,
    UpToDate,
}

pub fn summarize(
    connected: bool,
    folders: &[Folder],
    statuses: &HashMap<String, FolderStatus>,
    total_rate: TransferRate,
    remaining_bytes_threshold: u64,
    activity_threshold: f64,
) -> StatusSummary {
    if !connected {
        return StatusSummary::Disconnected;
    }
    if !folders.is_empty() && folders.iter().all(|f| f.paused) {
        return StatusSummary::Paused;
    }

    let syncing = folders
        .iter()
        .filter(|f| !f.paused)
        .filter_map(|f| statuses.get(&f.id))
        .any(|s| effective_state(s, remaining_bytes_threshold) == FolderState::Syncing);
    if syncing {
        StatusSummary::Syncing
    } else if total_rate.combined() > activity_threshold {
        StatusSummary::Transferring
    } else {
        StatusSummary::UpToDate
    }
}

/// True when at least one folder is active and every active folder is idle
pub fn all_folders_synced(
    folders: &[Folder],
    statuses: &HashMap<String, FolderStatus>,
    remaining_bytes_threshold: u64,
) -> bool {
    let mut active = folders.iter().filter(|f| !f.paused).peekable();
    if active.peek().is_none() {
        return false;
    }
    active.all(|f| {
        statuses
            .get(&f.id)
            .map(|s| effective_state(s, remaining_bytes_threshold) == FolderState::Idle)
            .unwrap_or(false)
    })
}

/// Edge detector with a minimum spacing for the "all synced" notification
#[derive(Clone, Debug, Default)]
pub struct AllSyncedGuard {
    was_synced: Option<bool>,
    last_notified: Option<DateTime<Utc>>,
}

impl AllSyncedGuard {
    /// Returns true when the notification should go out now
    pub fn observe(&mut self, all_synced: bool, now: DateTime<Utc>, min_interval: Duration) -> bool {
        let previous = self.was_synced.replace(all_synced);
        let edge = matches!(previous, Some(false)) && all_synced;
        if !edge {
            return false;
        }
        let spaced = self
            .last_notified
            .map(|at| now - at >= min_interval)
            .unwrap_or(true);
        if spaced {
            self.last_notified = Some(now);
        }
        spaced
    }

    /// Forget the previous state, e.g. after a reconnect
    pub fn reset(&mut self) {
        self.was_synced = None;
    }
}
