//! Sync event and stall tracking
//!
//! Each folder runs a small state machine over its *effective* state: a folder
//! that reports `syncing` but only has a negligible remainder left (at or below
//! the configured threshold) counts as idle, which keeps the event list from
//! flickering while the daemon finishes the last few blocks.
//!
//! While a folder is raw-`syncing` a stall tracker watches its outstanding
//! bytes/files. No change for the configured number of minutes (never less
//! than one) raises a single stall signal; the latch is released once the
//! outstanding work shrinks again.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::MonitorSettings;
use crate::logic::formatting::{format_bytes, format_remaining};
use crate::model::syncthing::{Folder, FolderState, FolderStatus};

/// Lower bound for the stall window regardless of settings
pub const MIN_STALL_SECS: i64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SyncEventKind {
    Started,
    Completed,
    Idle,
}

/// A folder transition worth showing in the activity list
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SyncEvent {
    pub folder_id: String,
    pub folder_name: String,
    pub kind: SyncEventKind,
    pub timestamp: DateTime<Utc>,
    pub detail: Option<String>,
}

/// Progress bookkeeping for a folder that is currently syncing
#[derive(Clone, Debug, PartialEq)]
pub struct StallTracker {
    pub sync_start: DateTime<Utc>,
    pub last_progress: DateTime<Utc>,
    pub last_need_bytes: u64,
    pub last_need_files: u64,
    pub last_notified: Option<DateTime<Utc>>,
}

/// What one folder observation asks the caller to signal
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FolderSignals {
    pub event: Option<SyncEvent>,
    /// Send a "sync completed" notification
    pub notify_completed: bool,
    /// Minutes without progress, when a stall alert is due
    pub stalled_minutes: Option<i64>,
}

pub fn is_effectively_complete(status: &FolderStatus, remaining_bytes_threshold: u64) -> bool {
    status.need_bytes <= remaining_bytes_threshold
}

/// Smoothed state: idle when the daemon says so or nothing meaningful is left
pub fn effective_state(status: &FolderStatus, remaining_bytes_threshold: u64) -> FolderState {
    if status.state == FolderState::Idle || is_effectively_complete(status, remaining_bytes_threshold) {
        FolderState::Idle
    } else {
        status.state.clone()
    }
}

fn stall_window(settings: &MonitorSettings) -> Duration {
    let configured = i64::try_from(settings.stall_minutes)
        .unwrap_or(i64::MAX)
        .saturating_mul(60)
        .min(i64::MAX / 1000);
    Duration::seconds(configured.max(MIN_STALL_SECS))
}

#[derive(Clone, Debug)]
pub struct SyncEventTracker {
    effective: HashMap<String, FolderState>,
    stalls: HashMap<String, StallTracker>,
    events: VecDeque<SyncEvent>,
    event_capacity: usize,
}

impl SyncEventTracker {
    pub fn new(event_capacity: usize) -> Self {
        Self {
            effective: HashMap::new(),
            stalls: HashMap::new(),
            events: VecDeque::new(),
            event_capacity: event_capacity.max(1),
        }
    }

    /// Feed one folder's status from this poll
    ///
    /// The first observation of a folder only records its state; a monitor
    /// that starts while a folder is mid-sync does not report a start it never
    /// saw.
    pub fn observe(
        &mut self,
        folder: &Folder,
        status: &FolderStatus,
        settings: &MonitorSettings,
        now: DateTime<Utc>,
    ) -> FolderSignals {
        let mut signals = FolderSignals::default();
        let threshold = settings.remaining_bytes_threshold;
        let complete = is_effectively_complete(status, threshold);
        let current = effective_state(status, threshold);
        let previous = self.effective.insert(folder.id.clone(), current.clone());

        if let Some(previous) = previous.filter(|prev| *prev != current) {
            let event = match (&previous, &current) {
                (_, FolderState::Syncing) => {
                    let detail = (status.need_files > 0)
                        .then(|| format!("{} files to sync", status.need_files));
                    Some((SyncEventKind::Started, detail))
                }
                (FolderState::Syncing, FolderState::Idle) if complete => {
                    signals.notify_completed =
                        settings.notify_sync_completed && settings.completion_allowed(&folder.id);
                    let detail = if status.need_bytes == 0 {
                        "All files up to date".to_string()
                    } else {
                        format!(
                            "Up to date ({} left within tolerance)",
                            format_bytes(status.need_bytes)
                        )
                    };
                    Some((SyncEventKind::Completed, Some(detail)))
                }
                (FolderState::Syncing, FolderState::Idle) => Some((
                    SyncEventKind::Idle,
                    Some(format_remaining(status.need_files, status.need_bytes)),
                )),
                _ => None,
            };

            if let Some((kind, detail)) = event {
                let event = SyncEvent {
                    folder_id: folder.id.clone(),
                    folder_name: folder.display_name().to_string(),
                    kind,
                    timestamp: now,
                    detail,
                };
                self.push_event(event.clone());
                signals.event = Some(event);
            }
        }

        signals.stalled_minutes = self.track_stall(&folder.id, status, settings, now);
        signals
    }

    fn track_stall(
        &mut self,
        folder_id: &str,
        status: &FolderStatus,
        settings: &MonitorSettings,
        now: DateTime<Utc>,
    ) -> Option<i64> {
        if status.state != FolderState::Syncing || !settings.stall_alerts_enabled {
            self.stalls.remove(folder_id);
            return None;
        }

        let tracker = self
            .stalls
            .entry(folder_id.to_string())
            .or_insert_with(|| StallTracker {
                sync_start: now,
                last_progress: now,
                last_need_bytes: status.need_bytes,
                last_need_files: status.need_files,
                last_notified: None,
            });

        let bytes_changed = status.need_bytes != tracker.last_need_bytes;
        let files_changed = status.need_files != tracker.last_need_files;
        if bytes_changed || files_changed {
            tracker.last_progress = now;
            if status.need_bytes < tracker.last_need_bytes || status.need_files < tracker.last_need_files {
                tracker.last_notified = None;
            }
            tracker.last_need_bytes = status.need_bytes;
            tracker.last_need_files = status.need_files;
        }

        let since_progress = now - tracker.last_progress;
        if since_progress >= stall_window(settings) && tracker.last_notified.is_none() {
            tracker.last_notified = Some(now);
            return Some(since_progress.num_minutes());
        }
        None
    }

    fn push_event(&mut self, event: SyncEvent) {
        self.events.push_front(event);
        self.events.truncate(self.event_capacity);
    }

    /// Drop stall trackers, e.g. when stall alerts get switched off
    pub fn clear_stalls(&mut self) {
        self.stalls.clear();
    }

    /// Forget folders that are no longer configured
    pub fn retain_folders<F>(&mut self, keep: F)
    where
        F: Fn(&str) -> bool,
    {
        self.effective.retain(|id, _| keep(id));
        self.stalls.retain(|id, _| keep(id));
    }

    pub fn set_event_capacity(&mut self, capacity: usize) {
        self.event_capacity = capacity.max(1);
        self.events.truncate(self.event_capacity);
    }

    /// Events, most recent first
    pub fn events(&self) -> &VecDeque<SyncEvent> {
        &self.events
    }

    pub fn effective_state_of(&self, folder_id: &str) -> Option<&FolderState> {
        self.effective.get(folder_id)
    }

    pub fn stall(&self, folder_id: &str) -> Option<&StallTracker> {
        self.stalls.get(folder_id)
    }
}
