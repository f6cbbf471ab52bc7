//! Monitor: the single writer behind the published snapshot
//!
//! A refresh cycle fetches everything first and hands the results over in one
//! [`CycleResults`] value. Applying it is synchronous, so a cycle is either
//! committed whole or not at all.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::config::MonitorSettings;
use crate::logic::connections::ConnectionHistoryTracker;
use crate::logic::errors::{classify_error, format_error_message, ApiError};
use crate::logic::rates::TransferRateCalculator;
use crate::logic::simulation::SimulationParams;
use crate::logic::status::{all_folders_synced, summarize, AllSyncedGuard};
use crate::logic::sync_events::SyncEventTracker;
use crate::model::shadow::DataSourceSwitch;
use crate::model::syncthing::{
    ConnectionState, Connections, DeviceCompletion, FolderStatus, SystemStatus,
};
use crate::model::Snapshot;
use crate::services::gateway::DaemonConfig;
use crate::services::notify::NotificationSink;

// Largest span chrono::Duration accepts in seconds
const MAX_INTERVAL_SECS: i64 = i64::MAX / 1000;

/// Everything one refresh cycle fetched after reaching the daemon
///
/// `None` and missing map entries mean that sub-fetch failed.
#[derive(Clone, Debug)]
pub struct CycleResults {
    pub system_status: SystemStatus,
    pub config: Option<DaemonConfig>,
    pub version: Option<String>,
    pub connections: Option<Connections>,
    pub folder_statuses: HashMap<String, FolderStatus>,
    pub completions: HashMap<String, DeviceCompletion>,
    /// Most recent sub-fetch failure
    pub last_error: Option<ApiError>,
    /// First sub-fetch rejected with 401/403; forces the disconnected state
    pub auth_error: Option<ApiError>,
}

impl CycleResults {
    pub fn new(system_status: SystemStatus) -> Self {
        Self {
            system_status,
            config: None,
            version: None,
            connections: None,
            folder_statuses: HashMap::new(),
            completions: HashMap::new(),
            last_error: None,
            auth_error: None,
        }
    }

    /// Keep a sub-fetch failure; cancellation is not a failure
    pub fn record_error(&mut self, error: ApiError) {
        if error.is_cancelled() {
            return;
        }
        if error.is_auth_failure() && self.auth_error.is_none() {
            self.auth_error = Some(error.clone());
        }
        self.last_error = Some(error);
    }
}

/// Which simulated entity a pause/resume applies to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PauseTarget {
    Device(String),
    Folder(String),
    All,
}

pub struct Monitor {
    settings: MonitorSettings,
    switch: DataSourceSwitch,
    rates: TransferRateCalculator,
    connections: ConnectionHistoryTracker,
    sync_events: SyncEventTracker,
    all_synced: AllSyncedGuard,
    connection_state: ConnectionState,
    system_status: Option<SystemStatus>,
    version: Option<String>,
    last_error: Option<String>,
    last_refresh: Option<DateTime<Utc>>,
}

impl Monitor {
    pub fn new(settings: MonitorSettings) -> Self {
        Self {
            switch: DataSourceSwitch::new(settings.history_capacity),
            rates: TransferRateCalculator::new(),
            connections: ConnectionHistoryTracker::new(),
            sync_events: SyncEventTracker::new(settings.event_capacity),
            all_synced: AllSyncedGuard::default(),
            connection_state: ConnectionState::Connecting,
            system_status: None,
            version: None,
            last_error: None,
            last_refresh: None,
            settings,
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn is_simulated(&self) -> bool {
        self.switch.is_simulated()
    }

    pub fn connection_state(&self) -> &ConnectionState {
        &self.connection_state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Folder and device IDs from the last successful config fetch
    pub fn known_ids(&self) -> (Vec<String>, Vec<String>) {
        let real = self.switch.real();
        (
            real.folders.iter().map(|f| f.id.clone()).collect(),
            real.devices.iter().map(|d| d.id.clone()).collect(),
        )
    }

    /// Commit one cycle that reached the daemon
    pub fn apply_cycle(&mut self, results: CycleResults, now: DateTime<Utc>, notifier: &dyn NotificationSink) {
        let settings = self.settings.clone();
        let CycleResults {
            system_status,
            config,
            version,
            connections,
            folder_statuses,
            completions,
            last_error,
            auth_error,
        } = results;

        self.system_status = Some(system_status);
        if version.is_some() {
            self.version = version;
        }

        let real = self.switch.real_mut();
        if let Some(config) = config {
            let folder_ids: HashSet<String> = config.folders.iter().map(|f| f.id.clone()).collect();
            real.devices = config.devices;
            real.folders = config.folders;
            self.sync_events.retain_folders(|id| folder_ids.contains(id));
        }

        // Failed per-entity fetches keep the previous value while the entity exists
        let folder_ids: HashSet<&str> = real.folders.iter().map(|f| f.id.as_str()).collect();
        real.folder_statuses.retain(|id, _| folder_ids.contains(id.as_str()));
        real.folder_statuses.extend(folder_statuses.clone());
        let device_ids: HashSet<&str> = real.devices.iter().map(|d| d.id.as_str()).collect();
        real.completions.retain(|id, _| device_ids.contains(id.as_str()));
        real.completions.extend(completions);

        if let Some(connections) = connections {
            if let Some(update) = self.rates.update(&connections, now) {
                real.record_rates(&update, now);
            }
            real.connections = connections;

            for edge in self.connections.observe(&real.connections, now) {
                let name = real
                    .device(&edge.device_id)
                    .map(|d| d.display_name().to_string())
                    .unwrap_or_else(|| edge.device_id.clone());
                debug!(device = %edge.device_id, connected = edge.connected, "Connectivity edge");
                let announce = !edge.first_sighting || settings.notify_first_sighting;
                if settings.notify_device_connectivity && announce {
                    notifier.notify_device_connectivity(&name, edge.connected);
                }
            }
        }

        if !settings.stall_alerts_enabled {
            self.sync_events.clear_stalls();
        }
        for folder in &real.folders {
            let Some(status) = folder_statuses.get(&folder.id) else {
                continue;
            };
            let signals = self.sync_events.observe(folder, status, &settings, now);
            if let Some(event) = &signals.event {
                info!(folder = %folder.id, kind = ?event.kind, "Sync event");
            }
            if signals.notify_completed {
                notifier.notify_sync_completed(folder.display_name());
            }
            if let Some(minutes) = signals.stalled_minutes {
                warn!(folder = %folder.id, minutes, "Sync stalled");
                notifier.notify_stalled(folder.display_name(), minutes);
            }
        }

        self.connection_state = match &auth_error {
            Some(error) => ConnectionState::Disconnected {
                error_type: classify_error(error),
                message: format_error_message(error),
            },
            None => ConnectionState::Connected,
        };

        if self.connection_state.is_connected() {
            let all_synced = all_folders_synced(
                &real.folders,
                &real.folder_statuses,
                settings.remaining_bytes_threshold,
            );
            let min_interval = Duration::seconds(
                i64::try_from(settings.all_synced_min_interval_secs)
                    .unwrap_or(i64::MAX)
                    .min(MAX_INTERVAL_SECS),
            );
            if self.all_synced.observe(all_synced, now, min_interval) && settings.notify_all_synced {
                notifier.notify_all_synced();
            }
        }

        self.last_error = last_error.as_ref().map(format_error_message);
        if let Some(message) = &self.last_error {
            warn!(error = %message, "Refresh completed with errors");
        }

        self.switch.advance_simulated(now);
        self.last_refresh = Some(now);
    }

    /// Commit a cycle that could not reach the daemon
    pub fn apply_disconnect(&mut self, error: &ApiError, now: DateTime<Utc>) {
        if error.is_cancelled() {
            return;
        }
        let message = format_error_message(error);
        if self.connection_state.is_connected() {
            warn!(error = %message, "Lost connection to daemon");
        } else {
            debug!(error = %message, "Daemon unreachable");
        }

        self.switch.real_mut().clear_entities();
        self.rates.reset();
        self.connections.freeze();
        self.sync_events.clear_stalls();
        self.all_synced.reset();

        self.connection_state = ConnectionState::Disconnected {
            error_type: classify_error(error),
            message: message.clone(),
        };
        self.system_status = None;
        self.last_error = Some(message);

        self.switch.advance_simulated(now);
        self.last_refresh = Some(now);
    }

    /// Store a failure that happened outside a refresh cycle, e.g. a command
    pub fn record_error(&mut self, error: &ApiError) {
        if !error.is_cancelled() {
            self.last_error = Some(format_error_message(error));
        }
    }

    /// Swap settings; the next cycle sees the new values
    pub fn update_settings(&mut self, settings: MonitorSettings) {
        if settings.history_capacity != self.settings.history_capacity {
            self.switch.set_history_capacity(settings.history_capacity);
        }
        if settings.event_capacity != self.settings.event_capacity {
            self.sync_events.set_event_capacity(settings.event_capacity);
        }
        if !settings.stall_alerts_enabled {
            self.sync_events.clear_stalls();
        }
        self.settings = settings;
    }

    pub fn enable_simulated(&mut self, params: SimulationParams, now: DateTime<Utc>) {
        info!(
            scenario = %params.scenario,
            devices = params.device_count,
            folders = params.folder_count,
            "Simulated data enabled"
        );
        self.switch.enable_simulated(params, now);
    }

    /// Returns whether simulated mode was active
    pub fn disable_simulated(&mut self) -> bool {
        let was_active = self.switch.disable_simulated();
        if was_active {
            info!("Simulated data disabled");
        }
        was_active
    }

    /// Apply a pause/resume to the synthetic state only
    ///
    /// Returns the display name of the target, or `None` when not simulated
    /// or the target is unknown.
    pub fn pause_simulated(&mut self, target: &PauseTarget, paused: bool) -> Option<String> {
        let state = self.switch.simulated_mut()?;
        match target {
            PauseTarget::Device(id) => {
                if !state.set_device_paused(id, paused) {
                    return None;
                }
                state.device(id).map(|d| d.display_name().to_string())
            }
            PauseTarget::Folder(id) => {
                if !state.set_folder_paused(id, paused) {
                    return None;
                }
                state.folder(id).map(|f| f.display_name().to_string())
            }
            PauseTarget::All => {
                state.set_all_devices_paused(paused);
                Some("all devices".to_string())
            }
        }
    }

    /// Display name for a command target in the published state
    pub fn target_name(&self, target: &PauseTarget) -> String {
        let published = self.switch.published();
        match target {
            PauseTarget::Device(id) => published
                .device(id)
                .map(|d| d.display_name().to_string())
                .unwrap_or_else(|| id.clone()),
            PauseTarget::Folder(id) => published
                .folder(id)
                .map(|f| f.display_name().to_string())
                .unwrap_or_else(|| id.clone()),
            PauseTarget::All => "all devices".to_string(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let published = self.switch.published();
        let connected = self.connection_state.is_connected() || self.switch.is_simulated();
        let summary = summarize(
            connected,
            &published.folders,
            &published.folder_statuses,
            published.total_rate,
            self.settings.remaining_bytes_threshold,
            self.settings.activity_threshold_bytes_per_sec,
        );

        // Tracker state describes real entities; keep it out of a synthetic view
        let (connection_history, sync_events) = if self.switch.is_simulated() {
            (HashMap::new(), Vec::new())
        } else {
            (
                self.connections.entries().clone(),
                self.sync_events.events().iter().cloned().collect(),
            )
        };

        Snapshot {
            source: self.switch.source(),
            connection_state: self.connection_state.clone(),
            system_status: self.system_status.clone(),
            version: self.version.clone(),
            observed: published.clone(),
            connection_history,
            sync_events,
            last_error: self.last_error.clone(),
            last_refresh: self.last_refresh,
            summary,
        }
    }
}
