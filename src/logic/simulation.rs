//! Synthetic data for demo and screenshot mode
//!
//! Each scenario is a pure data-generation policy: the same parameters, tick
//! and timestamp always produce the same state. Nothing here changes how the
//! trackers behave.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::history::RollingHistory;
use crate::logic::rates::RateUpdate;
use crate::model::shadow::ObservedState;
use crate::model::syncthing::{
    ConnectionSnapshot, Device, DeviceCompletion, Folder, FolderState, FolderStatus, TransferRate,
};

/// Spacing of pre-filled synthetic history samples
pub const SAMPLE_SPACING_SECS: i64 = 5;

const DEVICE_NAMES: &[&str] = &[
    "Laptop",
    "Desktop",
    "Phone",
    "NAS",
    "Tablet",
    "Workstation",
    "Media Center",
    "Backup Server",
];

const FOLDER_LABELS: &[&str] = &[
    "Documents",
    "Photos",
    "Music",
    "Projects",
    "Backups",
    "Camera Uploads",
    "Notes",
    "Downloads",
];

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Everything connected and up to date, near-zero traffic
    AllSynced,
    /// Some devices offline, folders in assorted states
    MixedActivity,
    /// Every device connected, every folder syncing at high rates
    HighThroughput,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::AllSynced => "all-synced",
            Scenario::MixedActivity => "mixed-activity",
            Scenario::HighThroughput => "high-throughput",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all-synced" | "synced" => Ok(Scenario::AllSynced),
            "mixed-activity" | "mixed" => Ok(Scenario::MixedActivity),
            "high-throughput" | "busy" => Ok(Scenario::HighThroughput),
            other => Err(format!(
                "unknown scenario '{}' (expected all-synced, mixed-activity or high-throughput)",
                other
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationParams {
    pub device_count: usize,
    pub folder_count: usize,
    pub scenario: Scenario,
}

pub fn device_id(index: usize) -> String {
    format!("SIMDEV{:02}-{:07X}", index + 1, (index as u64 + 1) * 0x10_4A3F)
}

pub fn folder_id(index: usize) -> String {
    format!("sim-folder-{:02}", index + 1)
}

fn device_name(index: usize) -> String {
    match DEVICE_NAMES.get(index) {
        Some(name) => name.to_string(),
        None => format!("Device {}", index + 1),
    }
}

fn folder_label(index: usize) -> String {
    match FOLDER_LABELS.get(index) {
        Some(label) => label.to_string(),
        None => format!("Folder {}", index + 1),
    }
}

fn device_connected(scenario: Scenario, index: usize) -> bool {
    match scenario {
        Scenario::MixedActivity => index % 3 != 2,
        Scenario::AllSynced | Scenario::HighThroughput => true,
    }
}

/// Deterministic rate for one device at one tick
pub fn device_rate(scenario: Scenario, index: usize, tick: u64) -> TransferRate {
    if !device_connected(scenario, index) {
        return TransferRate::ZERO;
    }
    let phase = tick as f64 * 0.35 + index as f64 * 1.7;
    let wave = 1.0 + 0.5 * phase.sin();
    let (down, up) = match scenario {
        Scenario::AllSynced => (0.2 * KIB, 0.1 * KIB),
        Scenario::MixedActivity => {
            let weight = (index % 4) as f64;
            (weight * 150.0 * KIB, weight * 40.0 * KIB)
        }
        Scenario::HighThroughput => (
            (8.0 + index as f64 * 3.0) * MIB,
            (2.0 + index as f64) * MIB,
        ),
    };
    TransferRate::new(down * wave, up * (2.0 - wave))
}

fn folder_status(scenario: Scenario, index: usize) -> FolderStatus {
    let global_files = 1_000 + index as u64 * 250;
    let global_bytes = (2_u64 << 30) + index as u64 * (512 << 20);
    let (state, need_files, need_bytes) = match scenario {
        Scenario::AllSynced => (FolderState::Idle, 0, 0),
        Scenario::MixedActivity => match index % 3 {
            0 => (FolderState::Syncing, 42, 350 << 20),
            1 => (FolderState::Idle, 0, 0),
            _ => (FolderState::Scanning, 0, 0),
        },
        Scenario::HighThroughput => (
            FolderState::Syncing,
            global_files / 2,
            global_bytes / 2,
        ),
    };
    FolderStatus {
        state,
        global_files,
        global_bytes,
        local_files: global_files - need_files,
        local_bytes: global_bytes - need_bytes,
        need_files,
        need_bytes,
    }
}

fn completion(scenario: Scenario, index: usize) -> DeviceCompletion {
    let global_bytes = 8_u64 << 30;
    let percent = match scenario {
        Scenario::AllSynced => 100.0,
        Scenario::MixedActivity => [100.0, 87.5, 42.0][index % 3],
        Scenario::HighThroughput => 50.0 + (index % 5) as f64 * 10.0,
    };
    let need_bytes = (global_bytes as f64 * (100.0 - percent) / 100.0) as u64;
    DeviceCompletion {
        completion: percent,
        global_bytes,
        need_bytes,
    }
}

fn rate_update(params: &SimulationParams, tick: u64) -> RateUpdate {
    let mut per_device = HashMap::with_capacity(params.device_count);
    let mut total = TransferRate::ZERO;
    for index in 0..params.device_count {
        let rate = device_rate(params.scenario, index, tick);
        total = total.plus(rate);
        per_device.insert(device_id(index), rate);
    }
    RateUpdate { per_device, total }
}

/// Build a complete synthetic state with pre-filled history ending at `now`
pub fn generate(params: &SimulationParams, now: DateTime<Utc>, history_capacity: usize) -> ObservedState {
    let scenario = params.scenario;
    let mut state = ObservedState::new(history_capacity);

    state.devices = (0..params.device_count)
        .map(|i| Device {
            id: device_id(i),
            name: device_name(i),
            paused: false,
            addresses: vec![format!("tcp://192.0.2.{}:22000", 10 + i % 200)],
        })
        .collect();

    state.folders = (0..params.folder_count)
        .map(|i| Folder {
            id: folder_id(i),
            label: folder_label(i),
            path: format!("/srv/sync/{}", folder_label(i).to_lowercase().replace(' ', "-")),
            paused: false,
            devices: state.devices.iter().map(|d| d.id.clone()).collect(),
        })
        .collect();

    for i in 0..params.device_count {
        let connected = device_connected(scenario, i);
        let rate = device_rate(scenario, i, 0);
        state.connections.insert(
            device_id(i),
            ConnectionSnapshot {
                connected,
                address: connected.then(|| format!("192.0.2.{}:22000", 10 + i % 200)),
                client_version: connected.then(|| "v1.27.0".to_string()),
                transport: connected
                    .then(|| (if i % 2 == 0 { "tcp-client" } else { "quic-server" }).to_string()),
                in_bytes_total: (rate.download * 3600.0) as u64,
                out_bytes_total: (rate.upload * 3600.0) as u64,
            },
        );
        state.completions.insert(device_id(i), completion(scenario, i));
    }

    for i in 0..params.folder_count {
        state.folder_statuses.insert(folder_id(i), folder_status(scenario, i));
    }

    // Oldest sample first so the ring ends at `now`
    let samples = history_capacity.max(1) as i64;
    for step in 0..samples {
        let at = now - Duration::seconds((samples - 1 - step) * SAMPLE_SPACING_SECS);
        let update = rate_update(params, step as u64);
        for (id, rate) in &update.per_device {
            state
                .device_history
                .entry(id.clone())
                .or_insert_with(|| RollingHistory::new(history_capacity))
                .add_data_point(at, *rate);
        }
        state.total_history.add_data_point(at, update.total);
        state.rates = update.per_device;
        state.total_rate = update.total;
    }

    state
}

/// Append one synthetic sample per device for the given tick
pub fn advance(state: &mut ObservedState, params: &SimulationParams, tick: u64, now: DateTime<Utc>) {
    let update = rate_update(params, tick + state.history_capacity() as u64);
    for (id, rate) in &update.per_device {
        if let Some(connection) = state.connections.get_mut(id) {
            connection.in_bytes_total += (rate.download * SAMPLE_SPACING_SECS as f64) as u64;
            connection.out_bytes_total += (rate.upload * SAMPLE_SPACING_SECS as f64) as u64;
        }
    }
    state.record_rates(&update, now);
}
