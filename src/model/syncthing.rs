//! Syncthing Domain Model
//!
//! Typed snapshots of what the daemon reports: configured devices and folders,
//! per-connection byte counters, folder sync status and per-device completion.
//! The gateway translates wire responses into these types, so nothing past that
//! boundary branches on raw status strings.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::logic::errors::ErrorType;

/// Per-device connection snapshots keyed by device ID
pub type Connections = HashMap<String, ConnectionSnapshot>;

/// Configured remote device
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub paused: bool,
    pub addresses: Vec<String>,
}

impl Device {
    /// Name shown to users, falling back to the device ID
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Configured shared folder
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub label: String,
    pub path: String,
    pub paused: bool,
    /// IDs of the devices this folder is shared with
    pub devices: Vec<String>,
}

impl Folder {
    /// Label shown to users, falling back to the folder ID
    pub fn display_name(&self) -> &str {
        if self.label.is_empty() {
            &self.id
        } else {
            &self.label
        }
    }
}

/// One device's connection as reported in a single poll
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    pub connected: bool,
    pub address: Option<String>,
    pub client_version: Option<String>,
    /// Transport type, e.g. "tcp-client" or "quic-server"
    pub transport: Option<String>,
    /// Cumulative bytes received from this device
    pub in_bytes_total: u64,
    /// Cumulative bytes sent to this device
    pub out_bytes_total: u64,
}

/// Folder state reported by the daemon
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FolderState {
    Idle,
    Scanning,
    ScanWaiting,
    SyncPreparing,
    SyncWaiting,
    Syncing,
    Cleaning,
    Error,
    /// Any value this monitor does not know about
    Other(String),
}

impl FolderState {
    /// Translate the daemon's state tag into a typed state
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "idle" => FolderState::Idle,
            "scanning" => FolderState::Scanning,
            "scan-waiting" => FolderState::ScanWaiting,
            "sync-preparing" => FolderState::SyncPreparing,
            "sync-waiting" => FolderState::SyncWaiting,
            "syncing" => FolderState::Syncing,
            "cleaning" => FolderState::Cleaning,
            "error" => FolderState::Error,
            _ => FolderState::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FolderState::Idle => "idle",
            FolderState::Scanning => "scanning",
            FolderState::ScanWaiting => "scan-waiting",
            FolderState::SyncPreparing => "sync-preparing",
            FolderState::SyncWaiting => "sync-waiting",
            FolderState::Syncing => "syncing",
            FolderState::Cleaning => "cleaning",
            FolderState::Error => "error",
            FolderState::Other(raw) => raw,
        }
    }
}

impl fmt::Display for FolderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Folder sync status from a single poll
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FolderStatus {
    pub state: FolderState,
    pub global_files: u64,
    pub global_bytes: u64,
    pub local_files: u64,
    pub local_bytes: u64,
    pub need_files: u64,
    pub need_bytes: u64,
}

impl FolderStatus {
    /// Local completion percentage derived from global and needed bytes
    pub fn completion(&self) -> f64 {
        if self.global_bytes == 0 {
            return 100.0;
        }
        let complete = self.global_bytes.saturating_sub(self.need_bytes);
        (complete as f64 / self.global_bytes as f64 * 100.0).clamp(0.0, 100.0)
    }
}

/// How far a remote device is with its shared folders
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceCompletion {
    /// Percentage in [0, 100]
    pub completion: f64,
    pub global_bytes: u64,
    pub need_bytes: u64,
}

/// Daemon system status
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub my_id: String,
    pub uptime: u64,
    pub start_time: String,
}

/// Download and upload rate in bytes per second
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferRate {
    pub download: f64,
    pub upload: f64,
}

impl TransferRate {
    pub const ZERO: TransferRate = TransferRate {
        download: 0.0,
        upload: 0.0,
    };

    pub fn new(download: f64, upload: f64) -> Self {
        Self { download, upload }
    }

    /// Sum of two rates
    pub fn plus(self, other: TransferRate) -> Self {
        Self {
            download: self.download + other.download,
            upload: self.upload + other.upload,
        }
    }

    pub fn combined(&self) -> f64 {
        self.download + self.upload
    }
}

/// Reachability of the daemon's API
#[derive(Clone, Debug, PartialEq)]
pub enum ConnectionState {
    /// No cycle has finished yet
    Connecting,
    /// Last system status fetch succeeded
    Connected,
    /// Last cycle could not reach the daemon, or was rejected
    Disconnected {
        error_type: ErrorType,
        message: String,
    },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}
