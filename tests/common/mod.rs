//! Fake collaborators shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::Notify;

use stmon::config::MonitorSettings;
use stmon::logic::errors::{ApiError, CredentialError};
use stmon::model::syncthing::{
    ConnectionSnapshot, Connections, Device, DeviceCompletion, Folder, FolderState, FolderStatus,
    SystemStatus,
};
use stmon::services::{
    Clock, CredentialProvider, Credentials, DaemonConfig, NotificationSink, Poller, StatusGateway,
};

pub fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(t0()),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    Connectivity(String, bool),
    Completed(String),
    Stalled(String, i64),
    PauseResume(String, bool),
    AllSynced,
}

#[derive(Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<Notification> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, notification: Notification) {
        self.calls.lock().unwrap().push(notification);
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify_device_connectivity(&self, device_name: &str, connected: bool) {
        self.push(Notification::Connectivity(device_name.to_string(), connected));
    }

    fn notify_sync_completed(&self, folder_name: &str) {
        self.push(Notification::Completed(folder_name.to_string()));
    }

    fn notify_stalled(&self, folder_name: &str, minutes_since_progress: i64) {
        self.push(Notification::Stalled(
            folder_name.to_string(),
            minutes_since_progress,
        ));
    }

    fn notify_pause_resume(&self, target: &str, paused: bool) {
        self.push(Notification::PauseResume(target.to_string(), paused));
    }

    fn notify_all_synced(&self) {
        self.push(Notification::AllSynced);
    }
}

pub struct StaticCredentials {
    pub result: Mutex<Result<Credentials, CredentialError>>,
}

impl StaticCredentials {
    pub fn valid() -> Self {
        Self {
            result: Mutex::new(Ok(Credentials {
                base_url: "http://127.0.0.1:8384".to_string(),
                api_key: "test-key".to_string(),
            })),
        }
    }

    pub fn failing(error: CredentialError) -> Self {
        Self {
            result: Mutex::new(Err(error)),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn credentials(&self) -> Result<Credentials, CredentialError> {
        self.result.lock().unwrap().clone()
    }
}

/// Gate that holds one connections fetch until released
pub struct Hold {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

/// Canned daemon responses; every call is recorded by name
pub struct FakeState {
    pub system_status: Result<SystemStatus, ApiError>,
    pub config: Result<DaemonConfig, ApiError>,
    pub version: Result<String, ApiError>,
    pub connections: Result<Connections, ApiError>,
    pub folder_statuses: HashMap<String, Result<FolderStatus, ApiError>>,
    pub completions: HashMap<String, Result<DeviceCompletion, ApiError>>,
    pub command_error: Option<ApiError>,
    pub calls: Vec<String>,
}

pub struct FakeGateway {
    pub state: Mutex<FakeState>,
    pub hold: Mutex<Option<Hold>>,
}

impl FakeGateway {
    /// One remote device "AAA" (Laptop) and one folder "docs" (Documents), idle
    pub fn new() -> Self {
        let mut folder_statuses = HashMap::new();
        folder_statuses.insert("docs".to_string(), Ok(folder_status(FolderState::Idle, 0, 0)));
        let mut completions = HashMap::new();
        completions.insert(
            "AAA".to_string(),
            Ok(DeviceCompletion {
                completion: 100.0,
                global_bytes: 1 << 30,
                need_bytes: 0,
            }),
        );

        Self {
            state: Mutex::new(FakeState {
                system_status: Ok(SystemStatus {
                    my_id: "SELF".to_string(),
                    uptime: 3600,
                    start_time: "2023-11-14T21:13:20Z".to_string(),
                }),
                config: Ok(DaemonConfig {
                    devices: vec![device("SELF", "This Machine"), device("AAA", "Laptop")],
                    folders: vec![folder("docs", "Documents")],
                }),
                version: Ok("v1.27.0".to_string()),
                connections: Ok(connections(&[("AAA", true, 0, 0)])),
                folder_statuses,
                completions,
                command_error: None,
                calls: Vec::new(),
            }),
            hold: Mutex::new(None),
        }
    }

    pub fn with<F: FnOnce(&mut FakeState)>(&self, update: F) {
        let mut state = self.state.lock().unwrap();
        update(&mut *state);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Make the next connections fetch wait for `release`
    pub fn hold_next_connections(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some(Hold {
            entered: entered.clone(),
            release: release.clone(),
        });
        (entered, release)
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn command(&self, call: String) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match &state.command_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StatusGateway for FakeGateway {
    async fn fetch_system_status(&self, _creds: &Credentials) -> Result<SystemStatus, ApiError> {
        self.record("system_status".to_string());
        self.state.lock().unwrap().system_status.clone()
    }

    async fn fetch_version(&self, _creds: &Credentials) -> Result<String, ApiError> {
        self.record("version".to_string());
        self.state.lock().unwrap().version.clone()
    }

    async fn fetch_config(&self, _creds: &Credentials) -> Result<DaemonConfig, ApiError> {
        self.record("config".to_string());
        self.state.lock().unwrap().config.clone()
    }

    async fn fetch_connections(&self, _creds: &Credentials) -> Result<Connections, ApiError> {
        self.record("connections".to_string());
        // Captured before waiting, so a held cycle carries stale data
        let result = self.state.lock().unwrap().connections.clone();
        let hold = self.hold.lock().unwrap().take();
        if let Some(hold) = hold {
            hold.entered.notify_one();
            hold.release.notified().await;
        }
        result
    }

    async fn fetch_folder_status(&self, _creds: &Credentials, folder_id: &str) -> Result<FolderStatus, ApiError> {
        self.record(format!("folder_status {}", folder_id));
        self.state
            .lock()
            .unwrap()
            .folder_statuses
            .get(folder_id)
            .cloned()
            .unwrap_or_else(|| Err(ApiError::http("db/status", 404)))
    }

    async fn fetch_completion(&self, _creds: &Credentials, device_id: &str) -> Result<DeviceCompletion, ApiError> {
        self.record(format!("completion {}", device_id));
        self.state
            .lock()
            .unwrap()
            .completions
            .get(device_id)
            .cloned()
            .unwrap_or_else(|| Err(ApiError::http("db/completion", 404)))
    }

    async fn pause_device(&self, _creds: &Credentials, device_id: &str) -> Result<(), ApiError> {
        self.command(format!("pause_device {}", device_id))
    }

    async fn resume_device(&self, _creds: &Credentials, device_id: &str) -> Result<(), ApiError> {
        self.command(format!("resume_device {}", device_id))
    }

    async fn pause_folder(&self, _creds: &Credentials, folder_id: &str) -> Result<(), ApiError> {
        self.command(format!("pause_folder {}", folder_id))
    }

    async fn resume_folder(&self, _creds: &Credentials, folder_id: &str) -> Result<(), ApiError> {
        self.command(format!("resume_folder {}", folder_id))
    }

    async fn pause_all(&self, _creds: &Credentials) -> Result<(), ApiError> {
        self.command("pause_all".to_string())
    }

    async fn resume_all(&self, _creds: &Credentials) -> Result<(), ApiError> {
        self.command("resume_all".to_string())
    }

    async fn rescan_folder(&self, _creds: &Credentials, folder_id: &str) -> Result<(), ApiError> {
        self.command(format!("rescan {}", folder_id))
    }
}

pub fn device(id: &str, name: &str) -> Device {
    Device {
        id: id.to_string(),
        name: name.to_string(),
        paused: false,
        addresses: vec!["dynamic".to_string()],
    }
}

pub fn folder(id: &str, label: &str) -> Folder {
    Folder {
        id: id.to_string(),
        label: label.to_string(),
        path: format!("/data/{}", id),
        paused: false,
        devices: vec!["AAA".to_string()],
    }
}

pub fn folder_status(state: FolderState, need_files: u64, need_bytes: u64) -> FolderStatus {
    let global_bytes = 500 << 20;
    FolderStatus {
        state,
        global_files: 100,
        global_bytes,
        local_files: 100 - need_files,
        local_bytes: global_bytes - need_bytes,
        need_files,
        need_bytes,
    }
}

/// (device id, connected, bytes in, bytes out)
pub fn connections(entries: &[(&str, bool, u64, u64)]) -> Connections {
    entries
        .iter()
        .map(|(id, connected, in_bytes, out_bytes)| {
            (
                id.to_string(),
                ConnectionSnapshot {
                    connected: *connected,
                    address: connected.then(|| "10.0.0.2:22000".to_string()),
                    client_version: connected.then(|| "v1.27.0".to_string()),
                    transport: connected.then(|| "tcp-client".to_string()),
                    in_bytes_total: *in_bytes,
                    out_bytes_total: *out_bytes,
                },
            )
        })
        .collect()
}

pub struct Harness {
    pub gateway: Arc<FakeGateway>,
    pub credentials: Arc<StaticCredentials>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<ManualClock>,
    pub poller: Poller,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(MonitorSettings::default())
    }

    pub fn with_settings(settings: MonitorSettings) -> Self {
        Self::build(settings, StaticCredentials::valid())
    }

    pub fn build(settings: MonitorSettings, credentials: StaticCredentials) -> Self {
        let gateway = Arc::new(FakeGateway::new());
        let credentials = Arc::new(credentials);
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = Arc::new(ManualClock::new());
        let poller = Poller::new(
            gateway.clone(),
            credentials.clone(),
            notifier.clone(),
            clock.clone(),
            settings,
        );
        Self {
            gateway,
            credentials,
            notifier,
            clock,
            poller,
        }
    }

    /// Run one full cycle to completion
    pub async fn cycle(&self) {
        self.poller.refresh().await.expect("refresh task panicked");
    }

    /// Advance the clock, then run a cycle
    pub async fn cycle_after(&self, secs: i64) {
        self.clock.advance_secs(secs);
        self.cycle().await;
    }
}
