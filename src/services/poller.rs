//! Polling orchestrator
//!
//! Runs refresh cycles against the gateway and publishes one [`Snapshot`] per
//! committed cycle through a `watch` channel.
//!
//! Starting a refresh bumps a generation counter and aborts the task of the
//! cycle in flight. A cycle fetches without touching the monitor and only
//! commits while its generation is still current, checked under the monitor
//! lock, so a superseded cycle can never publish anything.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::config::MonitorSettings;
use crate::logic::errors::ApiError;
use crate::logic::simulation::SimulationParams;
use crate::model::Snapshot;
use crate::monitor::{CycleResults, Monitor, PauseTarget};
use crate::services::gateway::{CredentialProvider, Credentials, StatusGateway};
use crate::services::notify::NotificationSink;
use crate::services::scheduler::{Clock, Ticker};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Inner {
    gateway: Arc<dyn StatusGateway>,
    credentials: Arc<dyn CredentialProvider>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    monitor: Mutex<Monitor>,
    publisher: watch::Sender<Arc<Snapshot>>,
    generation: AtomicU64,
    in_flight: Mutex<Option<AbortHandle>>,
    ticker: Mutex<Ticker>,
}

/// Cheap to clone; all clones drive the same monitor
#[derive(Clone)]
pub struct Poller {
    inner: Arc<Inner>,
}

impl Poller {
    pub fn new(
        gateway: Arc<dyn StatusGateway>,
        credentials: Arc<dyn CredentialProvider>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        settings: MonitorSettings,
    ) -> Self {
        let monitor = Monitor::new(settings);
        let (publisher, _) = watch::channel(Arc::new(monitor.snapshot()));
        Self {
            inner: Arc::new(Inner {
                gateway,
                credentials,
                notifier,
                clock,
                monitor: Mutex::new(monitor),
                publisher,
                generation: AtomicU64::new(0),
                in_flight: Mutex::new(None),
                ticker: Mutex::new(Ticker::new()),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.inner.publisher.subscribe()
    }

    /// Most recently published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.publisher.borrow().clone()
    }

    /// Start a refresh cycle, cancelling the one in flight
    ///
    /// The returned handle resolves once the cycle has committed or been
    /// discarded; an aborted cycle resolves with a cancelled `JoinError`.
    pub fn refresh(&self) -> JoinHandle<()> {
        let mut in_flight = lock(&self.inner.in_flight);
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = in_flight.take() {
            if !previous.is_finished() {
                debug!(generation, "Cancelling in-flight refresh");
                previous.abort();
            }
        }

        let inner = self.inner.clone();
        let handle = tokio::spawn(async move { inner.run_cycle(generation).await });
        *in_flight = Some(handle.abort_handle());
        handle
    }

    /// Refresh now and then every `interval`, replacing any running timer
    pub fn start(&self, interval: Duration) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        lock(&self.inner.ticker).start(interval, move || {
            if let Some(inner) = weak.upgrade() {
                drop(Poller { inner }.refresh());
            }
        });
        info!(interval_secs = interval.as_secs(), "Polling started");
    }

    /// Restart the timer if the interval changed while running
    pub fn set_interval(&self, interval: Duration) {
        let running = {
            let ticker = lock(&self.inner.ticker);
            ticker.is_running() && ticker.interval() != Some(interval)
        };
        if running {
            self.start(interval);
        }
    }

    /// Stop the timer and cancel the cycle in flight
    pub fn stop(&self) {
        lock(&self.inner.ticker).stop();
        if let Some(previous) = lock(&self.inner.in_flight).take() {
            previous.abort();
        }
    }

    pub fn update_settings(&self, settings: MonitorSettings) {
        let mut monitor = lock(&self.inner.monitor);
        monitor.update_settings(settings);
        self.inner.publish(&monitor);
    }

    pub fn settings(&self) -> MonitorSettings {
        lock(&self.inner.monitor).settings().clone()
    }

    pub fn enable_simulated(&self, params: SimulationParams) {
        let mut monitor = lock(&self.inner.monitor);
        monitor.enable_simulated(params, self.inner.clock.now());
        self.inner.publish(&monitor);
    }

    /// Publish real data again and refresh it right away
    ///
    /// Returns whether simulated mode was active.
    pub fn disable_simulated(&self) -> bool {
        let was_active = {
            let mut monitor = lock(&self.inner.monitor);
            let was_active = monitor.disable_simulated();
            self.inner.publish(&monitor);
            was_active
        };
        if was_active {
            drop(self.refresh());
        }
        was_active
    }

    pub async fn pause_device(&self, device_id: &str) -> Result<(), ApiError> {
        self.pause_resume(PauseTarget::Device(device_id.to_string()), true)
            .await
    }

    pub async fn resume_device(&self, device_id: &str) -> Result<(), ApiError> {
        self.pause_resume(PauseTarget::Device(device_id.to_string()), false)
            .await
    }

    pub async fn pause_folder(&self, folder_id: &str) -> Result<(), ApiError> {
        self.pause_resume(PauseTarget::Folder(folder_id.to_string()), true)
            .await
    }

    pub async fn resume_folder(&self, folder_id: &str) -> Result<(), ApiError> {
        self.pause_resume(PauseTarget::Folder(folder_id.to_string()), false)
            .await
    }

    pub async fn pause_all(&self) -> Result<(), ApiError> {
        self.pause_resume(PauseTarget::All, true).await
    }

    pub async fn resume_all(&self) -> Result<(), ApiError> {
        self.pause_resume(PauseTarget::All, false).await
    }

    /// Ask the daemon to rescan a folder; a no-op on simulated data
    pub async fn rescan_folder(&self, folder_id: &str) -> Result<(), ApiError> {
        if lock(&self.inner.monitor).is_simulated() {
            debug!(folder = %folder_id, "Ignoring rescan of simulated folder");
            return Ok(());
        }

        let result = match self.inner.credentials().await {
            Ok(creds) => self.inner.gateway.rescan_folder(&creds, folder_id).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                info!(folder = %folder_id, "Rescan requested");
                drop(self.refresh());
                Ok(())
            }
            Err(e) => Err(self.inner.command_failed(e)),
        }
    }

    async fn pause_resume(&self, target: PauseTarget, paused: bool) -> Result<(), ApiError> {
        let name = {
            let mut monitor = lock(&self.inner.monitor);
            if monitor.is_simulated() {
                match monitor.pause_simulated(&target, paused) {
                    Some(name) => {
                        self.inner.notifier.notify_pause_resume(&name, paused);
                        self.inner.publish(&monitor);
                    }
                    None => debug!(pause_target = ?target, "Unknown simulated pause target"),
                }
                return Ok(());
            }
            monitor.target_name(&target)
        };

        let result = match self.inner.credentials().await {
            Ok(creds) => self.inner.send_pause_resume(&creds, &target, paused).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                info!(target_name = %name, paused, "Pause state changed");
                self.inner.notifier.notify_pause_resume(&name, paused);
                drop(self.refresh());
                Ok(())
            }
            Err(e) => Err(self.inner.command_failed(e)),
        }
    }
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn publish(&self, monitor: &Monitor) {
        self.publisher.send_replace(Arc::new(monitor.snapshot()));
    }

    /// Apply and publish, unless a newer cycle has started meanwhile
    fn commit<F>(&self, generation: u64, apply: F) -> bool
    where
        F: FnOnce(&mut Monitor, DateTime<Utc>),
    {
        let mut monitor = lock(&self.monitor);
        if !self.is_current(generation) {
            debug!(generation, "Discarding superseded refresh");
            return false;
        }
        apply(&mut monitor, self.clock.now());
        self.publish(&monitor);
        true
    }

    async fn credentials(&self) -> Result<Credentials, ApiError> {
        self.credentials.credentials().await.map_err(ApiError::from)
    }

    fn command_failed(&self, error: ApiError) -> ApiError {
        warn!(error = %error, "Command failed");
        let mut monitor = lock(&self.monitor);
        monitor.record_error(&error);
        self.publish(&monitor);
        error
    }

    async fn send_pause_resume(&self, creds: &Credentials, target: &PauseTarget, paused: bool) -> Result<(), ApiError> {
        match (target, paused) {
            (PauseTarget::Device(id), true) => self.gateway.pause_device(creds, id).await,
            (PauseTarget::Device(id), false) => self.gateway.resume_device(creds, id).await,
            (PauseTarget::Folder(id), true) => self.gateway.pause_folder(creds, id).await,
            (PauseTarget::Folder(id), false) => self.gateway.resume_folder(creds, id).await,
            (PauseTarget::All, true) => self.gateway.pause_all(creds).await,
            (PauseTarget::All, false) => self.gateway.resume_all(creds).await,
        }
    }

    async fn run_cycle(&self, generation: u64) {
        let creds = match self.credentials().await {
            Ok(creds) => creds,
            Err(e) => {
                self.commit(generation, |monitor, now| monitor.apply_disconnect(&e, now));
                return;
            }
        };
        if !self.is_current(generation) {
            return;
        }

        let system_status = match self.gateway.fetch_system_status(&creds).await {
            Ok(status) => status,
            Err(e) => {
                self.commit(generation, |monitor, now| monitor.apply_disconnect(&e, now));
                return;
            }
        };
        if !self.is_current(generation) {
            return;
        }

        let mut results = CycleResults::new(system_status);
        let (mut folder_ids, mut device_ids) = lock(&self.monitor).known_ids();
        match self.gateway.fetch_config(&creds).await {
            Ok(config) => {
                folder_ids = config.folders.iter().map(|f| f.id.clone()).collect();
                device_ids = config.devices.iter().map(|d| d.id.clone()).collect();
                results.config = Some(config);
            }
            Err(e) => results.record_error(e),
        }
        if !self.is_current(generation) {
            return;
        }

        // The local device has no completion against itself
        device_ids.retain(|id| *id != results.system_status.my_id);

        let gateway = self.gateway.as_ref();
        let creds = &creds;
        let folder_fetches = join_all(folder_ids.iter().map(|id| async move {
            (id.clone(), gateway.fetch_folder_status(creds, id).await)
        }));
        let completion_fetches = join_all(device_ids.iter().map(|id| async move {
            (id.clone(), gateway.fetch_completion(creds, id).await)
        }));
        let (version, connections, folder_statuses, completions) = tokio::join!(
            gateway.fetch_version(creds),
            gateway.fetch_connections(creds),
            folder_fetches,
            completion_fetches,
        );

        match version {
            Ok(version) => results.version = Some(version),
            Err(e) => results.record_error(e),
        }
        match connections {
            Ok(connections) => results.connections = Some(connections),
            Err(e) => results.record_error(e),
        }
        for (folder_id, status) in folder_statuses {
            match status {
                Ok(status) => {
                    results.folder_statuses.insert(folder_id, status);
                }
                Err(e) => {
                    debug!(folder = %folder_id, error = %e, "Folder status fetch failed");
                    results.record_error(e);
                }
            }
        }
        for (device_id, completion) in completions {
            match completion {
                Ok(completion) => {
                    results.completions.insert(device_id, completion);
                }
                Err(e) => {
                    debug!(device = %device_id, error = %e, "Completion fetch failed");
                    results.record_error(e);
                }
            }
        }

        let notifier = self.notifier.as_ref();
        self.commit(generation, |monitor, now| {
            monitor.apply_cycle(results, now, notifier)
        });
    }
}
