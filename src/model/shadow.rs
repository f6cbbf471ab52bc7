//! Shadow states and the data-source switch
//!
//! The monitor keeps two complete copies of what it observes: the *real* one,
//! which every fetch writes into, and an optional *simulated* one generated
//! from a scenario. A single selector decides which copy is published. Fetches
//! never touch the simulated copy and toggling never touches the real one, so
//! switching back shows exactly the real state as it stands.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::logic::history::RollingHistory;
use crate::logic::rates::RateUpdate;
use crate::logic::simulation::{self, SimulationParams};
use crate::model::syncthing::{
    Connections, Device, DeviceCompletion, Folder, FolderStatus, TransferRate,
};

/// Everything observed about the daemon's devices and folders
#[derive(Clone, Debug, PartialEq)]
pub struct ObservedState {
    pub devices: Vec<Device>,
    pub folders: Vec<Folder>,
    pub connections: Connections,
    pub folder_statuses: HashMap<String, FolderStatus>,
    pub completions: HashMap<String, DeviceCompletion>,
    pub rates: HashMap<String, TransferRate>,
    pub total_rate: TransferRate,
    pub device_history: HashMap<String, RollingHistory>,
    pub total_history: RollingHistory,
    history_capacity: usize,
}

impl ObservedState {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            devices: Vec::new(),
            folders: Vec::new(),
            connections: HashMap::new(),
            folder_statuses: HashMap::new(),
            completions: HashMap::new(),
            rates: HashMap::new(),
            total_rate: TransferRate::ZERO,
            device_history: HashMap::new(),
            total_history: RollingHistory::new(history_capacity),
            history_capacity,
        }
    }

    pub fn device(&self, device_id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == device_id)
    }

    pub fn folder(&self, folder_id: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.id == folder_id)
    }

    /// Store a rate computation and append its history points
    pub fn record_rates(&mut self, update: &RateUpdate, now: DateTime<Utc>) {
        let capacity = self.history_capacity;
        for (device_id, rate) in &update.per_device {
            self.device_history
                .entry(device_id.clone())
                .or_insert_with(|| RollingHistory::new(capacity))
                .add_data_point(now, *rate);
        }
        self.device_history
            .retain(|id, _| update.per_device.contains_key(id));
        self.total_history.add_data_point(now, update.total);

        self.rates = update.per_device.clone();
        self.total_rate = update.total;
    }

    /// Drop the entity lists after losing the daemon; histories stay for the charts
    pub fn clear_entities(&mut self) {
        self.devices.clear();
        self.folders.clear();
        self.connections.clear();
        self.folder_statuses.clear();
        self.completions.clear();
        self.rates.clear();
        self.total_rate = TransferRate::ZERO;
    }

    pub fn set_history_capacity(&mut self, capacity: usize) {
        self.history_capacity = capacity;
        self.total_history.set_capacity(capacity);
        for history in self.device_history.values_mut() {
            history.set_capacity(capacity);
        }
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    /// Returns false if the device is unknown
    pub fn set_device_paused(&mut self, device_id: &str, paused: bool) -> bool {
        match self.devices.iter_mut().find(|d| d.id == device_id) {
            Some(device) => {
                device.paused = paused;
                true
            }
            None => false,
        }
    }

    /// Returns false if the folder is unknown
    pub fn set_folder_paused(&mut self, folder_id: &str, paused: bool) -> bool {
        match self.folders.iter_mut().find(|f| f.id == folder_id) {
            Some(folder) => {
                folder.paused = paused;
                true
            }
            None => false,
        }
    }

    pub fn set_all_devices_paused(&mut self, paused: bool) {
        for device in &mut self.devices {
            device.paused = paused;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum DataSource {
    Real,
    Simulated,
}

#[derive(Clone, Debug)]
struct SimulatedShadow {
    params: SimulationParams,
    state: ObservedState,
    tick: u64,
}

/// Two shadow states behind one selector
#[derive(Clone, Debug)]
pub struct DataSourceSwitch {
    real: ObservedState,
    simulated: Option<SimulatedShadow>,
}

impl DataSourceSwitch {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            real: ObservedState::new(history_capacity),
            simulated: None,
        }
    }

    pub fn source(&self) -> DataSource {
        if self.simulated.is_some() {
            DataSource::Simulated
        } else {
            DataSource::Real
        }
    }

    pub fn is_simulated(&self) -> bool {
        self.simulated.is_some()
    }

    /// The state consumers see
    pub fn published(&self) -> &ObservedState {
        match &self.simulated {
            Some(shadow) => &shadow.state,
            None => &self.real,
        }
    }

    pub fn real(&self) -> &ObservedState {
        &self.real
    }

    /// Fetch results always land here, whichever copy is published
    pub fn real_mut(&mut self) -> &mut ObservedState {
        &mut self.real
    }

    pub fn simulated_mut(&mut self) -> Option<&mut ObservedState> {
        self.simulated.as_mut().map(|shadow| &mut shadow.state)
    }

    pub fn simulation_params(&self) -> Option<&SimulationParams> {
        self.simulated.as_ref().map(|shadow| &shadow.params)
    }

    /// Publish freshly generated synthetic state
    ///
    /// Re-enabling while already simulated regenerates the synthetic copy;
    /// the real copy is left as it is either way.
    pub fn enable_simulated(&mut self, params: SimulationParams, now: DateTime<Utc>) {
        let state = simulation::generate(&params, now, self.real.history_capacity());
        self.simulated = Some(SimulatedShadow {
            params,
            state,
            tick: 0,
        });
    }

    /// Publish the real copy again, discarding everything synthetic
    ///
    /// Returns whether simulated mode was active.
    pub fn disable_simulated(&mut self) -> bool {
        self.simulated.take().is_some()
    }

    /// Move the synthetic charts forward by one sample
    pub fn advance_simulated(&mut self, now: DateTime<Utc>) {
        if let Some(shadow) = self.simulated.as_mut() {
            shadow.tick += 1;
            simulation::advance(&mut shadow.state, &shadow.params, shadow.tick, now);
        }
    }

    pub fn set_history_capacity(&mut self, capacity: usize) {
        self.real.set_history_capacity(capacity);
        if let Some(shadow) = self.simulated.as_mut() {
            shadow.state.set_history_capacity(capacity);
        }
    }
}
