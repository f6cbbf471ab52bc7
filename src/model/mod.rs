//! Published Model
//!
//! What consumers read. The monitor assembles one [`Snapshot`] per committed
//! refresh and publishes it whole, so a reader never sees real and simulated
//! entities mixed, or half of a cycle.
//!
//! - **syncthing**: typed entities and snapshots from the daemon
//! - **shadow**: the real/simulated shadow states and the switch between them

pub mod shadow;
pub mod syncthing;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::logic::connections::ConnectionHistory;
use crate::logic::status::StatusSummary;
use crate::logic::sync_events::SyncEvent;

pub use shadow::{DataSource, DataSourceSwitch, ObservedState};
pub use syncthing::{ConnectionState, SystemStatus};

/// One consistent view of the monitor
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub source: DataSource,
    pub connection_state: ConnectionState,
    pub system_status: Option<SystemStatus>,
    /// Daemon version string, e.g. "v1.27.0"
    pub version: Option<String>,
    pub observed: ObservedState,
    pub connection_history: HashMap<String, ConnectionHistory>,
    /// Most recent first
    pub sync_events: Vec<SyncEvent>,
    pub last_error: Option<String>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub summary: StatusSummary,
}

impl Snapshot {
    pub fn is_connected(&self) -> bool {
        self.connection_state.is_connected()
    }
}
