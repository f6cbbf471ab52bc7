//! Syncthing Status Monitor Library
//!
//! Polls a Syncthing daemon and maintains a derived, time-aware view of its
//! devices, folders and transfer rates. Exposes modules for the binary and for
//! testing.

pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod monitor;
pub mod services;

pub use config::{Config, MonitorSettings};
pub use model::Snapshot;
pub use monitor::Monitor;
pub use services::Poller;
