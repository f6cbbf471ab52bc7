//! Business Logic
//!
//! This module contains pure business logic that can be unit tested without
//! a runtime. Every tracker takes `now` explicitly:
//! - connections: connect/disconnect edges and per-device timestamps
//! - errors: error taxonomy and classification
//! - formatting: byte, rate and duration formatting
//! - history: bounded rate history with cached maxima
//! - rates: transfer rates from cumulative byte counters
//! - simulation: scenario-driven synthetic state
//! - status: overall status summary and the "all synced" guard
//! - sync_events: per-folder sync events and stall detection

pub mod connections;
pub mod errors;
pub mod formatting;
pub mod history;
pub mod rates;
pub mod simulation;
pub mod status;
pub mod sync_events;
