//! Transfer rate calculation
//!
//! Turns successive cumulative byte-counter snapshots into per-device and
//! aggregate rates. Counters are cumulative since the daemon started, so a
//! restart makes them go backwards; such a direction yields a zero rate for
//! that cycle and the new values become the baseline. Download and upload
//! are clamped independently.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::syncthing::{ConnectionSnapshot, Connections, TransferRate};

/// Rates produced by one computation
#[derive(Clone, Debug, PartialEq)]
pub struct RateUpdate {
    pub per_device: HashMap<String, TransferRate>,
    pub total: TransferRate,
}

/// Keeps the previous snapshot set as the baseline for the next delta
#[derive(Clone, Debug, Default)]
pub struct TransferRateCalculator {
    baseline: Option<(Connections, DateTime<Utc>)>,
}

impl TransferRateCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute rates against the baseline, then make `current` the baseline
    ///
    /// Returns `None` when the clock did not move forward since the baseline;
    /// callers keep the previous cycle's rates in that case.
    pub fn update(&mut self, current: &Connections, now: DateTime<Utc>) -> Option<RateUpdate> {
        let previous = self.baseline.replace((current.clone(), now));

        let (previous, elapsed) = match previous {
            Some((prev, at)) => {
                let elapsed = (now - at).num_milliseconds() as f64 / 1000.0;
                if elapsed <= 0.0 {
                    return None;
                }
                (Some(prev), elapsed)
            }
            None => (None, 0.0),
        };

        let mut per_device = HashMap::with_capacity(current.len());
        let mut total = TransferRate::ZERO;
        for (device_id, snapshot) in current {
            let rate = previous
                .as_ref()
                .and_then(|prev| prev.get(device_id))
                .map(|old| rate_between(old, snapshot, elapsed))
                .unwrap_or(TransferRate::ZERO);
            total = total.plus(rate);
            per_device.insert(device_id.clone(), rate);
        }

        Some(RateUpdate { per_device, total })
    }

    /// Forget the baseline, e.g. after losing the daemon
    pub fn reset(&mut self) {
        self.baseline = None;
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }
}

/// Rate between two snapshots of the same device
pub fn rate_between(old: &ConnectionSnapshot, new: &ConnectionSnapshot, elapsed_secs: f64) -> TransferRate {
    if !new.connected || elapsed_secs <= 0.0 {
        return TransferRate::ZERO;
    }
    // A counter that went backwards counts as no transfer in that direction
    TransferRate {
        download: new.in_bytes_total.saturating_sub(old.in_bytes_total) as f64 / elapsed_secs,
        upload: new.out_bytes_total.saturating_sub(old.out_bytes_total) as f64 / elapsed_secs,
    }
}
