//! Time sources and the restartable refresh ticker

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Wall-clock source for timestamps handed to the trackers
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Periodic timer that can be restarted with a new interval
///
/// Starting always aborts the previous timer first, so at most one is ever
/// firing.
#[derive(Debug, Default)]
pub struct Ticker {
    abort_handle: Option<AbortHandle>,
    interval: Option<Duration>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `on_tick` now and then every `interval` until stopped
    pub fn start<F>(&mut self, interval: Duration, on_tick: F)
    where
        F: Fn() + Send + 'static,
    {
        self.stop();
        let interval = interval.max(Duration::from_millis(1));
        debug!(interval_ms = interval.as_millis() as u64, "Starting ticker");

        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                timer.tick().await;
                on_tick();
            }
        });
        self.abort_handle = Some(handle.abort_handle());
        self.interval = Some(interval);
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.abort_handle.take() {
            handle.abort();
        }
        self.interval = None;
    }

    pub fn is_running(&self) -> bool {
        self.abort_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Interval of the running timer
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
