//! Notification seam
//!
//! The monitor decides *when* something is worth telling the user; a sink
//! decides how (desktop notification, log line, test recorder).

use tracing::info;

pub trait NotificationSink: Send + Sync {
    fn notify_device_connectivity(&self, device_name: &str, connected: bool);
    fn notify_sync_completed(&self, folder_name: &str);
    fn notify_stalled(&self, folder_name: &str, minutes_since_progress: i64);
    fn notify_pause_resume(&self, target: &str, paused: bool);
    fn notify_all_synced(&self);
}

/// Writes every signal to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify_device_connectivity(&self, device_name: &str, connected: bool) {
        if connected {
            info!(device = %device_name, "Device connected");
        } else {
            info!(device = %device_name, "Device disconnected");
        }
    }

    fn notify_sync_completed(&self, folder_name: &str) {
        info!(folder = %folder_name, "Sync completed");
    }

    fn notify_stalled(&self, folder_name: &str, minutes_since_progress: i64) {
        info!(
            folder = %folder_name,
            minutes = minutes_since_progress,
            "Sync stalled"
        );
    }

    fn notify_pause_resume(&self, target: &str, paused: bool) {
        let action = if paused { "Paused" } else { "Resumed" };
        info!(target_name = %target, "{}", action);
    }

    fn notify_all_synced(&self) {
        info!("All folders up to date");
    }
}
