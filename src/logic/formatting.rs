//! Formatting and display logic
//!
//! Pure functions for formatting data for human-readable display.

/// Format uptime duration in human-readable format
///
/// Converts seconds into a compact representation showing the two most
/// significant units (days+hours, hours+minutes, or just minutes).
///
/// # Examples
/// ```
/// use stmon::logic::formatting::format_uptime;
///
/// assert_eq!(format_uptime(0), "0m");
/// assert_eq!(format_uptime(3660), "1h 1m");
/// assert_eq!(format_uptime(90061), "1d 1h");
/// ```
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Format bytes into human-readable string (e.g., "1.20 KB", "5.30 MB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a bytes-per-second rate, e.g. "1.50 MB/s"
pub fn format_rate(bytes_per_sec: f64) -> String {
    let bytes = if bytes_per_sec.is_finite() && bytes_per_sec > 0.0 {
        bytes_per_sec.round() as u64
    } else {
        0
    };
    format!("{}/s", format_bytes(bytes))
}

/// Outstanding work in a folder, e.g. "3 files, 1.00 MB remaining"
pub fn format_remaining(need_files: u64, need_bytes: u64) -> String {
    let files = if need_files == 1 { "file" } else { "files" };
    format!(
        "{} {}, {} remaining",
        need_files,
        files,
        format_bytes(need_bytes)
    )
}
