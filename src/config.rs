use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::logic::errors::CredentialError;
use crate::services::gateway::{CredentialProvider, Credentials};

const ENV_API_URL: &str = "STMON_API_URL";
const ENV_API_KEY: &str = "STMON_API_KEY";

#[derive(Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub monitor: MonitorSettings,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("monitor", &self.monitor)
            .finish()
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8384".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            poll_interval_secs: default_poll_interval_secs(),
            monitor: MonitorSettings::default(),
        }
    }
}

impl Config {
    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    /// Apply `STMON_API_URL` / `STMON_API_KEY` on top of the file values
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            if !url.trim().is_empty() {
                self.base_url = url.trim().to_string();
            }
        }
        if let Ok(key) = std::env::var(ENV_API_KEY) {
            if !key.trim().is_empty() {
                self.api_key = Some(key.trim().to_string());
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// Thresholds and toggles the monitor reads once per cycle
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Samples kept per rate history
    pub history_capacity: usize,
    /// Sync events kept in the activity list
    pub event_capacity: usize,
    /// A syncing folder with at most this many bytes left counts as idle
    pub remaining_bytes_threshold: u64,
    pub stall_alerts_enabled: bool,
    pub stall_minutes: u64,
    pub notify_device_connectivity: bool,
    /// Announce devices already connected when the monitor first sees them
    pub notify_first_sighting: bool,
    pub notify_sync_completed: bool,
    /// Folder IDs allowed to raise completion notifications; empty allows all
    pub completion_folders: Vec<String>,
    pub notify_all_synced: bool,
    pub all_synced_min_interval_secs: u64,
    /// Aggregate rate above which the monitor reports active transfer
    pub activity_threshold_bytes_per_sec: f64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            history_capacity: 60,
            event_capacity: 50,
            remaining_bytes_threshold: 1024 * 1024,
            stall_alerts_enabled: true,
            stall_minutes: 10,
            notify_device_connectivity: true,
            notify_first_sighting: false,
            notify_sync_completed: true,
            completion_folders: Vec::new(),
            notify_all_synced: true,
            all_synced_min_interval_secs: 300,
            activity_threshold_bytes_per_sec: 1024.0,
        }
    }
}

impl MonitorSettings {
    pub fn completion_allowed(&self, folder_id: &str) -> bool {
        self.completion_folders.is_empty() || self.completion_folders.iter().any(|id| id == folder_id)
    }
}

/// Credentials read from the loaded config file
#[derive(Clone)]
pub struct ConfigCredentials {
    base_url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for ConfigCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigCredentials")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ConfigCredentials {
    pub fn new(config: &Config) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn resolve(&self) -> Result<Credentials, CredentialError> {
        let api_key = match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key,
            _ => return Err(CredentialError::NotConfigured),
        };
        if api_key.chars().any(char::is_whitespace) {
            return Err(CredentialError::Malformed(
                "API key contains whitespace".to_string(),
            ));
        }

        let base_url = self.base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(CredentialError::Malformed(format!(
                "base URL must start with http:// or https://: {}",
                base_url
            )));
        }

        Ok(Credentials {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl CredentialProvider for ConfigCredentials {
    async fn credentials(&self) -> Result<Credentials, CredentialError> {
        self.resolve()
    }
}

/// Determine the config file path with fallback logic
pub fn find_config_path(cli_path: Option<&Path>) -> Result<Option<PathBuf>, String> {
    if let Some(path) = cli_path {
        if path.exists() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(format!(
            "Config file not found at specified path: {}",
            path.display()
        ));
    }

    // Try ~/.config/stmon/config.yaml
    if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join("stmon").join("config.yaml");
        if config_path.exists() {
            return Ok(Some(config_path));
        }
    }

    // Fallback to ./config.yaml
    let local_config = PathBuf::from("config.yaml");
    if local_config.exists() {
        return Ok(Some(local_config));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = Config::from_yaml("api_key: abc123\n").unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:8384");
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.monitor, MonitorSettings::default());
    }

    #[test]
    fn test_partial_monitor_section() {
        let yaml = "\
api_key: abc123
poll_interval_secs: 0
monitor:
  stall_minutes: 3
  completion_folders: [docs]
";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.monitor.stall_minutes, 3);
        assert_eq!(config.monitor.history_capacity, 60);
        assert!(config.monitor.completion_allowed("docs"));
        assert!(!config.monitor.completion_allowed("photos"));
        // Zero interval is clamped
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_empty_allow_list_allows_all() {
        assert!(MonitorSettings::default().completion_allowed("anything"));
    }

    #[test]
    fn test_credentials_not_configured() {
        let creds = ConfigCredentials::new(&Config::default());
        assert_eq!(creds.resolve(), Err(CredentialError::NotConfigured));

        let mut config = Config::default();
        config.api_key = Some("   ".to_string());
        assert_eq!(ConfigCredentials::new(&config).resolve(), Err(CredentialError::NotConfigured));
    }

    #[test]
    fn test_credentials_malformed() {
        let mut config = Config::default();
        config.api_key = Some("abc def".to_string());
        assert!(matches!(
            ConfigCredentials::new(&config).resolve(),
            Err(CredentialError::Malformed(_))
        ));

        config.api_key = Some("abc".to_string());
        config.base_url = "localhost:8384".to_string();
        assert!(matches!(
            ConfigCredentials::new(&config).resolve(),
            Err(CredentialError::Malformed(_))
        ));
    }

    #[test]
    fn test_credentials_trim_trailing_slash() {
        let mut config = Config::default();
        config.api_key = Some("abc".to_string());
        config.base_url = "https://nas.local:8384/".to_string();
        let creds = ConfigCredentials::new(&config).resolve().unwrap();
        assert_eq!(creds.base_url, "https://nas.local:8384");
        assert_eq!(creds.api_key, "abc");
    }

    #[test]
    fn test_debug_output_redacts_api_key() {
        let config = Config::from_yaml("api_key: hunter2-key\n").unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
        assert!(printed.contains("http://127.0.0.1:8384"));

        let printed = format!("{:?}", ConfigCredentials::new(&config));
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_missing_cli_config_path_is_error() {
        let result = find_config_path(Some(Path::new("/definitely/not/here.yaml")));
        assert!(result.is_err());
    }
}
