//! Integration tests for loading the YAML config from disk

use std::fs;

use stmon::config::{find_config_path, Config, ConfigCredentials};
use stmon::logic::errors::CredentialError;
use stmon::services::CredentialProvider;

const CONFIG: &str = "\
api_key: s3cr3t-key
base_url: http://192.168.1.20:8384/
poll_interval_secs: 15
monitor:
  history_capacity: 120
  remaining_bytes_threshold: 0
  notify_first_sighting: true
  all_synced_min_interval_secs: 60
";

/// Test: an explicit path is used and every section is read
#[tokio::test]
async fn test_load_explicit_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, CONFIG).unwrap();

    let found = find_config_path(Some(path.as_path())).unwrap();
    assert_eq!(found.as_deref(), Some(path.as_path()));

    let contents = fs::read_to_string(&path).unwrap();
    let config = Config::from_yaml(&contents).unwrap();
    assert_eq!(config.poll_interval().as_secs(), 15);
    assert_eq!(config.monitor.history_capacity, 120);
    assert_eq!(config.monitor.remaining_bytes_threshold, 0);
    assert!(config.monitor.notify_first_sighting);
    assert_eq!(config.monitor.event_capacity, 50, "unset fields keep defaults");

    let creds = ConfigCredentials::new(&config).credentials().await.unwrap();
    assert_eq!(creds.base_url, "http://192.168.1.20:8384");
    assert_eq!(creds.api_key, "s3cr3t-key");
    assert!(!format!("{:?}", creds).contains("s3cr3t"), "key must not be logged");
}

/// Test: a file without a key yields a not-configured credential error
#[tokio::test]
async fn test_config_without_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stmon.yaml");
    fs::write(&path, "base_url: http://127.0.0.1:8384\n").unwrap();

    let config = Config::from_yaml(&fs::read_to_string(&path).unwrap()).unwrap();
    let result = ConfigCredentials::new(&config).credentials().await;
    assert_eq!(result, Err(CredentialError::NotConfigured));
}

/// Test: malformed YAML is reported, not defaulted
#[test]
fn test_malformed_yaml_is_error() {
    assert!(Config::from_yaml("monitor: [not, a, map]").is_err());
}
