//! Collaborator seams for the daemon API and its credentials
//!
//! The polling core only needs typed snapshots and typed commands; the HTTP
//! implementation lives in `crate::api`, tests substitute in-memory fakes.

use async_trait::async_trait;

use crate::logic::errors::{ApiError, CredentialError};
use crate::model::syncthing::{
    Connections, Device, DeviceCompletion, Folder, FolderStatus, SystemStatus,
};

/// Address and API key of the daemon
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub base_url: String,
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Where the base address and API key come from
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credentials(&self) -> Result<Credentials, CredentialError>;
}

/// Devices and folders from the daemon configuration
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DaemonConfig {
    pub devices: Vec<Device>,
    pub folders: Vec<Folder>,
}

/// Typed access to the daemon's REST API
#[async_trait]
pub trait StatusGateway: Send + Sync {
    async fn fetch_system_status(&self, creds: &Credentials) -> Result<SystemStatus, ApiError>;
    async fn fetch_version(&self, creds: &Credentials) -> Result<String, ApiError>;
    async fn fetch_config(&self, creds: &Credentials) -> Result<DaemonConfig, ApiError>;
    async fn fetch_connections(&self, creds: &Credentials) -> Result<Connections, ApiError>;
    async fn fetch_folder_status(&self, creds: &Credentials, folder_id: &str) -> Result<FolderStatus, ApiError>;
    async fn fetch_completion(&self, creds: &Credentials, device_id: &str) -> Result<DeviceCompletion, ApiError>;

    async fn pause_device(&self, creds: &Credentials, device_id: &str) -> Result<(), ApiError>;
    async fn resume_device(&self, creds: &Credentials, device_id: &str) -> Result<(), ApiError>;
    async fn pause_folder(&self, creds: &Credentials, folder_id: &str) -> Result<(), ApiError>;
    async fn resume_folder(&self, creds: &Credentials, folder_id: &str) -> Result<(), ApiError>;
    async fn pause_all(&self, creds: &Credentials) -> Result<(), ApiError>;
    async fn resume_all(&self, creds: &Credentials) -> Result<(), ApiError>;
    async fn rescan_folder(&self, creds: &Credentials, folder_id: &str) -> Result<(), ApiError>;
}
