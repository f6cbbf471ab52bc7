use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::logic::errors::ApiError;
use crate::model::syncthing::{
    ConnectionSnapshot, Connections, Device, DeviceCompletion, Folder, FolderState, FolderStatus,
    SystemStatus,
};
use crate::services::gateway::{Credentials, DaemonConfig, StatusGateway};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Helper function to deserialize null as empty vector
fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let opt = Option::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct ConfigResponse {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    folders: Vec<FolderDto>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    devices: Vec<DeviceDto>,
}

#[derive(Debug, Deserialize)]
struct DeviceDto {
    #[serde(rename = "deviceID")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    paused: bool,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    addresses: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FolderDeviceDto {
    #[serde(rename = "deviceID")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct FolderDto {
    id: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    paused: bool,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    devices: Vec<FolderDeviceDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FolderStatusDto {
    state: String,
    #[serde(default)]
    global_files: u64,
    #[serde(default)]
    global_bytes: u64,
    #[serde(default)]
    local_files: u64,
    #[serde(default)]
    local_bytes: u64,
    #[serde(default)]
    need_files: u64,
    #[serde(default)]
    need_bytes: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SystemStatusDto {
    #[serde(rename = "myID")]
    my_id: String,
    uptime: u64,
    #[serde(default)]
    start_time: String,
}

#[derive(Debug, Deserialize)]
struct VersionDto {
    version: String,
}

#[derive(Debug, Deserialize)]
struct ConnectionsResponse {
    #[serde(default)]
    connections: HashMap<String, ConnectionDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionDto {
    #[serde(default)]
    connected: bool,
    #[serde(default)]
    address: String,
    #[serde(default)]
    client_version: String,
    #[serde(default, rename = "type")]
    transport: String,
    #[serde(default)]
    in_bytes_total: u64,
    #[serde(default)]
    out_bytes_total: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletionDto {
    completion: f64,
    #[serde(default)]
    global_bytes: u64,
    #[serde(default)]
    need_bytes: u64,
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl From<DeviceDto> for Device {
    fn from(dto: DeviceDto) -> Self {
        Device {
            id: dto.id,
            name: dto.name,
            paused: dto.paused,
            addresses: dto.addresses,
        }
    }
}

impl From<FolderDto> for Folder {
    fn from(dto: FolderDto) -> Self {
        Folder {
            id: dto.id,
            label: dto.label,
            path: dto.path,
            paused: dto.paused,
            devices: dto.devices.into_iter().map(|d| d.id).collect(),
        }
    }
}

impl From<FolderStatusDto> for FolderStatus {
    fn from(dto: FolderStatusDto) -> Self {
        FolderStatus {
            state: FolderState::from_raw(&dto.state),
            global_files: dto.global_files,
            global_bytes: dto.global_bytes,
            local_files: dto.local_files,
            local_bytes: dto.local_bytes,
            need_files: dto.need_files,
            need_bytes: dto.need_bytes,
        }
    }
}

impl From<ConnectionDto> for ConnectionSnapshot {
    fn from(dto: ConnectionDto) -> Self {
        ConnectionSnapshot {
            connected: dto.connected,
            address: non_empty(dto.address),
            client_version: non_empty(dto.client_version),
            transport: non_empty(dto.transport),
            in_bytes_total: dto.in_bytes_total,
            out_bytes_total: dto.out_bytes_total,
        }
    }
}

/// HTTP client for the daemon's REST API
#[derive(Clone)]
pub struct SyncthingClient {
    client: Client,
}

impl SyncthingClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }

    fn request(&self, creds: &Credentials, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/rest/{}", creds.base_url, path);
        self.client
            .request(method, url)
            .header("X-API-Key", &creds.api_key)
    }

    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::transport(endpoint, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            debug!(endpoint = %endpoint, status = status.as_u16(), "Request rejected");
            return Err(ApiError::http(endpoint, status.as_u16()));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        creds: &Credentials,
        endpoint: &str,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = self
            .send(endpoint, self.request(creds, Method::GET, path))
            .await?;
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::transport(endpoint, e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| ApiError::decode(endpoint, e.to_string()))
    }

    async fn post(&self, creds: &Credentials, endpoint: &str, path: &str) -> Result<(), ApiError> {
        self.send(endpoint, self.request(creds, Method::POST, path))
            .await
            .map(|_| ())
    }

    async fn patch_paused(
        &self,
        creds: &Credentials,
        endpoint: &str,
        path: &str,
        paused: bool,
    ) -> Result<(), ApiError> {
        let request = self
            .request(creds, Method::PATCH, path)
            .json(&serde_json::json!({ "paused": paused }));
        self.send(endpoint, request).await.map(|_| ())
    }
}

#[async_trait]
impl StatusGateway for SyncthingClient {
    async fn fetch_system_status(&self, creds: &Credentials) -> Result<SystemStatus, ApiError> {
        let dto: SystemStatusDto = self.get_json(creds, "system/status", "system/status").await?;
        Ok(SystemStatus {
            my_id: dto.my_id,
            uptime: dto.uptime,
            start_time: dto.start_time,
        })
    }

    async fn fetch_version(&self, creds: &Credentials) -> Result<String, ApiError> {
        let dto: VersionDto = self.get_json(creds, "system/version", "system/version").await?;
        Ok(dto.version)
    }

    async fn fetch_config(&self, creds: &Credentials) -> Result<DaemonConfig, ApiError> {
        let config: ConfigResponse = self.get_json(creds, "config", "config").await?;
        Ok(DaemonConfig {
            devices: config.devices.into_iter().map(Device::from).collect(),
            folders: config.folders.into_iter().map(Folder::from).collect(),
        })
    }

    async fn fetch_connections(&self, creds: &Credentials) -> Result<Connections, ApiError> {
        let response: ConnectionsResponse = self
            .get_json(creds, "system/connections", "system/connections")
            .await?;
        Ok(response
            .connections
            .into_iter()
            .map(|(id, dto)| (id, ConnectionSnapshot::from(dto)))
            .collect())
    }

    async fn fetch_folder_status(&self, creds: &Credentials, folder_id: &str) -> Result<FolderStatus, ApiError> {
        let path = format!("db/status?folder={}", urlencoding::encode(folder_id));
        let dto: FolderStatusDto = self.get_json(creds, "db/status", &path).await?;
        Ok(dto.into())
    }

    async fn fetch_completion(&self, creds: &Credentials, device_id: &str) -> Result<DeviceCompletion, ApiError> {
        let path = format!("db/completion?device={}", urlencoding::encode(device_id));
        let dto: CompletionDto = self.get_json(creds, "db/completion", &path).await?;
        Ok(DeviceCompletion {
            completion: dto.completion.clamp(0.0, 100.0),
            global_bytes: dto.global_bytes,
            need_bytes: dto.need_bytes,
        })
    }

    async fn pause_device(&self, creds: &Credentials, device_id: &str) -> Result<(), ApiError> {
        let path = format!("config/devices/{}", urlencoding::encode(device_id));
        self.patch_paused(creds, "config/devices", &path, true).await
    }

    async fn resume_device(&self, creds: &Credentials, device_id: &str) -> Result<(), ApiError> {
        let path = format!("config/devices/{}", urlencoding::encode(device_id));
        self.patch_paused(creds, "config/devices", &path, false).await
    }

    async fn pause_folder(&self, creds: &Credentials, folder_id: &str) -> Result<(), ApiError> {
        let path = format!("config/folders/{}", urlencoding::encode(folder_id));
        self.patch_paused(creds, "config/folders", &path, true).await
    }

    async fn resume_folder(&self, creds: &Credentials, folder_id: &str) -> Result<(), ApiError> {
        let path = format!("config/folders/{}", urlencoding::encode(folder_id));
        self.patch_paused(creds, "config/folders", &path, false).await
    }

    async fn pause_all(&self, creds: &Credentials) -> Result<(), ApiError> {
        self.post(creds, "system/pause", "system/pause").await
    }

    async fn resume_all(&self, creds: &Credentials) -> Result<(), ApiError> {
        self.post(creds, "system/resume", "system/resume").await
    }

    async fn rescan_folder(&self, creds: &Credentials, folder_id: &str) -> Result<(), ApiError> {
        let path = format!("db/scan?folder={}", urlencoding::encode(folder_id));
        self.post(creds, "db/scan", &path).await
    }
}
