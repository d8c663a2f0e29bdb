// Raw Engine payload schemas.
//
// Each bollard response is re-read through one of these structs so the normalizers depend on
// the Engine's wire field names only, not on the client library's generated model types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use super::EngineError;

/// Re-read a bollard model through its JSON form into one of the schemas below.
pub(crate) fn decode<T: Serialize, R: DeserializeOwned>(value: &T) -> Result<R, EngineError> {
    let json = serde_json::to_value(value).map_err(EngineError::Schema)?;
    serde_json::from_value(json).map_err(EngineError::Schema)
}

/// Treats an explicit `null` like an absent field.
fn nullable<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

pub type Labels = HashMap<String, String>;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPort {
    #[serde(rename = "IP", default)]
    pub ip: Option<String>,
    #[serde(rename = "PrivatePort", default)]
    pub private_port: u16,
    #[serde(rename = "PublicPort", default)]
    pub public_port: Option<u16>,
    #[serde(rename = "Type", default)]
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPortBinding {
    #[serde(rename = "HostIp", default)]
    pub host_ip: Option<String>,
    #[serde(rename = "HostPort", default)]
    pub host_port: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawMount {
    #[serde(rename = "Type", default)]
    pub kind: Option<String>,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Source", default)]
    pub source: Option<String>,
    #[serde(rename = "Destination", default)]
    pub destination: Option<String>,
    #[serde(rename = "Mode", default)]
    pub mode: Option<String>,
    #[serde(rename = "RW", default)]
    pub rw: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawEndpoint {
    #[serde(rename = "IPAddress", default)]
    pub ip_address: Option<String>,
    #[serde(rename = "Gateway", default)]
    pub gateway: Option<String>,
    #[serde(rename = "MacAddress", default)]
    pub mac_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSummaryNetworkSettings {
    #[serde(rename = "Networks", default)]
    pub networks: Option<HashMap<String, RawEndpoint>>,
}

/// One entry of `GET /containers/json`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawContainer {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Names", default, deserialize_with = "nullable")]
    pub names: Vec<String>,
    #[serde(rename = "Image", default)]
    pub image: Option<String>,
    #[serde(rename = "ImageID", default)]
    pub image_id: Option<String>,
    #[serde(rename = "Created", default)]
    pub created: Option<i64>,
    #[serde(rename = "Ports", default, deserialize_with = "nullable")]
    pub ports: Vec<RawPort>,
    #[serde(rename = "Labels", default)]
    pub labels: Option<Labels>,
    #[serde(rename = "State", default)]
    pub state: Option<String>,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
    #[serde(rename = "Mounts", default, deserialize_with = "nullable")]
    pub mounts: Vec<RawMount>,
    #[serde(rename = "NetworkSettings", default)]
    pub network_settings: Option<RawSummaryNetworkSettings>,
    #[serde(rename = "SizeRw", default)]
    pub size_rw: Option<i64>,
    #[serde(rename = "SizeRootFs", default)]
    pub size_root_fs: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawHealth {
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawContainerState {
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
    #[serde(rename = "ExitCode", default)]
    pub exit_code: Option<i64>,
    #[serde(rename = "StartedAt", default)]
    pub started_at: Option<String>,
    #[serde(rename = "Health", default)]
    pub health: Option<RawHealth>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawContainerConfig {
    #[serde(rename = "Image", default)]
    pub image: Option<String>,
    #[serde(rename = "Labels", default)]
    pub labels: Option<Labels>,
    #[serde(rename = "Tty", default)]
    pub tty: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawRestartPolicy {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawHostConfig {
    #[serde(rename = "RestartPolicy", default)]
    pub restart_policy: Option<RawRestartPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawNetworkSettings {
    #[serde(rename = "Ports", default)]
    pub ports: Option<HashMap<String, Option<Vec<RawPortBinding>>>>,
    #[serde(rename = "Networks", default)]
    pub networks: Option<HashMap<String, RawEndpoint>>,
}

/// `GET /containers/{id}/json`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawContainerDetail {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Created", default)]
    pub created: Option<String>,
    /// Resolved image id (`sha256:...`).
    #[serde(rename = "Image", default)]
    pub image: Option<String>,
    #[serde(rename = "State", default)]
    pub state: Option<RawContainerState>,
    #[serde(rename = "RestartCount", default)]
    pub restart_count: Option<i64>,
    #[serde(rename = "Config", default)]
    pub config: Option<RawContainerConfig>,
    #[serde(rename = "HostConfig", default)]
    pub host_config: Option<RawHostConfig>,
    #[serde(rename = "Mounts", default, deserialize_with = "nullable")]
    pub mounts: Vec<RawMount>,
    #[serde(rename = "NetworkSettings", default)]
    pub network_settings: Option<RawNetworkSettings>,
}

/// One entry of `GET /images/json`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawImage {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "RepoTags", default)]
    pub repo_tags: Option<Vec<String>>,
    #[serde(rename = "RepoDigests", default)]
    pub repo_digests: Option<Vec<String>>,
    #[serde(rename = "Created", default)]
    pub created: Option<i64>,
    #[serde(rename = "Size", default)]
    pub size: Option<i64>,
    #[serde(rename = "SharedSize", default)]
    pub shared_size: Option<i64>,
    #[serde(rename = "Containers", default)]
    pub containers: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawHealthConfig {
    #[serde(rename = "Test", default)]
    pub test: Option<Vec<String>>,
    #[serde(rename = "Interval", default)]
    pub interval: Option<i64>,
    #[serde(rename = "Timeout", default)]
    pub timeout: Option<i64>,
    #[serde(rename = "Retries", default)]
    pub retries: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawImageConfig {
    #[serde(rename = "Entrypoint", default)]
    pub entrypoint: Option<Vec<String>>,
    #[serde(rename = "Cmd", default)]
    pub cmd: Option<Vec<String>>,
    #[serde(rename = "WorkingDir", default)]
    pub working_dir: Option<String>,
    #[serde(rename = "User", default)]
    pub user: Option<String>,
    #[serde(rename = "ExposedPorts", default)]
    pub exposed_ports: Option<HashMap<String, serde_json::Value>>,
    #[serde(rename = "Volumes", default)]
    pub volumes: Option<HashMap<String, serde_json::Value>>,
    #[serde(rename = "Env", default)]
    pub env: Option<Vec<String>>,
    #[serde(rename = "Healthcheck", default)]
    pub healthcheck: Option<RawHealthConfig>,
    #[serde(rename = "Labels", default)]
    pub labels: Option<Labels>,
}

/// `GET /images/{name}/json`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawImageDetail {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "RepoTags", default)]
    pub repo_tags: Option<Vec<String>>,
    #[serde(rename = "RepoDigests", default)]
    pub repo_digests: Option<Vec<String>>,
    #[serde(rename = "Created", default)]
    pub created: Option<String>,
    #[serde(rename = "Size", default)]
    pub size: Option<i64>,
    #[serde(rename = "Config", default)]
    pub config: Option<RawImageConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawIpamConfig {
    #[serde(rename = "Subnet", default)]
    pub subnet: Option<String>,
    #[serde(rename = "Gateway", default)]
    pub gateway: Option<String>,
    #[serde(rename = "IPRange", default)]
    pub ip_range: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawIpam {
    #[serde(rename = "Driver", default)]
    pub driver: Option<String>,
    #[serde(rename = "Config", default)]
    pub config: Option<Vec<RawIpamConfig>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawNetwork {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Driver", default)]
    pub driver: Option<String>,
    #[serde(rename = "Scope", default)]
    pub scope: Option<String>,
    #[serde(rename = "Internal", default)]
    pub internal: Option<bool>,
    #[serde(rename = "Attachable", default)]
    pub attachable: Option<bool>,
    #[serde(rename = "Created", default)]
    pub created: Option<String>,
    #[serde(rename = "IPAM", default)]
    pub ipam: Option<RawIpam>,
    #[serde(rename = "Labels", default)]
    pub labels: Option<Labels>,
    #[serde(rename = "Options", default)]
    pub options: Option<Labels>,
    /// Only populated by inspect; list responses leave it empty.
    #[serde(rename = "Containers", default)]
    pub containers: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawVolumeUsage {
    #[serde(rename = "Size", default)]
    pub size: Option<i64>,
    #[serde(rename = "RefCount", default)]
    pub ref_count: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawVolume {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Driver", default)]
    pub driver: Option<String>,
    #[serde(rename = "Mountpoint", default)]
    pub mountpoint: Option<String>,
    #[serde(rename = "Scope", default)]
    pub scope: Option<String>,
    #[serde(rename = "CreatedAt", default)]
    pub created_at: Option<String>,
    #[serde(rename = "Labels", default)]
    pub labels: Option<Labels>,
    #[serde(rename = "Options", default)]
    pub options: Option<Labels>,
    #[serde(rename = "UsageData", default)]
    pub usage_data: Option<RawVolumeUsage>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawVolumeList {
    #[serde(rename = "Volumes", default)]
    pub volumes: Option<Vec<RawVolume>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawBuildCache {
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
    #[serde(rename = "Size", default)]
    pub size: Option<i64>,
    #[serde(rename = "InUse", default)]
    pub in_use: Option<bool>,
    #[serde(rename = "Shared", default)]
    pub shared: Option<bool>,
}

/// `GET /system/df`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDiskUsage {
    #[serde(rename = "LayersSize", default)]
    pub layers_size: Option<i64>,
    #[serde(rename = "Images", default)]
    pub images: Option<Vec<RawImage>>,
    #[serde(rename = "Containers", default)]
    pub containers: Option<Vec<RawContainer>>,
    #[serde(rename = "Volumes", default)]
    pub volumes: Option<Vec<RawVolume>>,
    #[serde(rename = "BuildCache", default)]
    pub build_cache: Option<Vec<RawBuildCache>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawImageDeleted {
    #[serde(rename = "Untagged", default)]
    pub untagged: Option<String>,
    #[serde(rename = "Deleted", default)]
    pub deleted: Option<String>,
}

/// Union of the per-resource prune responses; only the fields for one kind are set.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPruneResponse {
    #[serde(rename = "ContainersDeleted", default)]
    pub containers_deleted: Option<Vec<String>>,
    #[serde(rename = "ImagesDeleted", default)]
    pub images_deleted: Option<Vec<RawImageDeleted>>,
    #[serde(rename = "NetworksDeleted", default)]
    pub networks_deleted: Option<Vec<String>>,
    #[serde(rename = "VolumesDeleted", default)]
    pub volumes_deleted: Option<Vec<String>>,
    #[serde(rename = "CachesDeleted", default)]
    pub caches_deleted: Option<Vec<String>>,
    #[serde(rename = "SpaceReclaimed", default)]
    pub space_reclaimed: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawVersion {
    #[serde(rename = "Version", default)]
    pub version: Option<String>,
    #[serde(rename = "ApiVersion", default)]
    pub api_version: Option<String>,
    #[serde(rename = "Os", default)]
    pub os: Option<String>,
    #[serde(rename = "Arch", default)]
    pub arch: Option<String>,
    #[serde(rename = "KernelVersion", default)]
    pub kernel_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_tolerates_missing_and_null_fields() {
        let raw: RawContainer = decode(&json!({
            "Id": "abc",
            "Names": ["/web"],
            "Labels": null,
            "Ports": [{"PrivatePort": 80, "Type": "tcp"}]
        }))
        .unwrap();
        assert_eq!(raw.id, "abc");
        assert!(raw.labels.is_none());
        assert_eq!(raw.ports[0].private_port, 80);
        assert!(raw.mounts.is_empty());
    }

    #[test]
    fn decode_rejects_wrong_shape() {
        let r: Result<RawContainer, _> = decode(&json!({"Id": 42}));
        assert!(matches!(r, Err(EngineError::Schema(_))));
    }
}
