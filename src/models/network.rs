// Network and volume models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Networks the Engine creates itself; never deletable.
pub const BUILTIN_NETWORKS: &[&str] = &["bridge", "host", "none"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpamConfig {
    pub subnet: Option<String>,
    pub gateway: Option<String>,
    pub ip_range: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ipam {
    pub driver: String,
    pub config: Vec<IpamConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceActions {
    pub can_delete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub id: String,
    pub name: String,
    pub driver: String,
    pub scope: String,
    pub internal: bool,
    pub attachable: bool,
    pub created: Option<String>,
    pub ipam: Ipam,
    pub labels: BTreeMap<String, String>,
    pub options: BTreeMap<String, String>,
    /// Number of containers attached.
    pub containers: usize,
    pub builtin: bool,
    pub actions: ResourceActions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    pub driver: String,
    pub mountpoint: String,
    pub scope: String,
    pub created_at: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub options: BTreeMap<String, String>,
    /// Bytes; only when the Engine computed usage data.
    pub size: Option<i64>,
    /// Number of containers mounting this volume.
    pub containers: usize,
    pub compose_project: Option<String>,
    pub actions: ResourceActions,
}
