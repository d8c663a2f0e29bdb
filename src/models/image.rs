// Image models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ContainerState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Healthcheck {
    pub test: Vec<String>,
    /// Nanoseconds, as reported by the Engine.
    pub interval: Option<i64>,
    pub timeout: Option<i64>,
    pub retries: Option<i64>,
}

/// Parsed image config; only present on single-image lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub entrypoint: Vec<String>,
    pub cmd: Vec<String>,
    pub working_dir: Option<String>,
    pub user: Option<String>,
    pub exposed_ports: Vec<String>,
    pub volumes: Vec<String>,
    pub env: Vec<String>,
    pub healthcheck: Option<Healthcheck>,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageContainer {
    pub id: String,
    pub name: String,
    pub state: ContainerState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageActions {
    pub can_delete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: String,
    pub tags: Vec<String>,
    pub digests: Vec<String>,
    /// Repository of the first tag, or `<none>`.
    pub repository: String,
    pub size: u64,
    /// Unix seconds.
    pub created: i64,
    pub dangling: bool,
    pub config: Option<ImageConfig>,
    pub containers: Vec<ImageContainer>,
    pub actions: ImageActions,
}
