// Engine identity, disk usage and prune results

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineInfo {
    pub version: String,
    pub api_version: String,
    pub os: String,
    pub arch: String,
    pub kernel_version: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskUsageCategory {
    pub count: usize,
    /// Items in use (containers running, images/volumes referenced, cache entries in use).
    pub active: usize,
    pub size: u64,
    pub reclaimable: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskUsage {
    pub layers_size: u64,
    pub images: DiskUsageCategory,
    pub containers: DiskUsageCategory,
    pub volumes: DiskUsageCategory,
    pub build_cache: DiskUsageCategory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneReport {
    pub deleted: Vec<String>,
    pub space_reclaimed: u64,
}

impl PruneReport {
    pub fn merge(&mut self, other: PruneReport) {
        self.deleted.extend(other.deleted);
        self.space_reclaimed += other.space_reclaimed;
    }
}
