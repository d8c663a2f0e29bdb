// Compose project models

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Running,
    Partial,
    Stopped,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Running,
    Restarting,
    Exited,
    Unknown,
}

impl ServiceStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, ServiceStatus::Running | ServiceStatus::Restarting)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectService {
    pub name: String,
    /// Image declared in the manifest.
    pub image: Option<String>,
    /// Image the live container actually runs.
    pub live_image: Option<String>,
    pub container_id: Option<String>,
    pub container_name: Option<String>,
    pub status: ServiceStatus,
    pub has_build: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub path: PathBuf,
    pub manifest_path: PathBuf,
    pub status: ProjectStatus,
    /// Manifest declaration order.
    pub services: Vec<ProjectService>,
}
