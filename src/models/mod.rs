// Domain records handed to route handlers and the UI

mod container;
mod image;
mod network;
mod project;
mod system;

pub use container::{
    Container, ContainerActions, ContainerState, ContainerStats, Mount, MountType,
    NetworkAttachment, PortMapping, Protocol, UpdateStrategy,
};
pub use image::{Healthcheck, Image, ImageActions, ImageConfig, ImageContainer};
pub use network::{BUILTIN_NETWORKS, Ipam, IpamConfig, Network, ResourceActions, Volume};
pub use project::{Project, ProjectService, ProjectStatus, ServiceStatus};
pub use system::{DiskUsage, DiskUsageCategory, EngineInfo, PruneReport};
