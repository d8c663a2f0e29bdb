// Network normalizer

use super::labels;
use crate::engine::raw::RawNetwork;
use crate::models::{BUILTIN_NETWORKS, Container, Ipam, IpamConfig, Network, ResourceActions};

/// `containers` fills the attachment count for list responses, which omit it.
pub fn network_from_raw(raw: &RawNetwork, containers: &[Container]) -> Network {
    let inspected = raw.containers.as_ref().map(|c| c.len()).unwrap_or(0);
    let attached = containers
        .iter()
        .filter(|c| c.networks.iter().any(|n| n.name == raw.name))
        .count();
    let connected = inspected.max(attached);
    let builtin = BUILTIN_NETWORKS.contains(&raw.name.as_str());
    let ipam = raw.ipam.as_ref();
    Network {
        id: raw.id.clone(),
        name: raw.name.clone(),
        driver: raw.driver.clone().unwrap_or_default(),
        scope: raw.scope.clone().unwrap_or_else(|| "local".to_string()),
        internal: raw.internal.unwrap_or(false),
        attachable: raw.attachable.unwrap_or(false),
        created: raw.created.clone(),
        ipam: Ipam {
            driver: ipam
                .and_then(|i| i.driver.clone())
                .unwrap_or_else(|| "default".to_string()),
            config: ipam
                .and_then(|i| i.config.as_ref())
                .into_iter()
                .flatten()
                .map(|c| IpamConfig {
                    subnet: c.subnet.clone(),
                    gateway: c.gateway.clone(),
                    ip_range: c.ip_range.clone(),
                })
                .collect(),
        },
        labels: labels(raw.labels.as_ref()),
        options: labels(raw.options.as_ref()),
        containers: connected,
        builtin,
        actions: ResourceActions {
            can_delete: !builtin && connected == 0,
        },
    }
}
