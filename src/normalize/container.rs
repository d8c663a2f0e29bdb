// Container normalizer

use std::cmp::Ordering;
use std::collections::HashMap;

use super::{
    COMPOSE_PROJECT_LABEL, COMPOSE_SERVICE_LABEL, display_image, is_image_id, labels, non_empty,
    parse_timestamp,
};
use crate::engine::raw::{
    RawContainer, RawContainerDetail, RawEndpoint, RawMount, RawPort, RawPortBinding,
};
use crate::models::{
    Container, ContainerActions, ContainerState, Mount, MountType, NetworkAttachment, PortMapping,
    Protocol, UpdateStrategy,
};

/// Published ports first by host port, then unpublished by container port; TCP before UDP.
fn port_order(a: &PortMapping, b: &PortMapping) -> Ordering {
    match (a.host_port, b.host_port) {
        (Some(x), Some(y)) => x
            .cmp(&y)
            .then(a.container_port.cmp(&b.container_port))
            .then(a.protocol.cmp(&b.protocol)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a
            .container_port
            .cmp(&b.container_port)
            .then(a.protocol.cmp(&b.protocol)),
    }
}

/// The Engine reports one binding per address family; keep one per
/// (container port, host port, protocol).
pub fn dedup_sort_ports(mut ports: Vec<PortMapping>) -> Vec<PortMapping> {
    ports.sort_by(port_order);
    ports.dedup();
    ports
}

pub fn ports_from_summary(raw: &[RawPort]) -> Vec<PortMapping> {
    let ports = raw
        .iter()
        .filter_map(|p| {
            Some(PortMapping {
                container_port: p.private_port,
                host_port: p.public_port.filter(|p| *p > 0),
                protocol: Protocol::from_docker(p.protocol.as_deref().unwrap_or("tcp"))?,
            })
        })
        .collect();
    dedup_sort_ports(ports)
}

/// Inspect form: `{"80/tcp": [{"HostIp": "0.0.0.0", "HostPort": "8080"}], "443/tcp": null}`.
pub fn ports_from_bindings(raw: &HashMap<String, Option<Vec<RawPortBinding>>>) -> Vec<PortMapping> {
    let mut ports = Vec::new();
    for (key, bindings) in raw {
        let (port, proto) = key.split_once('/').unwrap_or((key.as_str(), "tcp"));
        let (Ok(container_port), Some(protocol)) = (port.parse::<u16>(), Protocol::from_docker(proto))
        else {
            continue;
        };
        let published: Vec<u16> = bindings
            .iter()
            .flatten()
            .filter_map(|b| b.host_port.as_deref()?.parse::<u16>().ok())
            .filter(|p| *p > 0)
            .collect();
        if published.is_empty() {
            ports.push(PortMapping {
                container_port,
                host_port: None,
                protocol,
            });
        }
        for host_port in published {
            ports.push(PortMapping {
                container_port,
                host_port: Some(host_port),
                protocol,
            });
        }
    }
    dedup_sort_ports(ports)
}

fn mount(raw: &RawMount) -> Option<Mount> {
    let type_ = match raw.kind.as_deref()? {
        "bind" => MountType::Bind,
        "volume" => MountType::Volume,
        "tmpfs" => MountType::Tmpfs,
        _ => return None,
    };
    Some(Mount {
        type_,
        name: non_empty(raw.name.as_ref()),
        source: raw.source.clone().unwrap_or_default(),
        destination: raw.destination.clone().unwrap_or_default(),
        mode: raw.mode.clone().unwrap_or_default(),
        rw: raw.rw.unwrap_or(true),
    })
}

fn networks(raw: Option<&HashMap<String, RawEndpoint>>) -> Vec<NetworkAttachment> {
    let mut out: Vec<NetworkAttachment> = raw
        .into_iter()
        .flatten()
        .map(|(name, ep)| NetworkAttachment {
            name: name.clone(),
            ip_address: ep.ip_address.clone().unwrap_or_default(),
            gateway: ep.gateway.clone().unwrap_or_default(),
            mac_address: ep.mac_address.clone().unwrap_or_default(),
        })
        .collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

fn compose_identity(
    labels: &std::collections::BTreeMap<String, String>,
) -> (Option<String>, Option<String>, UpdateStrategy) {
    let project = labels.get(COMPOSE_PROJECT_LABEL).cloned();
    let service = labels.get(COMPOSE_SERVICE_LABEL).cloned();
    let strategy = if project.is_some() && service.is_some() {
        UpdateStrategy::Compose
    } else {
        UpdateStrategy::Standalone
    };
    (project, service, strategy)
}

fn primary_name(names: &[String], id: &str) -> String {
    names
        .first()
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_else(|| id.chars().take(12).collect())
}

/// From a `GET /containers/json` entry. Health, restart count and exit code need an inspect
/// call; see `enrich_container`.
pub fn container_from_summary(raw: &RawContainer) -> Container {
    let labels = labels(raw.labels.as_ref());
    let (compose_project, compose_service, update_strategy) = compose_identity(&labels);
    let state = ContainerState::from_docker(raw.state.as_deref().unwrap_or(""));
    Container {
        id: raw.id.clone(),
        name: primary_name(&raw.names, &raw.id),
        image: display_image(raw.image.as_deref().unwrap_or("")),
        image_id: raw.image_id.clone().unwrap_or_default(),
        state,
        status: raw.status.clone().unwrap_or_default(),
        created: raw.created.unwrap_or(0),
        started_at: None,
        ports: ports_from_summary(&raw.ports),
        mounts: raw.mounts.iter().filter_map(mount).collect(),
        networks: networks(
            raw.network_settings
                .as_ref()
                .and_then(|n| n.networks.as_ref()),
        ),
        labels,
        compose_project,
        compose_service,
        update_strategy,
        actions: ContainerActions::derive(state, update_strategy),
        tty: false,
        health: None,
        restart_policy: None,
        restart_count: None,
        exit_code: None,
    }
}

/// Status text in the style of the Engine's list output, for inspect-only records.
fn status_text(state: ContainerState, exit_code: Option<i64>) -> String {
    match (state, exit_code) {
        (ContainerState::Exited, Some(code)) => format!("Exited ({})", code),
        (ContainerState::Running, _) => "Up".to_string(),
        (s, _) => {
            let s = s.as_str();
            let mut c = s.chars();
            c.next()
                .map(|f| f.to_uppercase().collect::<String>() + c.as_str())
                .unwrap_or_default()
        }
    }
}

/// From `GET /containers/{id}/json`.
pub fn container_from_detail(raw: &RawContainerDetail) -> Container {
    let config = raw.config.as_ref();
    let labels = labels(config.and_then(|c| c.labels.as_ref()));
    let (compose_project, compose_service, update_strategy) = compose_identity(&labels);
    let state = ContainerState::from_docker(
        raw.state
            .as_ref()
            .and_then(|s| s.status.as_deref())
            .unwrap_or(""),
    );
    let network_settings = raw.network_settings.as_ref();
    let mut container = Container {
        id: raw.id.clone(),
        name: raw
            .name
            .as_deref()
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_else(|| raw.id.chars().take(12).collect()),
        image: display_image(
            config
                .and_then(|c| c.image.as_deref())
                .or(raw.image.as_deref())
                .unwrap_or(""),
        ),
        image_id: raw.image.clone().unwrap_or_default(),
        state,
        status: String::new(),
        created: parse_timestamp(raw.created.as_deref())
            .map(|t| t.timestamp())
            .unwrap_or(0),
        started_at: None,
        ports: network_settings
            .and_then(|n| n.ports.as_ref())
            .map(ports_from_bindings)
            .unwrap_or_default(),
        mounts: raw.mounts.iter().filter_map(mount).collect(),
        networks: networks(network_settings.and_then(|n| n.networks.as_ref())),
        labels,
        compose_project,
        compose_service,
        update_strategy,
        actions: ContainerActions::derive(state, update_strategy),
        tty: false,
        health: None,
        restart_policy: None,
        restart_count: None,
        exit_code: None,
    };
    enrich_container(&mut container, raw);
    container.status = status_text(container.state, container.exit_code);
    container
}

/// Fills the inspect-only fields of a list record. Also repairs the image name when the
/// list entry only carries a content id (the tag moved to a newer image).
pub fn enrich_container(container: &mut Container, detail: &RawContainerDetail) {
    let state = detail.state.as_ref();
    container.health = state
        .and_then(|s| s.health.as_ref())
        .and_then(|h| non_empty(h.status.as_ref()))
        .filter(|h| h != "none");
    container.restart_count = detail.restart_count;
    container.exit_code = if matches!(
        container.state,
        ContainerState::Exited | ContainerState::Dead
    ) {
        state.and_then(|s| s.exit_code)
    } else {
        None
    };
    container.started_at = parse_timestamp(state.and_then(|s| s.started_at.as_deref()))
        .map(|t| t.to_rfc3339());
    container.restart_policy = detail
        .host_config
        .as_ref()
        .and_then(|h| h.restart_policy.as_ref())
        .and_then(|p| non_empty(p.name.as_ref()));
    let config = detail.config.as_ref();
    container.tty = config.and_then(|c| c.tty).unwrap_or(false);
    if is_image_id(&container.image)
        && let Some(declared) = config.and_then(|c| c.image.as_deref())
        && !is_image_id(declared)
    {
        container.image = display_image(declared);
    }
}
