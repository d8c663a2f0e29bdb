// Volume normalizer

use super::{COMPOSE_PROJECT_LABEL, labels};
use crate::engine::raw::RawVolume;
use crate::models::{Container, MountType, ResourceActions, Volume};

/// `containers` supplies the mount count when the Engine did not report usage data.
pub fn volume_from_raw(raw: &RawVolume, containers: &[Container]) -> Volume {
    let labels = labels(raw.labels.as_ref());
    let mounting = containers
        .iter()
        .filter(|c| {
            c.mounts
                .iter()
                .any(|m| m.type_ == MountType::Volume && m.name.as_deref() == Some(&raw.name))
        })
        .count();
    let usage = raw.usage_data.as_ref();
    let ref_count = usage
        .and_then(|u| u.ref_count)
        .filter(|n| *n >= 0)
        .map(|n| n as usize)
        .unwrap_or(0);
    let in_use = mounting.max(ref_count);
    Volume {
        name: raw.name.clone(),
        driver: raw.driver.clone().unwrap_or_else(|| "local".to_string()),
        mountpoint: raw.mountpoint.clone().unwrap_or_default(),
        scope: raw.scope.clone().unwrap_or_else(|| "local".to_string()),
        created_at: raw.created_at.clone(),
        compose_project: labels.get(COMPOSE_PROJECT_LABEL).cloned(),
        labels,
        options: super::labels(raw.options.as_ref()),
        // -1 means the Engine did not compute it
        size: usage.and_then(|u| u.size).filter(|s| *s >= 0),
        containers: in_use,
        actions: ResourceActions {
            can_delete: in_use == 0,
        },
    }
}
