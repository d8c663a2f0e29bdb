// Engine identity, disk usage and prune report normalizers

use crate::engine::raw::{RawDiskUsage, RawPruneResponse, RawVersion};
use crate::models::{DiskUsage, DiskUsageCategory, EngineInfo, PruneReport};

fn bytes(n: Option<i64>) -> u64 {
    n.filter(|n| *n > 0).unwrap_or(0) as u64
}

fn category<I>(items: I) -> DiskUsageCategory
where
    I: IntoIterator<Item = (bool, u64)>,
{
    items
        .into_iter()
        .fold(DiskUsageCategory::default(), |mut acc, (active, size)| {
            acc.count += 1;
            acc.size += size;
            if active {
                acc.active += 1;
            } else {
                acc.reclaimable += size;
            }
            acc
        })
}

pub fn disk_usage_from_raw(raw: &RawDiskUsage) -> DiskUsage {
    DiskUsage {
        layers_size: bytes(raw.layers_size),
        images: category(
            raw.images
                .iter()
                .flatten()
                .map(|i| (i.containers.unwrap_or(0) > 0, bytes(i.size))),
        ),
        containers: category(raw.containers.iter().flatten().map(|c| {
            (
                c.state.as_deref() == Some("running"),
                bytes(c.size_rw),
            )
        })),
        volumes: category(raw.volumes.iter().flatten().map(|v| {
            let usage = v.usage_data.as_ref();
            (
                usage.and_then(|u| u.ref_count).unwrap_or(0) > 0,
                bytes(usage.and_then(|u| u.size)),
            )
        })),
        build_cache: category(raw.build_cache.iter().flatten().map(|b| {
            (
                b.in_use.unwrap_or(false) || b.shared.unwrap_or(false),
                bytes(b.size),
            )
        })),
    }
}

/// Flattens whichever `*Deleted` list the prune call filled in.
pub fn prune_report_from_raw(raw: &RawPruneResponse) -> PruneReport {
    let mut deleted: Vec<String> = Vec::new();
    for list in [
        &raw.containers_deleted,
        &raw.networks_deleted,
        &raw.volumes_deleted,
        &raw.caches_deleted,
    ] {
        deleted.extend(list.iter().flatten().cloned());
    }
    for image in raw.images_deleted.iter().flatten() {
        if let Some(id) = image.deleted.as_ref().or(image.untagged.as_ref()) {
            deleted.push(id.clone());
        }
    }
    PruneReport {
        deleted,
        space_reclaimed: bytes(raw.space_reclaimed),
    }
}

pub fn engine_info_from_raw(raw: &RawVersion) -> EngineInfo {
    let field = |v: &Option<String>| v.clone().unwrap_or_default();
    EngineInfo {
        version: field(&raw.version),
        api_version: field(&raw.api_version),
        os: field(&raw.os),
        arch: field(&raw.arch),
        kernel_version: field(&raw.kernel_version),
    }
}
