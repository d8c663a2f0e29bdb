// Raw Engine payloads -> stable domain records.

pub mod container;
pub mod image;
pub mod network;
pub mod system;
pub mod volume;

use chrono::{DateTime, Datelike};
use std::collections::{BTreeMap, HashMap};

pub use container::{
    container_from_detail, container_from_summary, dedup_sort_ports, enrich_container,
};
pub use image::{image_from_detail, image_from_summary};
pub use network::network_from_raw;
pub use system::{disk_usage_from_raw, engine_info_from_raw, prune_report_from_raw};
pub use volume::volume_from_raw;

pub const COMPOSE_PROJECT_LABEL: &str = "com.docker.compose.project";
pub const COMPOSE_SERVICE_LABEL: &str = "com.docker.compose.service";

/// Registry prefixes hidden when displaying image references.
const DEFAULT_REGISTRY_PREFIXES: &[&str] = &[
    "docker.io/library/",
    "index.docker.io/library/",
    "registry-1.docker.io/library/",
    "docker.io/",
    "index.docker.io/",
];

pub(crate) fn labels(raw: Option<&HashMap<String, String>>) -> BTreeMap<String, String> {
    raw.map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

/// `docker.io/library/nginx:latest` -> `nginx:latest`.
pub fn display_image(reference: &str) -> String {
    DEFAULT_REGISTRY_PREFIXES
        .iter()
        .find_map(|p| reference.strip_prefix(p))
        .unwrap_or(reference)
        .to_string()
}

/// True when an image reference is a content id rather than a name.
pub fn is_image_id(reference: &str) -> bool {
    if let Some(hex) = reference.strip_prefix("sha256:") {
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    reference.len() == 64 && reference.chars().all(|c| c.is_ascii_hexdigit())
}

/// RFC3339 Engine timestamp; `None` for the Engine's zero time or garbage.
pub(crate) fn parse_timestamp(s: Option<&str>) -> Option<DateTime<chrono::FixedOffset>> {
    let ts = DateTime::parse_from_rfc3339(s?).ok()?;
    (ts.year() > 1).then_some(ts)
}

pub(crate) fn non_empty(s: Option<&String>) -> Option<String> {
    s.filter(|s| !s.is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_image_strips_default_registry() {
        assert_eq!(display_image("docker.io/library/nginx:1.27"), "nginx:1.27");
        assert_eq!(display_image("docker.io/grafana/grafana"), "grafana/grafana");
        assert_eq!(display_image("ghcr.io/home/app:2"), "ghcr.io/home/app:2");
        assert_eq!(display_image("redis"), "redis");
    }

    #[test]
    fn image_id_detection() {
        assert!(is_image_id("sha256:0123abcd"));
        assert!(is_image_id(&"a".repeat(64)));
        assert!(!is_image_id("nginx:latest"));
        assert!(!is_image_id("sha256:"));
    }

    #[test]
    fn zero_time_is_none() {
        assert!(parse_timestamp(Some("0001-01-01T00:00:00Z")).is_none());
        assert!(parse_timestamp(Some("garbage")).is_none());
        let ts = parse_timestamp(Some("2024-05-01T10:00:00.123456789Z")).unwrap();
        assert_eq!(ts.timestamp(), 1_714_557_600);
    }
}
