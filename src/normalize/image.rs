// Image normalizer

use super::{display_image, labels, non_empty, parse_timestamp};
use crate::engine::raw::{RawImage, RawImageConfig, RawImageDetail};
use crate::models::{Container, Healthcheck, Image, ImageActions, ImageConfig, ImageContainer};

const UNTAGGED: &str = "<none>:<none>";
const UNTAGGED_DIGEST: &str = "<none>@<none>";

fn tags(raw: Option<&Vec<String>>) -> Vec<String> {
    raw.into_iter()
        .flatten()
        .filter(|t| t.as_str() != UNTAGGED)
        .map(|t| display_image(t))
        .collect()
}

fn digests(raw: Option<&Vec<String>>) -> Vec<String> {
    raw.into_iter()
        .flatten()
        .filter(|d| d.as_str() != UNTAGGED_DIGEST)
        .cloned()
        .collect()
}

/// `ghcr.io:5000/team/app:1.2` -> `ghcr.io:5000/team/app`; the tag is whatever follows the
/// last `:` that is not part of a registry host.
pub fn repository_of(tag: &str) -> &str {
    let reference = tag.split('@').next().unwrap_or(tag);
    match reference.rfind(':') {
        Some(idx) if !reference[idx + 1..].contains('/') => &reference[..idx],
        _ => reference,
    }
}

fn users_of(id: &str, containers: &[Container]) -> Vec<ImageContainer> {
    containers
        .iter()
        .filter(|c| c.image_id == id)
        .map(|c| ImageContainer {
            id: c.id.clone(),
            name: c.name.clone(),
            state: c.state,
        })
        .collect()
}

fn build(
    id: &str,
    tags: Vec<String>,
    digests: Vec<String>,
    size: Option<i64>,
    created: i64,
    config: Option<ImageConfig>,
    containers: &[Container],
) -> Image {
    let users = users_of(id, containers);
    let repository = tags
        .first()
        .map(|t| repository_of(t).to_string())
        .unwrap_or_else(|| "<none>".to_string());
    Image {
        id: id.to_string(),
        dangling: tags.is_empty() && users.is_empty(),
        repository,
        tags,
        digests,
        size: size.unwrap_or(0).max(0) as u64,
        created,
        config,
        actions: ImageActions {
            can_delete: users.is_empty(),
        },
        containers: users,
    }
}

/// From a `GET /images/json` entry; `containers` is the current container list used to find
/// the image's users.
pub fn image_from_summary(raw: &RawImage, containers: &[Container]) -> Image {
    build(
        &raw.id,
        tags(raw.repo_tags.as_ref()),
        digests(raw.repo_digests.as_ref()),
        raw.size,
        raw.created.unwrap_or(0),
        None,
        containers,
    )
}

pub fn image_from_detail(raw: &RawImageDetail, containers: &[Container]) -> Image {
    build(
        &raw.id,
        tags(raw.repo_tags.as_ref()),
        digests(raw.repo_digests.as_ref()),
        raw.size,
        parse_timestamp(raw.created.as_deref())
            .map(|t| t.timestamp())
            .unwrap_or(0),
        raw.config.as_ref().map(image_config),
        containers,
    )
}

fn sorted_keys(map: Option<&std::collections::HashMap<String, serde_json::Value>>) -> Vec<String> {
    let mut keys: Vec<String> = map.into_iter().flat_map(|m| m.keys().cloned()).collect();
    keys.sort();
    keys
}

fn image_config(raw: &RawImageConfig) -> ImageConfig {
    ImageConfig {
        entrypoint: raw.entrypoint.clone().unwrap_or_default(),
        cmd: raw.cmd.clone().unwrap_or_default(),
        working_dir: non_empty(raw.working_dir.as_ref()),
        user: non_empty(raw.user.as_ref()),
        exposed_ports: sorted_keys(raw.exposed_ports.as_ref()),
        volumes: sorted_keys(raw.volumes.as_ref()),
        env: raw.env.clone().unwrap_or_default(),
        healthcheck: raw
            .healthcheck
            .as_ref()
            .filter(|h| h.test.as_ref().is_some_and(|t| !t.is_empty()))
            .map(|h| Healthcheck {
                test: h.test.clone().unwrap_or_default(),
                interval: h.interval,
                timeout: h.timeout,
                retries: h.retries,
            }),
        labels: labels(raw.labels.as_ref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::raw::{RawContainer, decode};
    use crate::normalize::container_from_summary;
    use serde_json::json;

    #[test]
    fn repository_split_respects_registry_port() {
        assert_eq!(repository_of("nginx:1.27"), "nginx");
        assert_eq!(repository_of("registry.local:5000/team/app"), "registry.local:5000/team/app");
        assert_eq!(repository_of("registry.local:5000/team/app:2"), "registry.local:5000/team/app");
        assert_eq!(repository_of("redis@sha256:abc"), "redis");
        assert_eq!(repository_of("alpine"), "alpine");
    }

    fn running_user(image_id: &str) -> Container {
        let raw: RawContainer = decode(&json!({
            "Id": "c1",
            "Names": ["/app"],
            "Image": "nginx:1.27",
            "ImageID": image_id,
            "State": "running"
        }))
        .unwrap();
        container_from_summary(&raw)
    }

    #[test]
    fn image_in_use_cannot_be_deleted() {
        let raw: RawImage = decode(&json!({
            "Id": "sha256:aaa",
            "RepoTags": ["docker.io/library/nginx:1.27", "nginx:latest"],
            "RepoDigests": ["nginx@sha256:ddd"],
            "Created": 1_700_000_000,
            "Size": 187_000_000
        }))
        .unwrap();
        let img = image_from_summary(&raw, &[running_user("sha256:aaa")]);
        assert_eq!(img.tags, vec!["nginx:1.27", "nginx:latest"]);
        assert_eq!(img.repository, "nginx");
        assert_eq!(img.containers.len(), 1);
        assert_eq!(img.containers[0].name, "app");
        assert!(!img.actions.can_delete);
        assert!(!img.dangling);
        assert_eq!(img.size, 187_000_000);
    }

    #[test]
    fn untagged_unused_image_is_dangling() {
        let raw: RawImage = decode(&json!({
            "Id": "sha256:bbb",
            "RepoTags": ["<none>:<none>"],
            "RepoDigests": ["<none>@<none>"],
            "Size": 10
        }))
        .unwrap();
        let img = image_from_summary(&raw, &[running_user("sha256:aaa")]);
        assert!(img.tags.is_empty() && img.digests.is_empty());
        assert_eq!(img.repository, "<none>");
        assert!(img.dangling);
        assert!(img.actions.can_delete);
    }

    #[test]
    fn untagged_image_used_by_a_container_is_not_dangling() {
        let raw: RawImage = decode(&json!({"Id": "sha256:aaa", "RepoTags": null})).unwrap();
        let img = image_from_summary(&raw, &[running_user("sha256:aaa")]);
        assert!(!img.dangling);
    }

    #[test]
    fn detail_parses_config() {
        let raw: RawImageDetail = decode(&json!({
            "Id": "sha256:aaa",
            "RepoTags": ["postgres:16"],
            "Created": "2024-05-01T10:00:00Z",
            "Size": 400,
            "Config": {
                "Entrypoint": ["docker-entrypoint.sh"],
                "Cmd": ["postgres"],
                "WorkingDir": "",
                "User": "postgres",
                "ExposedPorts": {"5432/tcp": {}},
                "Volumes": {"/var/lib/postgresql/data": {}},
                "Env": ["PGDATA=/var/lib/postgresql/data"],
                "Healthcheck": {"Test": ["CMD", "pg_isready"], "Interval": 10_000_000_000i64, "Retries": 5},
                "Labels": null
            }
        }))
        .unwrap();
        let img = image_from_detail(&raw, &[]);
        assert_eq!(img.created, 1_714_557_600);
        let cfg = img.config.unwrap();
        assert_eq!(cfg.entrypoint, vec!["docker-entrypoint.sh"]);
        assert_eq!(cfg.working_dir, None);
        assert_eq!(cfg.user.as_deref(), Some("postgres"));
        assert_eq!(cfg.exposed_ports, vec!["5432/tcp"]);
        assert_eq!(cfg.volumes, vec!["/var/lib/postgresql/data"]);
        let hc = cfg.healthcheck.unwrap();
        assert_eq!(hc.test, vec!["CMD", "pg_isready"]);
        assert_eq!(hc.retries, Some(5));
        assert!(cfg.labels.is_empty());
    }
}
