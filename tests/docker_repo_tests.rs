// Optional DockerRepo tests when a Docker daemon is available

use dockhand::docker_repo::DockerRepo;
use dockhand::engine::{EngineClient, Endpoint};
use dockhand::normalize::dedup_sort_ports;
use std::time::Duration;

async fn local_repo() -> Option<DockerRepo> {
    let engine = EngineClient::connect(
        &Endpoint::default(),
        Duration::from_secs(5),
        Duration::from_secs(30),
    )
    .ok()?;
    // Skip when Docker is not available (e.g. CI without Docker)
    engine.ping().await.ok()?;
    Some(DockerRepo::new(engine, 4))
}

#[tokio::test]
async fn docker_repo_lists_resources() {
    let Some(repo) = local_repo().await else {
        return;
    };
    let info = repo.engine_info().await.unwrap();
    assert!(!info.version.is_empty());

    let containers = repo.list_containers(true, true).await.unwrap();
    for c in &containers {
        assert!(!c.id.is_empty());
        // listings are port-deduplicated and sorted
        assert_eq!(dedup_sort_ports(c.ports.clone()), c.ports);
    }
    let _ = repo.list_images().await.unwrap();
    let networks = repo.list_networks().await.unwrap();
    assert!(
        networks
            .iter()
            .filter(|n| n.builtin)
            .all(|n| !n.actions.can_delete)
    );
    let _ = repo.list_volumes().await.unwrap();
    let _ = repo.disk_usage().await.unwrap();
}

#[tokio::test]
async fn docker_repo_missing_container_is_none() {
    let Some(repo) = local_repo().await else {
        return;
    };
    let missing = "dockhand-test-no-such-container";
    assert!(repo.get_container(missing).await.unwrap().is_none());
    assert!(repo.container_stats(missing).await.unwrap().is_none());
    assert!(repo.get_volume(missing).await.unwrap().is_none());
}
