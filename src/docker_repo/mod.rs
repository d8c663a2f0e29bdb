// Engine resources as domain records: list/inspect/act on containers, images, networks,
// volumes, plus disk usage and prune.

mod prune;

pub use prune::PruneTarget;

use futures_util::{StreamExt, TryFutureExt, stream};
use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, info, warn};

use crate::engine::raw::RawContainerDetail;
use crate::engine::{EngineClient, EngineError, found};
use crate::error::{Error, Result};
use crate::logs::{LogOptions, LogStream};
use crate::models::{
    Container, ContainerStats, DiskUsage, EngineInfo, Image, Network, PruneReport, Volume,
};
use crate::normalize::{
    self, COMPOSE_PROJECT_LABEL, container_from_detail, container_from_summary, enrich_container,
};
use crate::stats::compute_stats;

/// Order matters: removing containers first frees their networks and images.
const SYSTEM_PRUNE_STEPS: &[PruneTarget] = &[
    PruneTarget::Containers,
    PruneTarget::Networks,
    PruneTarget::Images {
        dangling_only: true,
    },
    PruneTarget::BuildCache,
];

#[derive(Clone)]
pub struct DockerRepo {
    engine: EngineClient,
    /// Max simultaneous inspect calls while enriching a container list.
    enrich_concurrency: usize,
}

impl DockerRepo {
    pub fn new(engine: EngineClient, enrich_concurrency: usize) -> Self {
        Self {
            engine,
            enrich_concurrency: enrich_concurrency.max(1),
        }
    }

    pub fn engine(&self) -> &EngineClient {
        &self.engine
    }

    // --- system ---

    #[tracing::instrument(skip(self))]
    pub async fn engine_info(&self) -> Result<EngineInfo> {
        let raw = self.engine.version().await?;
        Ok(normalize::engine_info_from_raw(&raw))
    }

    #[tracing::instrument(skip(self))]
    pub async fn disk_usage(&self) -> Result<DiskUsage> {
        let raw = self.engine.disk_usage().await?;
        Ok(normalize::disk_usage_from_raw(&raw))
    }

    #[tracing::instrument(skip(self))]
    pub async fn prune(&self, target: PruneTarget) -> Result<PruneReport> {
        let steps: &[PruneTarget] = match target {
            PruneTarget::System => SYSTEM_PRUNE_STEPS,
            _ => std::slice::from_ref(&target),
        };
        let mut report = PruneReport::default();
        for step in steps {
            report.merge(self.prune_step(*step).await?);
        }
        info!(
            operation = "prune",
            %target,
            deleted = report.deleted.len(),
            space_reclaimed = report.space_reclaimed,
            "prune finished"
        );
        Ok(report)
    }

    async fn prune_step(&self, target: PruneTarget) -> Result<PruneReport> {
        let raw = match target {
            PruneTarget::Containers => self.engine.prune_containers().await?,
            PruneTarget::Images { dangling_only } => self.engine.prune_images(dangling_only).await?,
            PruneTarget::Networks => self.engine.prune_networks().await?,
            PruneTarget::Volumes => self.engine.prune_volumes().await?,
            PruneTarget::BuildCache => self.engine.prune_build_cache().await?,
            // expanded into its steps by `prune`
            PruneTarget::System => return Ok(PruneReport::default()),
        };
        Ok(normalize::prune_report_from_raw(&raw))
    }

    // --- containers ---

    /// All containers (or only running ones). With `enrich`, each record also gets its
    /// inspect-only fields; a failed inspect keeps the list fields for that container.
    #[tracing::instrument(skip(self))]
    pub async fn list_containers(&self, all: bool, enrich: bool) -> Result<Vec<Container>> {
        let raw = self.engine.list_containers(all).await?;
        let containers: Vec<Container> = raw.iter().map(container_from_summary).collect();
        if !enrich {
            return Ok(containers);
        }
        Ok(self.enrich(containers).await)
    }

    async fn enrich(&self, containers: Vec<Container>) -> Vec<Container> {
        let engine = &self.engine;
        enrich_with(containers, self.enrich_concurrency, |id| async move {
            engine.inspect_container(&id).await
        })
        .await
    }

    /// Every container carrying a compose project label, running or not.
    pub async fn compose_containers(&self) -> Result<Vec<Container>> {
        let mut filters = HashMap::new();
        filters.insert("label".to_string(), vec![COMPOSE_PROJECT_LABEL.to_string()]);
        let raw = self.engine.list_containers_filtered(true, filters).await?;
        Ok(raw.iter().map(container_from_summary).collect())
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_container(&self, id: &str) -> Result<Option<Container>> {
        let detail = found(self.engine.inspect_container(id).await)?;
        Ok(detail.as_ref().map(container_from_detail))
    }

    #[tracing::instrument(skip(self))]
    pub async fn start_container(&self, id: &str) -> Result<()> {
        self.engine.start_container(id).await?;
        info!(operation = "start", container = id, "container started");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn stop_container(&self, id: &str) -> Result<()> {
        self.engine.stop_container(id).await?;
        info!(operation = "stop", container = id, "container stopped");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn restart_container(&self, id: &str) -> Result<()> {
        self.engine.restart_container(id).await?;
        info!(operation = "restart", container = id, "container restarted");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_container(&self, id: &str, force: bool, volumes: bool) -> Result<()> {
        self.engine.remove_container(id, force, volumes).await?;
        info!(operation = "remove", container = id, "container removed");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn container_stats(&self, id: &str) -> Result<Option<ContainerStats>> {
        let snapshot = found(self.engine.stats(id).await)?;
        Ok(snapshot.as_ref().map(compute_stats))
    }

    /// Log stream for a container; `None` if it does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn container_logs(&self, id: &str, options: &LogOptions) -> Result<Option<LogStream>> {
        if found(self.engine.inspect_container(id).await)?.is_none() {
            return Ok(None);
        }
        debug!(container = id, follow = options.follow, "opening log stream");
        Ok(Some(self.engine.logs(id, options)))
    }

    // --- images ---

    async fn all_containers(&self) -> Result<Vec<Container>> {
        self.list_containers(true, false).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_images(&self) -> Result<Vec<Image>> {
        let (images, containers) =
            tokio::try_join!(self.engine.list_images().err_into::<Error>(), self.all_containers())?;
        let mut images: Vec<Image> = images
            .iter()
            .map(|i| normalize::image_from_summary(i, &containers))
            .collect();
        images.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(images)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_image(&self, id: &str) -> Result<Option<Image>> {
        let Some(raw) = found(self.engine.inspect_image(id).await)? else {
            return Ok(None);
        };
        let containers = self.all_containers().await?;
        Ok(Some(normalize::image_from_detail(&raw, &containers)))
    }

    /// Ids and tags the Engine untagged or deleted.
    #[tracing::instrument(skip(self))]
    pub async fn remove_image(&self, id: &str, force: bool) -> Result<Vec<String>> {
        let removed = self.engine.remove_image(id, force).await?;
        info!(operation = "remove_image", image = id, count = removed.len(), "image removed");
        Ok(removed)
    }

    // --- networks ---

    #[tracing::instrument(skip(self))]
    pub async fn list_networks(&self) -> Result<Vec<Network>> {
        let (networks, containers) =
            tokio::try_join!(self.engine.list_networks().err_into::<Error>(), self.all_containers())?;
        let mut networks: Vec<Network> = networks
            .iter()
            .map(|n| normalize::network_from_raw(n, &containers))
            .collect();
        networks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(networks)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_network(&self, id: &str) -> Result<Option<Network>> {
        let Some(raw) = found(self.engine.inspect_network(id).await)? else {
            return Ok(None);
        };
        let containers = self.all_containers().await?;
        Ok(Some(normalize::network_from_raw(&raw, &containers)))
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_network(&self, id: &str) -> Result<()> {
        self.engine.remove_network(id).await?;
        info!(operation = "remove_network", network = id, "network removed");
        Ok(())
    }

    // --- volumes ---

    #[tracing::instrument(skip(self))]
    pub async fn list_volumes(&self) -> Result<Vec<Volume>> {
        let (volumes, containers) =
            tokio::try_join!(self.engine.list_volumes().err_into::<Error>(), self.all_containers())?;
        let mut volumes: Vec<Volume> = volumes
            .iter()
            .map(|v| normalize::volume_from_raw(v, &containers))
            .collect();
        volumes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(volumes)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_volume(&self, name: &str) -> Result<Option<Volume>> {
        let Some(raw) = found(self.engine.inspect_volume(name).await)? else {
            return Ok(None);
        };
        let containers = self.all_containers().await?;
        Ok(Some(normalize::volume_from_raw(&raw, &containers)))
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_volume(&self, name: &str, force: bool) -> Result<()> {
        self.engine.remove_volume(name, force).await?;
        info!(operation = "remove_volume", volume = name, "volume removed");
        Ok(())
    }
}

/// Runs `inspect` for every container, at most `concurrency` at a time, and folds the
/// result into the record. Order is kept; a failed inspect leaves the list fields as they are.
async fn enrich_with<F, Fut>(containers: Vec<Container>, concurrency: usize, inspect: F) -> Vec<Container>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = std::result::Result<RawContainerDetail, EngineError>>,
{
    stream::iter(containers)
        .map(|mut c| {
            let pending = inspect(c.id.clone());
            async move {
                match pending.await {
                    Ok(detail) => enrich_container(&mut c, &detail),
                    Err(e) => warn!(
                        operation = "enrich_container",
                        container = %c.name,
                        error = %e,
                        "inspect failed, keeping list fields"
                    ),
                }
                c
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}
