// Compose projects under the configured root, joined with live container state

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::compose::{
    ComposeCommand, ComposeOutcome, ComposeRun, ComposeRunner, DiscoveredProject, ScanCache,
    build_project, discover, discover_one, validate_project_name,
};
use crate::docker_repo::DockerRepo;
use crate::error::Result;
use crate::models::{Container, Project};

pub struct ProjectRepo {
    root: PathBuf,
    docker: DockerRepo,
    cache: ScanCache<Vec<DiscoveredProject>>,
    runner: ComposeRunner,
}

impl ProjectRepo {
    pub fn new(root: impl Into<PathBuf>, docker: DockerRepo, runner: ComposeRunner, ttl: Duration) -> Self {
        Self {
            root: root.into(),
            docker,
            cache: ScanCache::new(ttl),
            runner,
        }
    }

    /// Project directories on disk, shared between concurrent callers and cached briefly.
    pub async fn discover(&self) -> Result<Arc<Vec<DiscoveredProject>>> {
        let root = self.root.clone();
        self.cache
            .get_or_scan(&self.root, move || async move { discover(&root).await })
            .await
    }

    async fn find(&self, name: &str) -> Result<Option<DiscoveredProject>> {
        validate_project_name(name)?;
        let cached = self.discover().await?;
        if let Some(p) = cached.iter().find(|p| p.name == name) {
            return Ok(Some(p.clone()));
        }
        // created since the last scan
        discover_one(&self.root, name).await
    }

    async fn containers(&self) -> Result<Vec<Container>> {
        self.docker.compose_containers().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn scan_projects(&self) -> Result<Vec<Project>> {
        let discovered = self.discover().await?;
        let containers = self.containers().await?;
        Ok(discovered
            .iter()
            .map(|d| build_project(d, &containers))
            .collect())
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_project(&self, name: &str) -> Result<Option<Project>> {
        let Some(discovered) = self.find(name).await? else {
            return Ok(None);
        };
        let containers = self.containers().await?;
        Ok(Some(build_project(&discovered, &containers)))
    }

    /// Starts a compose command for the project. `None` if the project does not exist.
    pub async fn spawn(&self, name: &str, command: &ComposeCommand) -> Result<Option<ComposeRun>> {
        command.validate()?;
        let Some(project) = self.find(name).await? else {
            return Ok(None);
        };
        if command.mutates() {
            self.cache.invalidate(&self.root);
        }
        let run = self
            .runner
            .spawn(&project.dir, &project.manifest_path, command)
            .await?;
        Ok(Some(run))
    }

    /// Runs a compose command to completion. A failing command is an `Ok` outcome with
    /// `success == false`.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, name: &str, command: &ComposeCommand) -> Result<Option<ComposeOutcome>> {
        let Some(run) = self.spawn(name, command).await? else {
            return Ok(None);
        };
        let outcome = run.wait().await;
        if command.mutates() {
            self.cache.invalidate(&self.root);
        }
        let outcome = outcome?;
        info!(
            operation = "compose",
            project = name,
            command = command.name(),
            exit_code = outcome.exit_code,
            "compose command finished"
        );
        Ok(Some(outcome))
    }
}
