// Compose project discovery and status derivation

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::manifest::{MANIFEST_FILES, Manifest};
use crate::error::{Error, Result};
use crate::models::{
    Container, ContainerState, Project, ProjectService, ProjectStatus, ServiceStatus,
};

const MAX_PROJECT_NAME_LEN: usize = 255;

/// Project names become path components; only `[A-Za-z0-9_-]` is accepted.
pub fn validate_project_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid("project name must not be empty"));
    }
    if name.len() > MAX_PROJECT_NAME_LEN {
        return Err(Error::invalid(format!(
            "project name must be at most {} characters",
            MAX_PROJECT_NAME_LEN
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::invalid(format!(
            "project name {:?} may only contain letters, digits, '-' and '_'",
            name
        )));
    }
    Ok(())
}

/// A project directory found on disk. `manifest` is `None` when the file could not be parsed.
#[derive(Debug, Clone)]
pub struct DiscoveredProject {
    pub name: String,
    pub dir: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: Option<Manifest>,
}

impl DiscoveredProject {
    /// Name the Engine CLI labels containers with: the manifest's `name`, else the directory
    /// name lower-cased with unsupported characters dropped.
    pub fn compose_name(&self) -> String {
        if let Some(name) = self.manifest.as_ref().and_then(|m| m.name.clone()) {
            return name;
        }
        self.name
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect()
    }
}

/// First manifest file present in `dir`, by priority.
pub async fn find_manifest(dir: &Path) -> Option<PathBuf> {
    for name in MANIFEST_FILES {
        let path = dir.join(name);
        if let Ok(meta) = tokio::fs::metadata(&path).await
            && meta.is_file()
        {
            return Some(path);
        }
    }
    None
}

async fn load_project(name: String, dir: PathBuf) -> Option<DiscoveredProject> {
    let manifest_path = find_manifest(&dir).await?;
    let manifest = match Manifest::load(&manifest_path).await {
        Ok(m) => Some(m),
        Err(e) => {
            warn!(project = %name, error = %e, "unreadable compose manifest, status unknown");
            None
        }
    };
    Some(DiscoveredProject {
        name,
        dir,
        manifest_path,
        manifest,
    })
}

/// Every project directory under `root`, sorted by name. A missing root yields no projects.
pub async fn discover(root: &Path) -> Result<Vec<DiscoveredProject>> {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(root = %root.display(), "projects root does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut projects = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        // follows symlinks, so linked project directories count
        let is_dir = tokio::fs::metadata(entry.path())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            continue;
        }
        if validate_project_name(&name).is_err() {
            debug!(dir = %name, "skipping directory with unsupported project name");
            continue;
        }
        if let Some(project) = load_project(name, entry.path()).await {
            projects.push(project);
        }
    }
    projects.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(root = %root.display(), count = projects.len(), "project scan finished");
    Ok(projects)
}

/// Looks up one project; the name is validated before any filesystem access.
pub async fn discover_one(root: &Path, name: &str) -> Result<Option<DiscoveredProject>> {
    validate_project_name(name)?;
    let dir = root.join(name);
    match tokio::fs::metadata(&dir).await {
        Ok(meta) if meta.is_dir() => Ok(load_project(name.to_string(), dir).await),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn service_status(state: ContainerState) -> ServiceStatus {
    match state {
        ContainerState::Running => ServiceStatus::Running,
        ContainerState::Restarting => ServiceStatus::Restarting,
        _ => ServiceStatus::Exited,
    }
}

/// Prefers a running container, then a restarting one, then any other.
fn rank(state: ContainerState) -> u8 {
    match state {
        ContainerState::Running => 0,
        ContainerState::Restarting => 1,
        _ => 2,
    }
}

pub fn aggregate_status(services: &[ProjectService]) -> ProjectStatus {
    if services.is_empty() {
        return ProjectStatus::Unknown;
    }
    let live = services.iter().filter(|s| s.status.is_live()).count();
    if live == services.len() {
        ProjectStatus::Running
    } else if live > 0 {
        ProjectStatus::Partial
    } else {
        ProjectStatus::Stopped
    }
}

/// Joins a discovered project with the containers labelled for it.
pub fn build_project(discovered: &DiscoveredProject, containers: &[Container]) -> Project {
    let Some(manifest) = discovered.manifest.as_ref() else {
        return Project {
            name: discovered.name.clone(),
            path: discovered.dir.clone(),
            manifest_path: discovered.manifest_path.clone(),
            status: ProjectStatus::Unknown,
            services: Vec::new(),
        };
    };
    let compose_name = discovered.compose_name();
    let services: Vec<ProjectService> = manifest
        .services
        .iter()
        .map(|decl| {
            let best = containers
                .iter()
                .filter(|c| {
                    c.compose_project.as_deref() == Some(compose_name.as_str())
                        && c.compose_service.as_deref() == Some(decl.name.as_str())
                })
                .min_by_key(|c| rank(c.state));
            ProjectService {
                name: decl.name.clone(),
                image: decl.image.clone(),
                live_image: best.map(|c| c.image.clone()),
                container_id: best.map(|c| c.id.clone()),
                container_name: best.map(|c| c.name.clone()),
                status: best
                    .map(|c| service_status(c.state))
                    .unwrap_or(ServiceStatus::Unknown),
                has_build: decl.has_build,
            }
        })
        .collect();
    Project {
        name: discovered.name.clone(),
        path: discovered.dir.clone(),
        manifest_path: discovered.manifest_path.clone(),
        status: aggregate_status(&services),
        services,
    }
}
