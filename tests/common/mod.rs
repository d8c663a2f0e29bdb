// Shared test helpers

#![allow(dead_code)]

use dockhand::compose::{ComposeRunner, PathTranslator};
use dockhand::docker_repo::DockerRepo;
use dockhand::engine::{EngineClient, Endpoint};
use dockhand::project_repo::ProjectRepo;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Nothing listens on port 1, so every Engine call fails fast as unreachable.
pub const DEAD_ENDPOINT: &str = "tcp://127.0.0.1:1";

pub fn dead_docker_repo() -> DockerRepo {
    let endpoint = Endpoint::parse(DEAD_ENDPOINT).unwrap();
    let engine =
        EngineClient::connect(&endpoint, Duration::from_secs(2), Duration::from_secs(2)).unwrap();
    DockerRepo::new(engine, 4)
}

pub fn project_repo(root: &Path, docker: DockerRepo, binary: &str) -> Arc<ProjectRepo> {
    let endpoint = Endpoint::parse(DEAD_ENDPOINT).unwrap();
    let runner = ComposeRunner::new(binary, Vec::new(), PathTranslator::new(root, root), &endpoint);
    Arc::new(ProjectRepo::new(root, docker, runner, Duration::from_secs(2)))
}

/// Creates `root/name/<file>` with `manifest` as content.
pub fn write_project(root: &Path, name: &str, file: &str, manifest: &str) {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(file), manifest).unwrap();
}

/// Executable shell script at `path`.
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).unwrap();
}
