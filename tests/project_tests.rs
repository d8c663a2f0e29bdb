// Project discovery, status and manifest translation against a temp directory

mod common;

use dockhand::compose::{PathTranslator, build_project, discover, discover_one, preprocess};
use dockhand::engine::raw::RawContainer;
use dockhand::models::{Container, ProjectStatus, ServiceStatus};
use dockhand::normalize::container_from_summary;
use tempfile::TempDir;

const TWO_SERVICES: &str = "\
services:
  web:
    image: nginx:1.27
  worker:
    build: ./worker
";

fn compose_container(project: &str, service: &str, state: &str) -> Container {
    let raw: RawContainer = serde_json::from_value(serde_json::json!({
        "Id": format!("{}-{}-{}", project, service, state),
        "Names": [format!("/{}-{}-1", project, service)],
        "Image": "nginx:1.27",
        "ImageID": "sha256:aaa",
        "State": state,
        "Status": "",
        "Labels": {
            "com.docker.compose.project": project,
            "com.docker.compose.service": service,
        },
    }))
    .unwrap();
    container_from_summary(&raw)
}

#[tokio::test]
async fn test_discover_finds_projects_sorted() {
    let root = TempDir::new().unwrap();
    common::write_project(root.path(), "zeta", "compose.yaml", TWO_SERVICES);
    common::write_project(root.path(), "alpha", "docker-compose.yml", TWO_SERVICES);
    // ignored: hidden, invalid name, no manifest, plain file
    common::write_project(root.path(), ".hidden", "compose.yaml", TWO_SERVICES);
    common::write_project(root.path(), "bad.name", "compose.yaml", TWO_SERVICES);
    std::fs::create_dir(root.path().join("empty")).unwrap();
    std::fs::write(root.path().join("notes.txt"), "hi").unwrap();

    let projects = discover(root.path()).await.unwrap();
    let names: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
    assert!(projects[0].manifest_path.ends_with("docker-compose.yml"));
}

#[tokio::test]
async fn test_discover_missing_root_is_empty() {
    let root = TempDir::new().unwrap();
    let projects = discover(&root.path().join("nope")).await.unwrap();
    assert!(projects.is_empty());
}

#[tokio::test]
async fn test_manifest_priority() {
    let root = TempDir::new().unwrap();
    common::write_project(root.path(), "app", "docker-compose.yaml", "services: {}\n");
    common::write_project(root.path(), "app", "compose.yml", TWO_SERVICES);
    let project = discover_one(root.path(), "app").await.unwrap().unwrap();
    assert!(project.manifest_path.ends_with("compose.yml"));
    assert_eq!(project.manifest.unwrap().services.len(), 2);
}

#[tokio::test]
async fn test_discover_one_validates_name() {
    let root = TempDir::new().unwrap();
    assert!(discover_one(root.path(), "../etc").await.is_err());
    assert!(discover_one(root.path(), "").await.is_err());
    assert!(discover_one(root.path(), "ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn test_project_status_from_containers() {
    let root = TempDir::new().unwrap();
    common::write_project(root.path(), "shop", "compose.yaml", TWO_SERVICES);
    let project = discover_one(root.path(), "shop").await.unwrap().unwrap();

    let none = build_project(&project, &[]);
    assert_eq!(none.status, ProjectStatus::Stopped);
    assert!(
        none.services
            .iter()
            .all(|s| s.status == ServiceStatus::Unknown)
    );

    let partial = build_project(
        &project,
        &[
            compose_container("shop", "web", "running"),
            compose_container("shop", "worker", "exited"),
            compose_container("other", "worker", "running"),
        ],
    );
    assert_eq!(partial.status, ProjectStatus::Partial);
    assert_eq!(partial.services[0].name, "web");
    assert_eq!(partial.services[0].status, ServiceStatus::Running);
    assert_eq!(partial.services[1].status, ServiceStatus::Exited);
    assert!(partial.services[1].has_build);

    let running = build_project(
        &project,
        &[
            compose_container("shop", "web", "exited"),
            compose_container("shop", "web", "running"),
            compose_container("shop", "worker", "restarting"),
        ],
    );
    assert_eq!(running.status, ProjectStatus::Running);
    assert_eq!(running.services[0].status, ServiceStatus::Running);
}

#[tokio::test]
async fn test_unparseable_manifest_is_unknown() {
    let root = TempDir::new().unwrap();
    common::write_project(root.path(), "broken", "compose.yaml", "services: [unclosed\n");
    let project = discover_one(root.path(), "broken").await.unwrap().unwrap();
    assert!(project.manifest.is_none());
    let built = build_project(&project, &[compose_container("broken", "web", "running")]);
    assert_eq!(built.status, ProjectStatus::Unknown);
    assert!(built.services.is_empty());
}

#[tokio::test]
async fn test_preprocess_rewrites_for_host() {
    let root = TempDir::new().unwrap();
    common::write_project(
        root.path(),
        "app",
        "compose.yaml",
        "\
services:
  web:
    image: nginx
    volumes:
      - ./html:/usr/share/nginx/html:ro
      - data:/var/lib/data
      - /etc/localtime:/etc/localtime:ro
volumes:
  data: {}
",
    );
    let dir = root.path().join("app");
    let translator = PathTranslator::new(root.path(), "/srv/stacks");
    let translated = preprocess(&dir.join("compose.yaml"), &dir, &translator)
        .await
        .unwrap();
    let text = std::fs::read_to_string(translated.path()).unwrap();
    assert!(text.contains("/srv/stacks/app/html:/usr/share/nginx/html:ro"));
    assert!(text.contains("data:/var/lib/data"));
    assert!(text.contains("/etc/localtime:/etc/localtime:ro"));
    // the original stays untouched
    let original = std::fs::read_to_string(dir.join("compose.yaml")).unwrap();
    assert!(original.contains("./html:"));

    let path = translated.path().to_path_buf();
    translated.cleanup();
    assert!(!path.exists());
}
