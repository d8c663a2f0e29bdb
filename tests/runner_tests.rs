// Compose process runner against a stub compose binary

#![cfg(unix)]

mod common;

use dockhand::compose::{ComposeCommand, ComposeRunner, PathTranslator};
use dockhand::engine::Endpoint;
use dockhand::logs::LogStreamKind;
use std::path::PathBuf;
use tempfile::TempDir;

/// Stub `docker-compose` printing its arguments, the manifest it was given and its env.
fn stub_binary(bin: &TempDir) -> PathBuf {
    let script = bin.path().join("docker-compose");
    common::write_script(
        &script,
        "echo \"args: $*\"\n\
         cat \"$2\"\n\
         echo \"host: $DOCKER_HOST\"\n\
         echo \"secret: ${DOCKHAND_TEST_SECRET:-unset}\"\n\
         echo done >&2",
    );
    script
}

fn runner(binary: &PathBuf, translator: PathTranslator) -> ComposeRunner {
    let endpoint = Endpoint::parse("tcp://engine:2375").unwrap();
    ComposeRunner::new(binary.to_str().unwrap(), Vec::new(), translator, &endpoint)
}

#[tokio::test]
async fn test_runner_identity_paths() {
    let root = TempDir::new().unwrap();
    common::write_project(root.path(), "app", "compose.yaml", "services: {}\n");
    let bin = TempDir::new().unwrap();
    let binary = stub_binary(&bin);
    let dir = root.path().join("app");
    let manifest = dir.join("compose.yaml");
    unsafe { std::env::set_var("DOCKHAND_TEST_SECRET", "hunter2") };

    let runner = runner(&binary, PathTranslator::new(root.path(), root.path()));
    let outcome = runner
        .run(
            &dir,
            &manifest,
            &ComposeCommand::Down {
                volumes: true,
                remove_orphans: false,
            },
        )
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.exit_code, 0);
    let expected = format!("args: -f {} down -v", manifest.display());
    assert!(outcome.output.contains(&expected), "output: {}", outcome.output);
    assert!(outcome.output.contains("host: tcp://engine:2375"));
    assert!(outcome.output.contains("secret: unset"));
    assert!(outcome.output.contains("done"));
}

#[tokio::test]
async fn test_runner_translates_and_cleans_up() {
    let root = TempDir::new().unwrap();
    common::write_project(
        root.path(),
        "app",
        "compose.yaml",
        "services:\n  web:\n    image: nginx\n    volumes:\n      - ./data:/data\n",
    );
    let bin = TempDir::new().unwrap();
    let binary = stub_binary(&bin);
    let dir = root.path().join("app");

    let runner = runner(&binary, PathTranslator::new(root.path(), "/srv/stacks"));
    let mut run = runner
        .spawn(
            &dir,
            &dir.join("compose.yaml"),
            &ComposeCommand::Up {
                build: false,
                pull_always: true,
            },
        )
        .await
        .unwrap();

    let first = loop {
        let line = run.next_line().await.unwrap();
        if line.text.starts_with("args:") {
            break line;
        }
    };
    assert_eq!(first.stream, LogStreamKind::Stdout);
    assert!(first.text.contains("--project-directory /srv/stacks/app"));
    assert!(first.text.ends_with("up -d --pull always"));
    let translated: PathBuf = first
        .text
        .split_whitespace()
        .nth(2)
        .map(PathBuf::from)
        .unwrap();
    assert!(translated.exists());

    let outcome = run.wait().await.unwrap();
    assert!(outcome.output.contains("/srv/stacks/app/data:/data"));
    assert!(!translated.exists());
}

#[tokio::test]
async fn test_runner_reports_failure_exit() {
    let root = TempDir::new().unwrap();
    common::write_project(root.path(), "app", "compose.yaml", "services: {}\n");
    let bin = TempDir::new().unwrap();
    let script = bin.path().join("docker-compose");
    common::write_script(&script, "echo 'no such service' >&2\nexit 1");
    let dir = root.path().join("app");

    let runner = runner(&script, PathTranslator::new(root.path(), root.path()));
    let outcome = runner
        .run(
            &dir,
            &dir.join("compose.yaml"),
            &ComposeCommand::Restart {
                service: Some("api".into()),
            },
        )
        .await
        .unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.exit_code, 1);
    assert_eq!(outcome.output, "no such service");
}

#[tokio::test]
async fn test_runner_rejects_flag_like_service() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join("app");
    let runner = runner(
        &PathBuf::from("/nonexistent/docker-compose"),
        PathTranslator::new(root.path(), root.path()),
    );
    let err = runner
        .run(
            &dir,
            &dir.join("compose.yaml"),
            &ComposeCommand::Logs {
                follow: false,
                tail: None,
                service: Some("--timestamps".into()),
            },
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("invalid service name"));
}
