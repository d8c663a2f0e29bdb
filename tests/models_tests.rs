// Model serialization tests (JSON camelCase, lowercase enums)

use dockhand::compose::ComposeOutcome;
use dockhand::models::*;
use std::path::PathBuf;

#[test]
fn test_container_stats_serialization_camel_case() {
    let stats = ContainerStats {
        cpu_percent: 12.5,
        memory_usage: 1024,
        memory_limit: 4096,
        memory_percent: 25.0,
        network_rx: 10,
        network_tx: 20,
        block_read: 30,
        block_write: 40,
    };
    let json = serde_json::to_string(&stats).unwrap();
    assert!(json.contains("\"cpuPercent\""));
    assert!(json.contains("\"memoryPercent\""));
    assert!(json.contains("\"networkRx\""));
    let back: ContainerStats = serde_json::from_str(&json).unwrap();
    assert_eq!(back, stats);
}

#[test]
fn test_enums_serialize_lowercase() {
    assert_eq!(
        serde_json::to_string(&ContainerState::Restarting).unwrap(),
        "\"restarting\""
    );
    assert_eq!(serde_json::to_string(&Protocol::Udp).unwrap(), "\"udp\"");
    assert_eq!(
        serde_json::to_string(&UpdateStrategy::Compose).unwrap(),
        "\"compose\""
    );
    assert_eq!(
        serde_json::to_string(&ProjectStatus::Partial).unwrap(),
        "\"partial\""
    );
    assert_eq!(
        serde_json::to_string(&MountType::Bind).unwrap(),
        "\"bind\""
    );
}

#[test]
fn test_container_state_parsing() {
    assert_eq!(ContainerState::from_docker("Running"), ContainerState::Running);
    assert_eq!(ContainerState::from_docker("exited"), ContainerState::Exited);
    // anything unknown is dead
    assert_eq!(ContainerState::from_docker("zombie"), ContainerState::Dead);
    assert_eq!(ContainerState::from_docker(""), ContainerState::Dead);
    for state in [
        ContainerState::Created,
        ContainerState::Paused,
        ContainerState::Removing,
    ] {
        assert_eq!(ContainerState::from_docker(state.as_str()), state);
    }
}

#[test]
fn test_container_actions() {
    let running = ContainerActions::derive(ContainerState::Running, UpdateStrategy::Compose);
    assert!(!running.can_start && running.can_stop && running.can_restart && running.can_exec);
    assert!(running.can_update && running.can_view_logs);

    let exited = ContainerActions::derive(ContainerState::Exited, UpdateStrategy::Standalone);
    assert!(exited.can_start && !exited.can_stop && !exited.can_exec);
    assert!(!exited.can_update);

    let dead = ContainerActions::derive(ContainerState::Dead, UpdateStrategy::Compose);
    assert!(!dead.can_start && !dead.can_update);

    let json = serde_json::to_string(&running).unwrap();
    assert!(json.contains("\"canViewLogs\":true"));
}

#[test]
fn test_mount_type_field_name() {
    let mount = Mount {
        type_: MountType::Volume,
        name: Some("pgdata".into()),
        source: "/var/lib/docker/volumes/pgdata/_data".into(),
        destination: "/var/lib/postgresql/data".into(),
        mode: "z".into(),
        rw: true,
    };
    let value = serde_json::to_value(&mount).unwrap();
    assert_eq!(value["type"], "volume");
    assert!(value.get("type_").is_none());
}

#[test]
fn test_project_serialization() {
    let project = Project {
        name: "shop".into(),
        path: PathBuf::from("/opt/stacks/shop"),
        manifest_path: PathBuf::from("/opt/stacks/shop/compose.yaml"),
        status: ProjectStatus::Running,
        services: vec![ProjectService {
            name: "web".into(),
            image: Some("nginx:1.27".into()),
            live_image: Some("nginx:1.27".into()),
            container_id: Some("abc".into()),
            container_name: Some("shop-web-1".into()),
            status: ServiceStatus::Running,
            has_build: false,
        }],
    };
    let value = serde_json::to_value(&project).unwrap();
    assert_eq!(value["manifestPath"], "/opt/stacks/shop/compose.yaml");
    assert_eq!(value["services"][0]["liveImage"], "nginx:1.27");
    assert_eq!(value["services"][0]["hasBuild"], false);
    let back: Project = serde_json::from_value(value).unwrap();
    assert_eq!(back, project);
}

#[test]
fn test_prune_report_merge() {
    let mut report = PruneReport {
        deleted: vec!["a".into()],
        space_reclaimed: 100,
    };
    report.merge(PruneReport {
        deleted: vec!["b".into(), "c".into()],
        space_reclaimed: 50,
    });
    assert_eq!(report.deleted, vec!["a", "b", "c"]);
    assert_eq!(report.space_reclaimed, 150);
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"spaceReclaimed\":150"));
}

#[test]
fn test_compose_outcome_serialization() {
    let outcome = ComposeOutcome {
        exit_code: 1,
        success: false,
        output: "error".into(),
    };
    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["exitCode"], 1);
    assert_eq!(value["success"], false);
}
