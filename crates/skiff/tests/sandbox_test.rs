//! Sandbox and volume lifecycle tests against the in-memory platform.

use skiff::test_utils::mock_client;
use skiff::{Error, VolumeSpec};

#[tokio::test]
async fn test_create_if_not_exists_is_idempotent() {
    let (api, client) = mock_client();

    let first = client
        .sandbox("ci-runner")
        .image("rust:1.84")
        .port(3000)
        .create()
        .await
        .expect("Failed to create sandbox");

    let second = client
        .sandbox("ci-runner")
        .image("rust:1.84")
        .port(3000)
        .create()
        .await
        .expect("Failed to get existing sandbox");

    assert_eq!(first.name(), second.name());
    assert_eq!(api.create_sandbox_calls(), 1);
}

#[tokio::test]
async fn test_existing_sandbox_wins_over_requested_spec() {
    let (_api, client) = mock_client();

    client
        .sandbox("web")
        .image("ubuntu:24.04")
        .port(3000)
        .create()
        .await
        .expect("Failed to create sandbox");

    // Same name, different spec: the existing sandbox is returned as-is.
    let again = client
        .sandbox("web")
        .image("alpine:3.20")
        .port(5000)
        .memory_mb(4096)
        .create()
        .await
        .expect("Failed to get existing sandbox");

    assert_eq!(again.ports(), &[3000]);
    assert_eq!(again.record().spec.image, "ubuntu:24.04");
}

#[tokio::test]
async fn test_reserved_ports_are_rejected() {
    let (api, client) = mock_client();

    for port in [80, 443, 8080] {
        match client.sandbox("bad").port(port).create().await {
            Err(Error::InvalidPort { port: p, .. }) => assert_eq!(p, port),
            Err(other) => panic!("expected InvalidPort for {port}, got {other:?}"),
            Ok(_) => panic!("expected InvalidPort for {port}, got a sandbox"),
        }
    }

    // Validation fires before any remote call.
    assert_eq!(api.create_sandbox_calls(), 0);
}

#[tokio::test]
async fn test_get_absent_sandbox_is_not_found() {
    let (_api, client) = mock_client();

    let err = client
        .sandboxes()
        .get("ghost")
        .await
        .expect_err("get of absent sandbox must fail");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (_api, client) = mock_client();

    client
        .sandbox("short-lived")
        .create()
        .await
        .expect("Failed to create sandbox");

    client
        .sandboxes()
        .delete("short-lived")
        .await
        .expect("Failed to delete sandbox");
    client
        .sandboxes()
        .delete("short-lived")
        .await
        .expect("delete of absent sandbox must succeed");
}

#[tokio::test(start_paused = true)]
async fn test_create_waits_out_provisioning() {
    let (api, client) = mock_client();
    api.set_ready_after("slow", 5);

    let sandbox = client
        .sandbox("slow")
        .create()
        .await
        .expect("Failed to create sandbox");

    assert_eq!(sandbox.name(), "slow");
}

#[tokio::test(start_paused = true)]
async fn test_provisioning_failure_surfaces() {
    let (api, client) = mock_client();
    api.fail_provisioning("broken");

    let err = client
        .sandbox("broken")
        .create()
        .await
        .expect_err("provisioning failure must surface");
    match err {
        Error::Provisioning { name, reason } => {
            assert_eq!(name, "broken");
            assert!(!reason.is_empty());
        }
        other => panic!("expected Provisioning, got {other:?}"),
    }
}

#[tokio::test]
async fn test_list_returns_all_sandboxes() {
    let (_api, client) = mock_client();

    client.sandbox("a").create().await.expect("create a");
    client.sandbox("b").create().await.expect("create b");

    let names: Vec<String> = client
        .sandboxes()
        .list()
        .await
        .expect("Failed to list sandboxes")
        .iter()
        .map(|s| s.name().to_string())
        .collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[tokio::test]
async fn test_handles_format_for_debugging() {
    let (_api, client) = mock_client();

    let sandbox = client
        .sandbox("dbg-sandbox")
        .port(3000)
        .create()
        .await
        .expect("Failed to create sandbox");
    assert!(format!("{sandbox:?}").contains("dbg-sandbox"));

    let volume = client
        .volumes()
        .create_if_not_exists(VolumeSpec::new("dbg-volume", 64))
        .await
        .expect("Failed to create volume");
    assert!(format!("{volume:?}").contains("dbg-volume"));
}

#[tokio::test]
async fn test_volume_lifecycle() {
    let (_api, client) = mock_client();

    let volume = client
        .volumes()
        .create_if_not_exists(VolumeSpec::new("data", 1024))
        .await
        .expect("Failed to create volume");
    assert_eq!(volume.name(), "data");
    assert_eq!(volume.size_mb(), 1024);

    // Creating again with a different size returns the existing volume.
    let again = client
        .volumes()
        .create_if_not_exists(VolumeSpec::new("data", 4096))
        .await
        .expect("Failed to get existing volume");
    assert_eq!(again.size_mb(), 1024);

    let err = client
        .volumes()
        .get("missing")
        .await
        .expect_err("get of absent volume must fail");
    assert!(err.is_not_found());

    client
        .volumes()
        .delete("data")
        .await
        .expect("Failed to delete volume");
    client
        .volumes()
        .delete("data")
        .await
        .expect("delete of absent volume must succeed");
}
