mod common;

use art_api::high_level::vms as scenarios;
use art_api::high_level::vms::GB;
use art_api::high_level::{datacenters, networks, snapshots, vmpools};
use art_shared::{
    ArtError, CpuTopology, HostConfig, StorageConfig, StorageType, TopologyConfig, VmStatus,
};
use common::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn on_host(mut vm_json: serde_json::Value, host: &str) -> serde_json::Value {
    vm_json["host"] = json!({"name": host});
    vm_json
}

#[tokio::test]
async fn test_start_vms_starts_each_vm_once() {
    let server = MockServer::start().await;
    let names: Vec<String> = (0..3).map(|i| format!("vm_{i}")).collect();
    for (i, name) in names.iter().enumerate() {
        let id = format!("v{i}");
        mount_vm(&server, vm(&id, name, "up")).await;
        expect_action(&server, &format!("vms/{id}"), "start", 1).await;
    }

    let engine = engine_at(&server, fast_timeouts());
    tokio_test::assert_ok!(scenarios::start_vms(&engine, &names, VmStatus::Up).await);
}

#[tokio::test]
async fn test_stop_vms_skips_vms_already_down() {
    let server = MockServer::start().await;
    mount_vm(&server, vm("v0", "vm_0", "down")).await;
    expect_action(&server, "vms/v0", "stop", 0).await;
    mount_vm_times(&server, vm("v1", "vm_1", "up"), 2).await;
    mount_vm(&server, vm("v1", "vm_1", "down")).await;
    expect_action(&server, "vms/v1", "stop", 1).await;

    let engine = engine_at(&server, fast_timeouts());
    let names = vec!["vm_0".to_string(), "vm_1".to_string()];
    tokio_test::assert_ok!(scenarios::stop_vms(&engine, &names).await);
}

#[tokio::test]
async fn test_migrate_vm_and_verify() {
    let server = MockServer::start().await;
    // Host lookup before migrating, then the migrate action's own lookup
    mount_vm_times(&server, on_host(vm("v1", "vm_0", "up"), "host_1"), 2).await;
    mount_vm(&server, on_host(vm("v1", "vm_0", "up"), "host_2")).await;
    Mock::given(method("POST"))
        .and(path(api("vms/v1/migrate")))
        .and(body_partial_json(json!({"async": false, "host": {"name": "host_2"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "complete"})))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_at(&server, fast_timeouts());
    let target = scenarios::migrate_vm_and_verify(&engine, "vm_0", Some("host_2"))
        .await
        .unwrap();
    assert_eq!(target, "host_2");
}

#[tokio::test]
async fn test_migration_wait_outlasts_samples_on_the_source_host() {
    let server = MockServer::start().await;
    // Host lookup, the migrate action's lookup and the first sample all
    // still see the VM up on its source host
    mount_vm_times(&server, on_host(vm("v1", "vm_0", "up"), "host_1"), 3).await;
    mount_vm_times(&server, on_host(vm("v1", "vm_0", "migrating"), "host_1"), 1).await;
    mount_vm(&server, on_host(vm("v1", "vm_0", "up"), "host_2")).await;
    expect_action(&server, "vms/v1", "migrate", 1).await;

    let engine = engine_at(&server, fast_timeouts());
    let target = scenarios::migrate_vm_and_verify(&engine, "vm_0", Some("host_2"))
        .await
        .unwrap();
    assert_eq!(target, "host_2");
}

#[tokio::test]
async fn test_migration_that_stays_put_fails_assertion() {
    let server = MockServer::start().await;
    mount_vm(&server, on_host(vm("v1", "vm_0", "up"), "host_1")).await;
    expect_action(&server, "vms/v1", "migrate", 1).await;

    let engine = engine_at(&server, fast_timeouts());
    let err = scenarios::migrate_vm_and_verify(&engine, "vm_0", Some("host_1"))
        .await
        .unwrap_err();
    assert!(err.is_assertion(), "unexpected error: {err}");
}

#[tokio::test]
async fn test_check_vm_memory() {
    let server = MockServer::start().await;
    let mut configured = vm("v1", "vm_0", "up");
    configured["memory"] = json!("1073741824");
    mount_vm(&server, configured).await;

    let engine = engine_at(&server, fast_timeouts());
    tokio_test::assert_ok!(scenarios::check_vm_memory(&engine, "vm_0", GB).await);

    let err = scenarios::check_vm_memory(&engine, "vm_0", 2 * GB)
        .await
        .unwrap_err();
    assert!(err.is_assertion());
    assert!(err.to_string().contains("expected 2147483648"));
}

#[tokio::test]
async fn test_check_vm_cpus() {
    let server = MockServer::start().await;
    let mut configured = vm("v1", "vm_0", "up");
    configured["cpu"] = json!({"topology": {"sockets": "2", "cores": "2", "threads": "1"}});
    mount_vm(&server, configured).await;

    let engine = engine_at(&server, fast_timeouts());
    let expected = CpuTopology {
        sockets: 2,
        cores: 2,
        threads: 1,
    };
    tokio_test::assert_ok!(scenarios::check_vm_cpus(&engine, "vm_0", &expected).await);

    let single = CpuTopology {
        sockets: 1,
        ..expected
    };
    assert!(scenarios::check_vm_cpus(&engine, "vm_0", &single)
        .await
        .unwrap_err()
        .is_assertion());
}

fn topology() -> TopologyConfig {
    TopologyConfig {
        hosts: vec![HostConfig {
            name: "host_1".to_string(),
            address: "host1.example.com".to_string(),
            root_password: Some("hunter2".to_string()),
            test_nic: None,
        }],
        storage: vec![StorageConfig {
            name: "nfs_data".to_string(),
            storage_type: StorageType::Nfs,
            address: "nfs.example.com".to_string(),
            path: Some("/exports/data".to_string()),
            target: None,
            lun: None,
        }],
        ..Default::default()
    }
}

fn domain(status: &str) -> serde_json::Value {
    json!({"id": "sd1", "name": "nfs_data", "status": status, "master": true})
}

#[tokio::test]
async fn test_build_setup_creates_then_attaches_storage() {
    let server = MockServer::start().await;
    expect_create(&server, "datacenters", json!({"id": "dc1", "name": "art_dc"}), 1).await;
    expect_create(&server, "clusters", json!({"id": "c1", "name": "art_cluster"}), 1).await;
    expect_create(&server, "hosts", json!({"id": "h1", "name": "host_1"}), 1).await;
    expect_create(&server, "storagedomains", json!({"id": "sd1", "name": "nfs_data"}), 1).await;
    expect_create(&server, "datacenters/dc1/storagedomains", json!({"id": "sd1"}), 1).await;

    mount_host(&server, host("h1", "host_1", "up")).await;
    mount_search(
        &server,
        "hosts",
        "host",
        "datacenter=art_dc",
        vec![json!({"id": "h1", "name": "host_1", "status": "up", "spm": {"status": "spm"}})],
    )
    .await;
    mount_search(
        &server,
        "storagedomains",
        "storage_domain",
        "name=nfs_data",
        vec![json!({"id": "sd1", "name": "nfs_data"})],
    )
    .await;
    mount_search(
        &server,
        "datacenters",
        "data_center",
        "name=art_dc",
        vec![json!({"id": "dc1", "name": "art_dc", "status": "up"})],
    )
    .await;
    mount_list(&server, "datacenters/dc1/storagedomains", "storage_domain", vec![domain("active")])
        .await;

    let engine = engine_at(&server, fast_timeouts());
    datacenters::build_setup(&engine, &topology()).await.unwrap();

    assert_eq!(
        changes_received(&server).await,
        vec![
            "POST datacenters",
            "POST clusters",
            "POST hosts",
            "POST storagedomains",
            "POST datacenters/dc1/storagedomains",
        ]
    );
}

#[tokio::test]
async fn test_build_setup_without_hosts_is_a_config_error() {
    let server = MockServer::start().await;
    let engine = engine_at(&server, fast_timeouts());
    let topology = TopologyConfig {
        hosts: Vec::new(),
        ..topology()
    };

    let err = datacenters::build_setup(&engine, &topology).await.unwrap_err();
    assert!(matches!(err, ArtError::Config(_)), "unexpected error: {err}");
    assert!(changes_received(&server).await.is_empty());
}

#[tokio::test]
async fn test_clean_datacenter_removes_in_dependency_order() {
    let server = MockServer::start().await;
    mount_search(&server, "vms", "vm", "cluster=art_cluster", Vec::new()).await;
    mount_search(
        &server,
        "datacenters",
        "data_center",
        "name=art_dc",
        vec![json!({"id": "dc1", "name": "art_dc", "status": "up"})],
    )
    .await;
    // Listing, master lookup and the deactivate lookup see it active
    mount_list_times(
        &server,
        "datacenters/dc1/storagedomains",
        "storage_domain",
        vec![domain("active")],
        3,
    )
    .await;
    mount_list(
        &server,
        "datacenters/dc1/storagedomains",
        "storage_domain",
        vec![domain("maintenance")],
    )
    .await;
    expect_action(&server, "datacenters/dc1/storagedomains/sd1", "deactivate", 1).await;
    expect_delete(&server, "datacenters/dc1", 1).await;

    mount_search(
        &server,
        "storagedomains",
        "storage_domain",
        "name=nfs_data",
        vec![json!({"id": "sd1", "name": "nfs_data"})],
    )
    .await;
    Mock::given(method("DELETE"))
        .and(path(api("storagedomains/sd1")))
        .and(query_param("host", "host_1"))
        .and(query_param("format", "true"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    mount_host_times(&server, host("h1", "host_1", "up"), 2).await;
    mount_host(&server, host("h1", "host_1", "maintenance")).await;
    expect_action(&server, "hosts/h1", "deactivate", 1).await;
    expect_delete(&server, "hosts/h1", 1).await;

    mount_search(
        &server,
        "clusters",
        "cluster",
        "name=art_cluster",
        vec![json!({"id": "c1", "name": "art_cluster"})],
    )
    .await;
    expect_delete(&server, "clusters/c1", 1).await;

    let engine = engine_at(&server, fast_timeouts());
    datacenters::clean_datacenter(&engine, &topology()).await.unwrap();

    assert_eq!(
        changes_received(&server).await,
        vec![
            "POST datacenters/dc1/storagedomains/sd1/deactivate",
            "DELETE datacenters/dc1",
            "DELETE storagedomains/sd1",
            "POST hosts/h1/deactivate",
            "DELETE hosts/h1",
            "DELETE clusters/c1",
        ]
    );
}

#[tokio::test]
async fn test_clean_missing_datacenter_fails_before_removing_anything() {
    let server = MockServer::start().await;
    mount_search(&server, "vms", "vm", "cluster=art_cluster", Vec::new()).await;
    mount_search(&server, "datacenters", "data_center", "name=art_dc", Vec::new()).await;

    let engine = engine_at(&server, fast_timeouts());
    let err = datacenters::clean_datacenter(&engine, &topology())
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {err}");
    assert!(changes_received(&server).await.is_empty());
}

#[tokio::test]
async fn test_preview_and_commit_snapshot() {
    let server = MockServer::start().await;
    mount_vm(&server, vm("v1", "vm_0", "down")).await;
    let snapshot = |status: &str| {
        json!({"id": "s1", "description": "before_upgrade", "snapshot_status": status})
    };
    mount_list_times(&server, "vms/v1/snapshots", "snapshot", vec![snapshot("ok")], 1).await;
    mount_list_times(&server, "vms/v1/snapshots", "snapshot", vec![snapshot("in_preview")], 1).await;
    mount_list(&server, "vms/v1/snapshots", "snapshot", vec![snapshot("ok")]).await;
    Mock::given(method("POST"))
        .and(path(api("vms/v1/previewsnapshot")))
        .and(body_partial_json(json!({"async": false, "snapshot": {"id": "s1"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "complete"})))
        .expect(1)
        .mount(&server)
        .await;
    expect_action(&server, "vms/v1", "commitsnapshot", 1).await;
    expect_action(&server, "vms/v1", "stop", 0).await;

    let engine = engine_at(&server, fast_timeouts());
    tokio_test::assert_ok!(snapshots::preview_and_commit(&engine, "vm_0", "before_upgrade").await);
}

#[tokio::test]
async fn test_stateless_snapshot_dropped_after_stop() {
    let server = MockServer::start().await;
    // Status check, snapshot listing and the stop action's lookup
    mount_vm_times(&server, vm("v1", "pool_0-1", "up"), 3).await;
    mount_vm(&server, vm("v1", "pool_0-1", "down")).await;
    expect_action(&server, "vms/v1", "stop", 1).await;
    mount_list_times(
        &server,
        "vms/v1/snapshots",
        "snapshot",
        vec![
            json!({"id": "s0", "description": "Active VM", "snapshot_type": "active"}),
            json!({"id": "s1", "description": "stateless snapshot", "snapshot_type": "stateless"}),
        ],
        1,
    )
    .await;
    mount_list(
        &server,
        "vms/v1/snapshots",
        "snapshot",
        vec![json!({"id": "s0", "description": "Active VM", "snapshot_type": "active"})],
    )
    .await;

    let engine = engine_at(&server, fast_timeouts());
    tokio_test::assert_ok!(vmpools::check_stateless_snapshot(&engine, "pool_0-1").await);
}

#[tokio::test]
async fn test_remove_networks_detaches_by_network_id() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        "networks",
        "network",
        "name=art_net_a and datacenter=art_dc",
        vec![json!({"id": "n1", "name": "art_net_a"})],
    )
    .await;
    mount_host(&server, host("h1", "host_1", "up")).await;
    let attachment = json!({"id": "a1", "network": {"id": "n1"}, "host_nic": {"id": "nic1"}});
    // The removal's own listing and the detach lookup still see it attached
    mount_list_times(
        &server,
        "hosts/h1/networkattachments",
        "network_attachment",
        vec![attachment],
        2,
    )
    .await;
    mount_list(&server, "hosts/h1/networkattachments", "network_attachment", Vec::new()).await;
    Mock::given(method("POST"))
        .and(path(api("hosts/h1/setupnetworks")))
        .and(body_partial_json(json!({
            "removed_network_attachments": {"network_attachment": [{"id": "a1"}]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "complete"})))
        .expect(1)
        .mount(&server)
        .await;
    expect_delete(&server, "networks/n1", 1).await;

    let engine = engine_at(&server, fast_timeouts());
    networks::remove_networks(
        &engine,
        "art_dc",
        &["art_net_a".to_string()],
        &["host_1".to_string()],
    )
    .await
    .unwrap();
    assert_eq!(
        changes_received(&server).await,
        vec!["POST hosts/h1/setupnetworks", "DELETE networks/n1"]
    );
}
