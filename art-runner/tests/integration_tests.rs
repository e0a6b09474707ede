use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn art() -> Command {
    let mut cmd = Command::cargo_bin("art").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("ART_PASSWORD");
    cmd
}

/// Write a config pointing at `engine_url` with results going to `results`
fn write_config(dir: &Path, engine_url: &str, results: &Path) -> String {
    let config = json!({
        "connections": {
            "mock": {
                "name": "Mock engine",
                "url": engine_url,
                "username": "admin@internal",
                "password": "secret",
                "auth": "basic",
                "verify_tls": true
            }
        },
        "default_connection": "mock",
        "timeouts": {
            "sampling_interval": 1, "vm_state": 5, "host_state": 5, "storage_domain": 5,
            "disk": 5, "snapshot": 5, "migration": 5, "vm_pool": 5, "network": 5
        },
        "execution": {
            "max_workers": 2,
            "results_dir": results.to_str().unwrap(),
            "skip_teardown": false
        },
        "topology": {
            "datacenter": "art_dc",
            "cluster": "art_cluster",
            "compatibility_version": "4.7",
            "cpu_type": "Intel Nehalem Family",
            "hosts": [],
            "storage": [],
            "template": "Blank",
            "management_network": "ovirtmgmt",
            "build_setup": false
        },
        "logging": {"level": "info", "format": "json"}
    });
    let path = dir.join("art.json");
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path.to_str().unwrap().to_string()
}

fn single_report(results: &Path) -> Value {
    let reports: Vec<_> = std::fs::read_dir(results)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(reports.len(), 1, "expected one report in {}", results.display());
    serde_json::from_str(&std::fs::read_to_string(&reports[0]).unwrap()).unwrap()
}

async fn mock_engine(major: u32, minor: u32) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ovirt-engine/api/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "product_info": {
                "name": "oVirt Engine",
                "version": {"major": major, "minor": minor, "build": 0, "revision": 0}
            }
        })))
        .mount(&server)
        .await;
    server
}

#[test]
fn test_init_writes_sample_config() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("art.json");

    art()
        .arg("--init")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file"));

    let config: Value =
        serde_json::from_str(&std::fs::read_to_string(&config_path).unwrap()).unwrap();
    assert!(config["connections"]["local_engine"].is_object());
    assert_eq!(config["default_connection"], "local_engine");
    assert!(config["timeouts"]["vm_state"].is_u64());
    assert!(config["topology"]["hosts"].is_array());
    assert_eq!(config["logging"]["level"], "info");
}

#[test]
fn test_init_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("art.json");
    std::fs::write(&config_path, "{}").unwrap();

    art()
        .arg("--init")
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(std::fs::read_to_string(&config_path).unwrap(), "{}");
}

#[test]
fn test_invalid_arguments() {
    art()
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown flag"));
}

#[test]
fn test_list_prints_filtered_case_ids() {
    art()
        .args(["--list", "--filter", "^snapshots::"])
        .assert()
        .success()
        .stdout(predicate::str::contains("snapshots::create_snapshot"))
        .stdout(predicate::str::contains("snapshots::restore_snapshot"))
        .stdout(predicate::str::contains("migration::").not());
}

#[test]
fn test_list_everything() {
    art()
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::contains("vm_pools::create_pool"))
        .stdout(predicate::str::contains("networks::create_vm_network"))
        .stdout(predicate::str::contains("cpu_memory::hotplug_cpu"));
}

#[test]
fn test_unreadable_config() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("broken.json");
    std::fs::write(&config_path, "{ not json").unwrap();

    art()
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error loading configuration"));
}

#[test]
fn test_run_without_connections() {
    art()
        .assert()
        .failure()
        .stderr(predicate::str::contains("No connections configured"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_suite_skipped_on_old_engine() {
    let server = mock_engine(3, 6).await;
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("results");
    let config_path = write_config(
        dir.path(),
        &format!("{}/ovirt-engine/api", server.uri()),
        &results,
    );

    art()
        .arg(&config_path)
        .args(["--filter", "^networks::"])
        .assert()
        .success();

    let report = single_report(&results);
    assert_eq!(report["engine_version"], "3.6.0.0");
    assert_eq!(report["summary"]["total"], 4);
    assert_eq!(report["summary"]["skipped"], 4);
    assert!(report["results"][0]["message"]
        .as_str()
        .unwrap()
        .contains("needs engine 4.0"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unavailable_engine_fails_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "reason": "Service Unavailable",
            "detail": "engine is starting"
        })))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("results");
    let config_path = write_config(
        dir.path(),
        &format!("{}/ovirt-engine/api", server.uri()),
        &results,
    );

    art()
        .arg(&config_path)
        .args(["--filter", "^snapshots::"])
        .assert()
        .failure();

    let report = single_report(&results);
    assert_eq!(report["summary"]["total"], 0);
    assert!(report["errors"][0]
        .as_str()
        .unwrap()
        .starts_with("Engine version lookup"));
}

#[test]
fn test_filter_matching_nothing_passes() {
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("results");
    let config_path = write_config(dir.path(), "http://127.0.0.1:9/ovirt-engine/api", &results);

    art()
        .arg(&config_path)
        .args(["--filter", "^no_such_suite::"])
        .assert()
        .success();

    assert_eq!(single_report(&results)["summary"]["total"], 0);
}
