//! Mock engine for integration tests
//!
//! Serves the engine's JSON conventions on a wiremock server: collections
//! wrapped in their element name, `search` queries and action responses.

#![allow(dead_code)]

use art_api::{Engine, RestClient};
use art_shared::{AuthMode, EngineConnection, TimeoutConfig};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API: &str = "/ovirt-engine/api";

/// Full request path of an API-relative path
pub fn api(relative: &str) -> String {
    format!("{API}/{relative}")
}

/// Two seconds for every wait
pub fn fast_timeouts() -> TimeoutConfig {
    TimeoutConfig {
        sampling_interval: 1,
        vm_state: 2,
        host_state: 2,
        storage_domain: 2,
        disk: 2,
        snapshot: 2,
        migration: 2,
        vm_pool: 2,
        network: 2,
    }
}

pub fn engine_at(server: &MockServer, timeouts: TimeoutConfig) -> Engine {
    let connection = EngineConnection {
        name: "mock".to_string(),
        url: format!("{}{API}", server.uri()),
        username: "admin@internal".to_string(),
        password: Some("secret".to_string()),
        auth: AuthMode::Basic,
        verify_tls: true,
    };
    let client = RestClient::with_password(&connection, "secret".to_string()).unwrap();
    Engine::new(client, timeouts, 4).with_sampling_interval(Duration::from_millis(10))
}

pub fn vm(id: &str, name: &str, status: &str) -> Value {
    json!({"id": id, "name": name, "status": status, "cluster": {"id": "c1"}})
}

/// Answer `GET <collection>?search=<query>` with `{element: [items]}`
pub async fn mount_search(
    server: &MockServer,
    collection: &str,
    element: &str,
    query: &str,
    items: Vec<Value>,
) {
    search_mock(collection, element, query, items)
        .mount(server)
        .await;
}

/// Like [`mount_search`], for the next `times` requests only
pub async fn mount_search_times(
    server: &MockServer,
    collection: &str,
    element: &str,
    query: &str,
    items: Vec<Value>,
    times: u64,
) {
    search_mock(collection, element, query, items)
        .up_to_n_times(times)
        .mount(server)
        .await;
}

fn search_mock(collection: &str, element: &str, query: &str, items: Vec<Value>) -> Mock {
    Mock::given(method("GET"))
        .and(path(api(collection)))
        .and(query_param("search", query))
        .respond_with(ResponseTemplate::new(200).set_body_json(collection_body(element, items)))
}

/// `{element: [items]}`, the engine's collection wrapper
pub fn collection_body(element: &str, items: Vec<Value>) -> Value {
    let mut body = serde_json::Map::new();
    body.insert(element.to_string(), Value::Array(items));
    Value::Object(body)
}

pub async fn mount_vm(server: &MockServer, vm_json: Value) {
    let name = vm_json["name"].as_str().unwrap_or_default().to_string();
    mount_search(server, "vms", "vm", &format!("name={name}"), vec![vm_json]).await;
}

pub async fn mount_vm_times(server: &MockServer, vm_json: Value, times: u64) {
    let name = vm_json["name"].as_str().unwrap_or_default().to_string();
    mount_search_times(server, "vms", "vm", &format!("name={name}"), vec![vm_json], times).await;
}

/// Expect exactly `calls` synchronous `action` requests on `element_path`
pub async fn expect_action(server: &MockServer, element_path: &str, action: &str, calls: u64) {
    Mock::given(method("POST"))
        .and(path(api(&format!("{element_path}/{action}"))))
        .and(body_partial_json(json!({"async": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "complete"})))
        .expect(calls)
        .mount(server)
        .await;
}

/// Engine fault body as returned on non-2xx responses
pub fn fault(reason: &str, detail: &str) -> Value {
    json!({"reason": reason, "detail": detail})
}

pub fn host(id: &str, name: &str, status: &str) -> Value {
    json!({"id": id, "name": name, "status": status})
}

pub async fn mount_host(server: &MockServer, host_json: Value) {
    let name = host_json["name"].as_str().unwrap_or_default().to_string();
    mount_search(server, "hosts", "host", &format!("name={name}"), vec![host_json]).await;
}

pub async fn mount_host_times(server: &MockServer, host_json: Value, times: u64) {
    let name = host_json["name"].as_str().unwrap_or_default().to_string();
    mount_search_times(server, "hosts", "host", &format!("name={name}"), vec![host_json], times)
        .await;
}

/// Answer `GET <relative>` with `{element: [items]}`
pub async fn mount_list(server: &MockServer, relative: &str, element: &str, items: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path(api(relative)))
        .respond_with(ResponseTemplate::new(200).set_body_json(collection_body(element, items)))
        .mount(server)
        .await;
}

/// Like [`mount_list`], for the next `times` requests only
pub async fn mount_list_times(
    server: &MockServer,
    relative: &str,
    element: &str,
    items: Vec<Value>,
    times: u64,
) {
    Mock::given(method("GET"))
        .and(path(api(relative)))
        .respond_with(ResponseTemplate::new(200).set_body_json(collection_body(element, items)))
        .up_to_n_times(times)
        .mount(server)
        .await;
}

/// Answer `POST <relative>` with `body`, expecting exactly `calls` requests
pub async fn expect_create(server: &MockServer, relative: &str, body: Value, calls: u64) {
    Mock::given(method("POST"))
        .and(path(api(relative)))
        .respond_with(ResponseTemplate::new(201).set_body_json(body))
        .expect(calls)
        .mount(server)
        .await;
}

/// Expect exactly `calls` `DELETE <relative>` requests
pub async fn expect_delete(server: &MockServer, relative: &str, calls: u64) {
    Mock::given(method("DELETE"))
        .and(path(api(relative)))
        .respond_with(ResponseTemplate::new(200))
        .expect(calls)
        .mount(server)
        .await;
}

/// `METHOD path` of every state-changing request, in arrival order
pub async fn changes_received(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.to_string() != "GET")
        .map(|r| {
            let relative = r.url.path().trim_start_matches(API).trim_start_matches('/');
            format!("{} {}", r.method, relative)
        })
        .collect()
}
