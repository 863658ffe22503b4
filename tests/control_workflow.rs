//! ---
//! gw_section: "15-testing-qa-runbook"
//! gw_subsection: "integration-tests"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "End-to-end tests driving the runtime through the REST API."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use gridwatch_api::{spawn_api_server, ApiServer, ApiState};
use gridwatch_common::config::{AppConfig, GeoLocation, PoleSpec};
use gridwatch_common::version::VersionInfo;
use gridwatch_core::runtime::{MonitorRuntime, RuntimeHandle};
use serde_json::{json, Value};

fn fast_config() -> AppConfig {
    let mut config = AppConfig::default();
    for id in ["pole-01", "pole-02"] {
        config.poles.insert(
            id.into(),
            PoleSpec {
                location: GeoLocation::default(),
                ..PoleSpec::default()
            },
        );
    }
    config.monitor.tick_interval = Duration::from_millis(10);
    config.simulation.fault_probability = 0.0;
    config.simulation.random_seed = 5;
    config
}

async fn start_stack() -> (RuntimeHandle, ApiServer, String) {
    let config = fast_config();
    let mode = config.mode;
    let runtime = MonitorRuntime::new(config, None).unwrap();
    let handle = runtime.start().await.unwrap();
    let state = Arc::new(ApiState::new(
        handle.state(),
        mode,
        VersionInfo::current(),
        Some(handle.injector()),
    ));
    let server = spawn_api_server(state, "127.0.0.1:0".parse().unwrap()).unwrap();
    let base = format!("http://{}", server.addr());
    (handle, server, base)
}

async fn get_json(client: &reqwest::Client, url: &str) -> Value {
    client
        .get(url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn control_actions_round_trip_over_http() {
    let (handle, server, base) = start_stack().await;
    let client = reqwest::Client::new();

    let status = get_json(&client, &format!("{base}/api/status")).await;
    assert_eq!(status["pole_count"], json!(2));
    assert_eq!(status["mode"], json!("simulation"));

    // Isolate and verify the invariant: zeroed readings, operator stamp.
    let isolated: Value = client
        .post(format!("{base}/api/poles/pole-01/isolate"))
        .json(&json!({ "operator": "ops-anna" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(isolated["status"], json!("isolated"));
    assert_eq!(isolated["voltage_v"], json!(0.0));
    assert_eq!(isolated["current_a"], json!(0.0));
    assert_eq!(isolated["isolated_by"], json!("ops-anna"));

    // Telemetry keeps flowing and must not re-energize the pole.
    tokio::time::sleep(Duration::from_millis(60)).await;
    let pole = get_json(&client, &format!("{base}/api/poles/pole-01")).await;
    assert_eq!(pole["status"], json!("isolated"));
    assert_eq!(pole["voltage_v"], json!(0.0));

    // Manual issue on the sibling pole raises exactly one alert.
    let reported: Value = client
        .post(format!("{base}/api/poles/pole-02/issues"))
        .json(&json!({
            "fault": "insulator_damage",
            "message": "cracked insulator spotted from the road",
            "reported_by": "field-crew"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reported["status"], json!("faulty"));
    let alerts = get_json(&client, &format!("{base}/api/alerts")).await;
    assert_eq!(alerts.as_array().unwrap().len(), 1);
    assert_eq!(alerts[0]["created_by"], json!("field-crew"));

    // Fix clears the fault and its alerts.
    let fixed: Value = client
        .post(format!("{base}/api/poles/pole-02/fix"))
        .json(&json!({ "operator": "ops" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fixed["status"], json!("healthy"));
    let alerts = get_json(&client, &format!("{base}/api/alerts")).await;
    assert!(alerts.as_array().unwrap().is_empty());

    // Restore brings the isolated pole back to nominal readings.
    let restored: Value = client
        .post(format!("{base}/api/poles/pole-01/restore"))
        .json(&json!({ "operator": "ops" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(restored["status"], json!("healthy"));
    assert_eq!(restored["isolated_by"], Value::Null);

    // The whole workflow left a notification trail.
    let notifications = get_json(&client, &format!("{base}/api/notifications")).await;
    assert!(notifications.as_array().unwrap().len() >= 4);

    server.shutdown().await.unwrap();
    handle.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn injected_fault_flows_from_engine_to_alert_list() {
    let (handle, server, base) = start_stack().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/poles/pole-02/inject"))
        .json(&json!({ "fault": "line_down" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);

    let mut faulted = false;
    for _ in 0..200 {
        let pole = get_json(&client, &format!("{base}/api/poles/pole-02")).await;
        if pole["status"] == json!("faulty") {
            faulted = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(faulted, "expected injected fault to surface on the pole");

    let alerts = get_json(&client, &format!("{base}/api/alerts")).await;
    assert_eq!(alerts.as_array().unwrap().len(), 1);
    let alert_id = alerts[0]["id"].as_str().unwrap().to_owned();

    // Dismiss the alert, then a second dismissal must 404.
    let dismissed = client
        .delete(format!("{base}/api/alerts/{alert_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(dismissed.status(), reqwest::StatusCode::OK);
    let again = client
        .delete(format!("{base}/api/alerts/{alert_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), reqwest::StatusCode::NOT_FOUND);

    // Reset returns the registry to its baseline.
    client
        .post(format!("{base}/api/reset"))
        .send()
        .await
        .unwrap();
    let status = get_json(&client, &format!("{base}/api/status")).await;
    assert_eq!(status["status_counts"]["healthy"], json!(2));
    assert_eq!(status["active_alerts"], json!(0));

    server.shutdown().await.unwrap();
    handle.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_pole_maps_to_http_404() {
    let (handle, server, base) = start_stack().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/poles/pole-99/isolate"))
        .json(&json!({ "operator": "ops" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("pole-99"));

    let response = client
        .get(format!("{base}/api/poles/pole-99"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    server.shutdown().await.unwrap();
    handle.shutdown().await.unwrap();
}
