//! ---
//! gw_section: "01-core-functionality"
//! gw_subsection: "integration-tests"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Runtime integration tests for the monitoring loop."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::time::Duration;

use gridwatch_common::config::{AppConfig, GeoLocation, PoleSpec};
use gridwatch_common::fault::FaultKind;
use gridwatch_core::pole::PoleStatus;
use gridwatch_core::runtime::MonitorRuntime;
use gridwatch_sim::FaultInjector;

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
    config.simulation.random_seed = 11;
    config
}

async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn runtime_synchronizes_telemetry_into_the_registry() {
    let runtime = MonitorRuntime::new(fast_config(), None).unwrap();
    let handle = runtime.start().await.unwrap();
    let state = handle.state();

    let updated = wait_for(|| {
        let pole = state.registry.get("pole-01").unwrap();
        pole.voltage_v != pole.nominal_voltage_v
    })
    .await;
    assert!(updated, "expected telemetry to update pole readings");

    let pole = state.registry.get("pole-01").unwrap();
    assert_eq!(pole.status, PoleStatus::Healthy);
    assert!(state.risk.score("pole-01").is_some());

    handle.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn injected_fault_raises_one_alert_until_fixed() {
    let runtime = MonitorRuntime::new(fast_config(), None).unwrap();
    let handle = runtime.start().await.unwrap();
    let state = handle.state();

    handle.injector().inject_fault("pole-01", FaultKind::LineDown);

    let faulted = wait_for(|| {
        state
            .registry
            .get("pole-01")
            .map(|pole| pole.status == PoleStatus::Faulty)
            .unwrap_or(false)
    })
    .await;
    assert!(faulted, "expected the injected fault to mark the pole faulty");

    // A persisting fault must not fan out into duplicate alerts.
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(state.alerts.active_count(), 1);
    let alert = &state.alerts.snapshot()[0];
    assert_eq!(alert.pole_id, "pole-01");
    assert_eq!(alert.created_by, "monitor");

    state.processor.fix("pole-01", "ops").unwrap();
    assert_eq!(state.alerts.active_count(), 0);

    let recovered = wait_for(|| {
        state
            .registry
            .get("pole-01")
            .map(|pole| pole.status == PoleStatus::Healthy)
            .unwrap_or(false)
    })
    .await;
    assert!(recovered, "expected the pole to stay healthy after the fix");

    handle.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn isolated_pole_stays_dark_while_telemetry_flows() {
    let runtime = MonitorRuntime::new(fast_config(), None).unwrap();
    let handle = runtime.start().await.unwrap();
    let state = handle.state();

    state.processor.isolate("pole-02", "ops").unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;

    let pole = state.registry.get("pole-02").unwrap();
    assert_eq!(pole.status, PoleStatus::Isolated);
    assert_eq!(pole.voltage_v, 0.0);
    assert_eq!(pole.current_a, 0.0);

    // The sibling pole keeps receiving live readings.
    let sibling = state.registry.get("pole-01").unwrap();
    assert_ne!(sibling.voltage_v, 0.0);

    handle.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn production_mode_refuses_to_start() {
    let mut config = fast_config();
    config.mode = gridwatch_common::config::Mode::Production;
    let err = MonitorRuntime::new(config, None).unwrap_err();
    assert!(err.to_string().contains("simulation"));
}
