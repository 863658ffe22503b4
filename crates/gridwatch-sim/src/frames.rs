//! ---
//! gw_section: "11-simulation-test-harness"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Simulation runtime helpers and scenario engines."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use gridwatch_common::fault::FaultKind;
use serde::{Deserialize, Serialize};

/// Synthetic or replayed telemetry frame produced for a pole on one tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoleTelemetryFrame {
    pub pole_id: String,
    pub timestamp: DateTime<Utc>,
    pub voltage_v: f64,
    pub current_a: f64,
    pub synthetic: bool,
    /// Fault carried with the frame, either injected or spontaneous.
    #[serde(default)]
    pub fault: Option<FaultKind>,
    #[serde(default)]
    pub scenario_label: Option<String>,
}

impl PoleTelemetryFrame {
    pub fn synthetic(pole_id: &str, voltage_v: f64, current_a: f64) -> Self {
        Self {
            pole_id: pole_id.to_owned(),
            timestamp: Utc::now(),
            voltage_v,
            current_a,
            synthetic: true,
            fault: None,
            scenario_label: None,
        }
    }

    pub fn with_fault(mut self, fault: FaultKind) -> Self {
        self.fault = Some(fault);
        self
    }
}
