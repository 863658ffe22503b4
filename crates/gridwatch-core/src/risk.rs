//! ---
//! gw_section: "02-domain-state-model"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Predictive risk scoring derived from telemetry deviation."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::collections::HashMap;

use parking_lot::Mutex;

use crate::pole::Pole;
use gridwatch_common::fault::Severity;

/// Exponentially weighted risk score per pole in `[0, 1]`.
///
/// The instantaneous signal comes from the open fault severity when one
/// exists, otherwise from voltage deviation and loading; the EWMA keeps a
/// short memory so a pole that keeps brushing its limits scores higher than
/// one with a single excursion.
#[derive(Debug)]
pub struct RiskModel {
    scores: Mutex<HashMap<String, f64>>,
    alpha: f64,
}

impl RiskModel {
    pub fn new() -> Self {
        Self::with_alpha(0.2)
    }

    pub fn with_alpha(alpha: f64) -> Self {
        Self {
            scores: Mutex::new(HashMap::new()),
            alpha: alpha.clamp(0.01, 1.0),
        }
    }

    /// Fold the pole's current state into its score and return the new value.
    pub fn observe(&self, pole: &Pole) -> f64 {
        let instantaneous = instantaneous_risk(pole);
        let mut scores = self.scores.lock();
        let score = scores.entry(pole.id.clone()).or_insert(instantaneous);
        *score = *score * (1.0 - self.alpha) + instantaneous * self.alpha;
        *score
    }

    pub fn score(&self, pole_id: &str) -> Option<f64> {
        self.scores.lock().get(pole_id).copied()
    }

    pub fn snapshot(&self) -> HashMap<String, f64> {
        self.scores.lock().clone()
    }

    pub fn reset(&self) {
        self.scores.lock().clear();
    }
}

impl Default for RiskModel {
    fn default() -> Self {
        Self::new()
    }
}

fn instantaneous_risk(pole: &Pole) -> f64 {
    if !pole.status.is_energized() {
        // A de-energized pole poses no electrical risk until restored.
        return 0.0;
    }
    if let Some(severity) = pole.severity {
        return match severity {
            Severity::Low => 0.4,
            Severity::Medium => 0.6,
            Severity::High => 0.8,
            Severity::Critical => 1.0,
        };
    }
    let deviation = ((pole.voltage_v - pole.nominal_voltage_v) / pole.nominal_voltage_v).abs();
    let loading = (pole.current_a / pole.nominal_current_a).max(0.0);
    let voltage_part = (deviation / 0.1).min(1.0) * 0.5;
    let load_part = ((loading - 1.0).max(0.0) / 0.5).min(1.0) * 0.5;
    voltage_part + load_part
}
