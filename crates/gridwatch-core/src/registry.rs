//! ---
//! gw_section: "02-domain-state-model"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Authoritative pole registry and telemetry synchronization."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use gridwatch_common::config::{AppConfig, MonitorConfig, PoleSpec};
use gridwatch_common::fault::{FaultKind, Severity};
use gridwatch_sim::PoleTelemetryFrame;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::pole::{Pole, PoleStatus};

/// Emitted on the healthy-to-faulty edge of a pole; the runtime turns this
/// into exactly one alert.
#[derive(Debug, Clone)]
pub struct FaultObservation {
    pub pole_id: String,
    pub fault: FaultKind,
    pub severity: Severity,
    pub message: String,
}

/// Authoritative set of monitored poles.
///
/// The runtime loop is the only telemetry writer; operator mutations go
/// through the control processor. Readers take cheap snapshots.
#[derive(Debug)]
pub struct PoleRegistry {
    poles: RwLock<IndexMap<String, Pole>>,
    baseline: IndexMap<String, PoleSpec>,
    monitor: MonitorConfig,
}

impl PoleRegistry {
    pub fn from_config(config: &AppConfig) -> Self {
        let poles: IndexMap<String, Pole> = config
            .poles
            .iter()
            .map(|(id, spec)| (id.clone(), Pole::from_spec(id, spec)))
            .collect();
        Self {
            poles: RwLock::new(poles),
            baseline: config.poles.clone(),
            monitor: config.monitor.clone(),
        }
    }

    /// Synchronize one telemetry frame into the registry.
    ///
    /// Returns an observation only when the frame transitions an issue-free
    /// pole into a faulted one; a persisting fault yields no further
    /// observations until it is fixed.
    pub fn apply_frame(&self, frame: &PoleTelemetryFrame) -> Option<FaultObservation> {
        let mut poles = self.poles.write();
        let Some(pole) = poles.get_mut(&frame.pole_id) else {
            warn!(pole_id = %frame.pole_id, "telemetry for unregistered pole dropped");
            return None;
        };
        if !pole.status.is_energized() {
            debug!(pole_id = %pole.id, status = %pole.status, "telemetry ignored for de-energized pole");
            return None;
        }

        pole.voltage_v = frame.voltage_v;
        pole.current_a = frame.current_a;
        pole.last_updated = frame.timestamp;

        if pole.has_open_issue() {
            return None;
        }
        let fault = self.classify(pole, frame)?;
        let severity = fault.default_severity();
        pole.record_issue(fault, severity);
        Some(FaultObservation {
            pole_id: pole.id.clone(),
            fault,
            severity,
            message: format!(
                "{} on {} ({:.1} V, {:.1} A)",
                fault.describe(),
                pole.id,
                frame.voltage_v,
                frame.current_a
            ),
        })
    }

    fn classify(&self, pole: &Pole, frame: &PoleTelemetryFrame) -> Option<FaultKind> {
        if let Some(fault) = frame.fault {
            return Some(fault);
        }
        if frame.voltage_v <= pole.nominal_voltage_v * 0.05 {
            return Some(FaultKind::LineDown);
        }
        if frame.current_a > pole.nominal_current_a * self.monitor.current_limit_ratio {
            return Some(FaultKind::Overload);
        }
        let deviation = (frame.voltage_v - pole.nominal_voltage_v) / pole.nominal_voltage_v;
        if deviation > self.monitor.voltage_tolerance {
            return Some(FaultKind::VoltageSurge);
        }
        if deviation < -self.monitor.voltage_tolerance {
            return Some(FaultKind::VoltageSag);
        }
        None
    }

    pub fn get(&self, pole_id: &str) -> Option<Pole> {
        self.poles.read().get(pole_id).cloned()
    }

    /// Stable-ordered snapshot of every pole.
    pub fn snapshot(&self) -> Vec<Pole> {
        self.poles.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.poles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.poles.read().is_empty()
    }

    /// Pole counts per status, covering every status including empty ones.
    pub fn status_counts(&self) -> Vec<(PoleStatus, usize)> {
        let poles = self.poles.read();
        PoleStatus::ALL
            .iter()
            .map(|status| {
                let count = poles.values().filter(|pole| pole.status == *status).count();
                (*status, count)
            })
            .collect()
    }

    /// Re-seed every pole from the configured baseline.
    pub fn reset_to_baseline(&self) {
        let mut poles = self.poles.write();
        *poles = self
            .baseline
            .iter()
            .map(|(id, spec)| (id.clone(), Pole::from_spec(id, spec)))
            .collect();
    }

    /// Run a closure against one pole under the write lock.
    pub(crate) fn with_pole_mut<T>(
        &self,
        pole_id: &str,
        mutate: impl FnOnce(&mut Pole) -> T,
    ) -> Option<T> {
        let mut poles = self.poles.write();
        poles.get_mut(pole_id).map(mutate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwatch_common::config::GeoLocation;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.poles.insert(
            "pole-01".into(),
            PoleSpec {
                location: GeoLocation {
                    latitude: 59.91,
                    longitude: 10.75,
                    region: None,
                },
                ..PoleSpec::default()
            },
        );
        config
    }

    fn frame(voltage_v: f64, current_a: f64) -> PoleTelemetryFrame {
        PoleTelemetryFrame::synthetic("pole-01", voltage_v, current_a)
    }

    #[test]
    fn nominal_frame_updates_readings_without_observation() {
        let registry = PoleRegistry::from_config(&test_config());
        let observation = registry.apply_frame(&frame(231.5, 11.8));
        assert!(observation.is_none());
        let pole = registry.get("pole-01").unwrap();
        assert_eq!(pole.voltage_v, 231.5);
        assert_eq!(pole.status, PoleStatus::Healthy);
    }

    #[test]
    fn voltage_deviation_is_classified() {
        let registry = PoleRegistry::from_config(&test_config());
        // 230 * 0.92 is below the default 8% tolerance band.
        let observation = registry.apply_frame(&frame(205.0, 11.0)).unwrap();
        assert_eq!(observation.fault, FaultKind::VoltageSag);
        assert_eq!(registry.get("pole-01").unwrap().status, PoleStatus::Faulty);
    }

    #[test]
    fn dead_voltage_reads_as_line_down() {
        let registry = PoleRegistry::from_config(&test_config());
        let observation = registry.apply_frame(&frame(0.0, 0.0)).unwrap();
        assert_eq!(observation.fault, FaultKind::LineDown);
        assert_eq!(observation.severity, Severity::Critical);
    }

    #[test]
    fn overload_beats_voltage_classification() {
        let registry = PoleRegistry::from_config(&test_config());
        let observation = registry.apply_frame(&frame(230.0, 30.0)).unwrap();
        assert_eq!(observation.fault, FaultKind::Overload);
    }

    #[test]
    fn persisting_fault_raises_exactly_one_observation() {
        let registry = PoleRegistry::from_config(&test_config());
        assert!(registry.apply_frame(&frame(0.0, 0.0)).is_some());
        assert!(registry.apply_frame(&frame(0.0, 0.0)).is_none());
        assert!(registry.apply_frame(&frame(210.0, 40.0)).is_none());
    }

    #[test]
    fn de_energized_pole_ignores_telemetry() {
        let registry = PoleRegistry::from_config(&test_config());
        registry
            .with_pole_mut("pole-01", |pole| pole.de_energize(PoleStatus::Isolated))
            .unwrap();
        assert!(registry.apply_frame(&frame(240.0, 20.0)).is_none());
        let pole = registry.get("pole-01").unwrap();
        assert_eq!(pole.voltage_v, 0.0);
        assert_eq!(pole.current_a, 0.0);
    }

    #[test]
    fn unknown_pole_frames_are_dropped() {
        let registry = PoleRegistry::from_config(&test_config());
        let stray = PoleTelemetryFrame::synthetic("pole-99", 230.0, 10.0);
        assert!(registry.apply_frame(&stray).is_none());
        assert!(registry.get("pole-99").is_none());
    }

    #[test]
    fn reset_returns_to_baseline() {
        let registry = PoleRegistry::from_config(&test_config());
        registry.apply_frame(&frame(0.0, 0.0)).unwrap();
        registry.reset_to_baseline();
        let pole = registry.get("pole-01").unwrap();
        assert_eq!(pole.status, PoleStatus::Healthy);
        assert_eq!(pole.voltage_v, pole.nominal_voltage_v);
        assert!(pole.fault.is_none());
    }
}
