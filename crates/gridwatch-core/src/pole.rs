//! ---
//! gw_section: "02-domain-state-model"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Pole domain model and lifecycle status."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use gridwatch_common::config::{GeoLocation, PoleSpec};
use gridwatch_common::fault::{FaultKind, Severity};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a monitored pole.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PoleStatus {
    Healthy,
    Faulty,
    Isolated,
    Maintenance,
}

impl PoleStatus {
    /// Whether the pole is carrying load and therefore reports live readings.
    ///
    /// Isolated and maintenance poles are de-energized: their voltage and
    /// current are pinned to zero and telemetry does not overwrite them.
    pub fn is_energized(&self) -> bool {
        matches!(self, PoleStatus::Healthy | PoleStatus::Faulty)
    }

    pub const ALL: [PoleStatus; 4] = [
        PoleStatus::Healthy,
        PoleStatus::Faulty,
        PoleStatus::Isolated,
        PoleStatus::Maintenance,
    ];
}

/// Authoritative state of a single pole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pole {
    pub id: String,
    pub location: GeoLocation,
    pub status: PoleStatus,
    pub voltage_v: f64,
    pub current_a: f64,
    pub nominal_voltage_v: f64,
    pub nominal_current_a: f64,
    #[serde(default)]
    pub fault: Option<FaultKind>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub isolated_by: Option<String>,
    #[serde(default)]
    pub isolated_at: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

impl Pole {
    /// Seed a healthy pole at its nominal operating point.
    pub fn from_spec(id: &str, spec: &PoleSpec) -> Self {
        Self {
            id: id.to_owned(),
            location: spec.location.clone(),
            status: PoleStatus::Healthy,
            voltage_v: spec.nominal_voltage_v,
            current_a: spec.nominal_current_a,
            nominal_voltage_v: spec.nominal_voltage_v,
            nominal_current_a: spec.nominal_current_a,
            fault: None,
            severity: None,
            isolated_by: None,
            isolated_at: None,
            last_updated: Utc::now(),
        }
    }

    pub fn has_open_issue(&self) -> bool {
        self.fault.is_some()
    }

    /// Record an issue against the pole. Energized poles become faulty;
    /// de-energized poles keep their status and zeroed readings.
    pub(crate) fn record_issue(&mut self, fault: FaultKind, severity: Severity) {
        self.fault = Some(fault);
        self.severity = Some(severity);
        if self.status.is_energized() {
            self.status = PoleStatus::Faulty;
        }
        self.last_updated = Utc::now();
    }

    /// Clear any open issue without changing the energization state.
    pub(crate) fn clear_issue(&mut self) {
        self.fault = None;
        self.severity = None;
        if self.status == PoleStatus::Faulty {
            self.status = PoleStatus::Healthy;
            self.voltage_v = self.nominal_voltage_v;
            self.current_a = self.nominal_current_a;
        }
        self.last_updated = Utc::now();
    }

    pub(crate) fn de_energize(&mut self, status: PoleStatus) {
        debug_assert!(!status.is_energized());
        self.status = status;
        self.voltage_v = 0.0;
        self.current_a = 0.0;
        self.last_updated = Utc::now();
    }

    /// Bring an isolated or maintenance pole back to service.
    pub(crate) fn re_energize(&mut self) {
        self.status = PoleStatus::Healthy;
        self.voltage_v = self.nominal_voltage_v;
        self.current_a = self.nominal_current_a;
        self.fault = None;
        self.severity = None;
        self.isolated_by = None;
        self.isolated_at = None;
        self.last_updated = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pole() -> Pole {
        Pole::from_spec("pole-01", &PoleSpec::default())
    }

    #[test]
    fn seeded_pole_is_healthy_at_nominals() {
        let pole = pole();
        assert_eq!(pole.status, PoleStatus::Healthy);
        assert_eq!(pole.voltage_v, pole.nominal_voltage_v);
        assert!(!pole.has_open_issue());
    }

    #[test]
    fn issue_on_energized_pole_marks_it_faulty() {
        let mut pole = pole();
        pole.record_issue(FaultKind::Overload, Severity::High);
        assert_eq!(pole.status, PoleStatus::Faulty);
        assert_eq!(pole.fault, Some(FaultKind::Overload));
    }

    #[test]
    fn issue_on_de_energized_pole_keeps_it_dark() {
        let mut pole = pole();
        pole.de_energize(PoleStatus::Isolated);
        pole.record_issue(FaultKind::InsulatorDamage, Severity::Medium);
        assert_eq!(pole.status, PoleStatus::Isolated);
        assert_eq!(pole.voltage_v, 0.0);
        assert!(pole.has_open_issue());
    }

    #[test]
    fn clearing_a_fault_restores_nominals() {
        let mut pole = pole();
        pole.record_issue(FaultKind::VoltageSag, Severity::Medium);
        pole.clear_issue();
        assert_eq!(pole.status, PoleStatus::Healthy);
        assert_eq!(pole.voltage_v, pole.nominal_voltage_v);
        assert!(pole.fault.is_none());
    }
}
