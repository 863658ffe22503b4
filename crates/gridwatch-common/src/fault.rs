//! ---
//! gw_section: "02-domain-state-model"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Fault and severity vocabulary shared across the workspace."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

/// Operator-facing alert severity, ordered from least to most urgent.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Fault classes reported against distribution poles.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FaultKind {
    LineDown,
    Overload,
    VoltageSag,
    VoltageSurge,
    InsulatorDamage,
}

impl FaultKind {
    /// Severity assigned when a fault is detected without an explicit override.
    pub fn default_severity(&self) -> Severity {
        match self {
            FaultKind::LineDown => Severity::Critical,
            FaultKind::Overload => Severity::High,
            FaultKind::VoltageSurge => Severity::High,
            FaultKind::VoltageSag => Severity::Medium,
            FaultKind::InsulatorDamage => Severity::Medium,
        }
    }

    /// Human-readable phrase used when composing alert messages.
    pub fn describe(&self) -> &'static str {
        match self {
            FaultKind::LineDown => "downed line",
            FaultKind::Overload => "current overload",
            FaultKind::VoltageSag => "voltage sag",
            FaultKind::VoltageSurge => "voltage surge",
            FaultKind::InsulatorDamage => "insulator damage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_low_to_critical() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn fault_kinds_map_to_severities() {
        assert_eq!(FaultKind::LineDown.default_severity(), Severity::Critical);
        assert_eq!(FaultKind::VoltageSag.default_severity(), Severity::Medium);
    }

    #[test]
    fn display_uses_snake_case() {
        assert_eq!(FaultKind::VoltageSurge.to_string(), "voltage_surge");
        assert_eq!(Severity::Critical.to_string(), "critical");
    }
}
