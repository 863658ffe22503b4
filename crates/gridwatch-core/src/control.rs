//! ---
//! gw_section: "01-core-functionality"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Operator control-action validation and application."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::sync::Arc;

use chrono::Utc;
use gridwatch_common::fault::{FaultKind, Severity};
use gridwatch_metrics::MonitorMetrics;
use serde::Deserialize;
use thiserror::Error;

use crate::alerts::{Alert, AlertLog};
use crate::notify::{ActionKind, Notification, NotificationHub};
use crate::pole::{Pole, PoleStatus};
use crate::registry::{FaultObservation, PoleRegistry};

pub type Result<T> = std::result::Result<T, ControlError>;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("pole {0} is not registered")]
    UnknownPole(String),
}

fn default_reporter() -> String {
    "operator".to_owned()
}

/// Manually reported issue against a pole.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueReport {
    pub fault: FaultKind,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "default_reporter")]
    pub reported_by: String,
}

/// Applies operator-initiated state transitions against the registry and the
/// alert log, emitting a notification for every applied action.
///
/// Operations are idempotent: re-applying an action refreshes timestamps but
/// never fails. The only modeled error is addressing an unregistered pole.
#[derive(Clone)]
pub struct ControlActionProcessor {
    registry: Arc<PoleRegistry>,
    alerts: Arc<AlertLog>,
    notifier: Arc<NotificationHub>,
    metrics: Option<MonitorMetrics>,
}

impl ControlActionProcessor {
    pub fn new(
        registry: Arc<PoleRegistry>,
        alerts: Arc<AlertLog>,
        notifier: Arc<NotificationHub>,
        metrics: Option<MonitorMetrics>,
    ) -> Self {
        Self {
            registry,
            alerts,
            notifier,
            metrics,
        }
    }

    /// De-energize a pole and stamp who isolated it.
    pub fn isolate(&self, pole_id: &str, operator: &str) -> Result<Pole> {
        let pole = self
            .registry
            .with_pole_mut(pole_id, |pole| {
                pole.de_energize(PoleStatus::Isolated);
                pole.isolated_by = Some(operator.to_owned());
                pole.isolated_at = Some(Utc::now());
                pole.clone()
            })
            .ok_or_else(|| ControlError::UnknownPole(pole_id.to_owned()))?;
        self.applied(
            ActionKind::Isolate,
            Some(pole_id),
            Severity::High,
            format!("{} isolated by {}", pole_id, operator),
        );
        Ok(pole)
    }

    /// Re-energize an isolated or maintenance pole and drop its alerts.
    pub fn restore(&self, pole_id: &str, operator: &str) -> Result<Pole> {
        let pole = self
            .registry
            .with_pole_mut(pole_id, |pole| {
                pole.re_energize();
                pole.clone()
            })
            .ok_or_else(|| ControlError::UnknownPole(pole_id.to_owned()))?;
        let cleared = self.alerts.clear_for_pole(pole_id);
        self.applied(
            ActionKind::Restore,
            Some(pole_id),
            Severity::Low,
            format!(
                "{} restored to service by {} ({} alerts cleared)",
                pole_id, operator, cleared
            ),
        );
        Ok(pole)
    }

    /// Clear an open issue and drop its alerts. An isolated pole stays
    /// isolated; `restore` is the explicit re-energize step.
    pub fn fix(&self, pole_id: &str, operator: &str) -> Result<Pole> {
        let pole = self
            .registry
            .with_pole_mut(pole_id, |pole| {
                pole.clear_issue();
                pole.clone()
            })
            .ok_or_else(|| ControlError::UnknownPole(pole_id.to_owned()))?;
        let cleared = self.alerts.clear_for_pole(pole_id);
        self.applied(
            ActionKind::Fix,
            Some(pole_id),
            Severity::Low,
            format!(
                "{} marked fixed by {} ({} alerts cleared)",
                pole_id, operator, cleared
            ),
        );
        Ok(pole)
    }

    /// Record a manually reported issue and raise its alert.
    pub fn add_issue(&self, pole_id: &str, report: IssueReport) -> Result<Pole> {
        let severity = report
            .severity
            .unwrap_or_else(|| report.fault.default_severity());
        let message = report
            .message
            .clone()
            .unwrap_or_else(|| format!("{} reported on {}", report.fault.describe(), pole_id));
        let pole = self
            .registry
            .with_pole_mut(pole_id, |pole| {
                pole.record_issue(report.fault, severity);
                pole.clone()
            })
            .ok_or_else(|| ControlError::UnknownPole(pole_id.to_owned()))?;
        self.alerts.raise(Alert::new(
            pole_id,
            message.clone(),
            severity,
            report.reported_by.clone(),
        ));
        self.applied(ActionKind::AddIssue, Some(pole_id), severity, message);
        Ok(pole)
    }

    /// Take a pole out of service for planned maintenance.
    pub fn begin_maintenance(&self, pole_id: &str, operator: &str) -> Result<Pole> {
        let pole = self
            .registry
            .with_pole_mut(pole_id, |pole| {
                pole.de_energize(PoleStatus::Maintenance);
                pole.isolated_by = None;
                pole.isolated_at = None;
                pole.clone()
            })
            .ok_or_else(|| ControlError::UnknownPole(pole_id.to_owned()))?;
        self.applied(
            ActionKind::Maintenance,
            Some(pole_id),
            Severity::Medium,
            format!("{} taken into maintenance by {}", pole_id, operator),
        );
        Ok(pole)
    }

    /// Return every pole to its configured baseline and empty the alert log.
    pub fn reset(&self) {
        self.registry.reset_to_baseline();
        let cleared = self.alerts.clear_all();
        self.applied(
            ActionKind::Reset,
            None,
            Severity::Low,
            format!("registry reset to baseline, {} alerts cleared", cleared),
        );
    }

    /// Turn a runtime fault observation into an alert and a notification.
    pub fn record_detection(&self, observation: &FaultObservation) {
        self.alerts.raise(Alert::new(
            observation.pole_id.clone(),
            observation.message.clone(),
            observation.severity,
            "monitor",
        ));
        if let Some(metrics) = &self.metrics {
            metrics.record_fault(&observation.fault.to_string());
        }
        self.notifier.publish(Notification::new(
            ActionKind::FaultDetected,
            Some(observation.pole_id.clone()),
            observation.severity,
            observation.message.clone(),
        ));
    }

    fn applied(
        &self,
        action: ActionKind,
        pole_id: Option<&str>,
        severity: Severity,
        message: String,
    ) {
        if let Some(metrics) = &self.metrics {
            metrics.record_control_action(&action.to_string());
        }
        self.notifier.publish(Notification::new(
            action,
            pole_id.map(str::to_owned),
            severity,
            message,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridwatch_common::config::{AppConfig, GeoLocation, PoleSpec};

    fn harness() -> (
        Arc<PoleRegistry>,
        Arc<AlertLog>,
        Arc<NotificationHub>,
        ControlActionProcessor,
    ) {
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
        let registry = Arc::new(PoleRegistry::from_config(&config));
        let alerts = Arc::new(AlertLog::new(config.monitor.alert_capacity));
        let notifier = Arc::new(NotificationHub::new(config.monitor.notification_buffer));
        let processor = ControlActionProcessor::new(
            registry.clone(),
            alerts.clone(),
            notifier.clone(),
            None,
        );
        (registry, alerts, notifier, processor)
    }

    #[test]
    fn isolate_zeroes_readings_and_stamps_operator() {
        let (_, _, _, processor) = harness();
        let pole = processor.isolate("pole-01", "ops-anna").unwrap();
        assert_eq!(pole.status, PoleStatus::Isolated);
        assert_eq!(pole.voltage_v, 0.0);
        assert_eq!(pole.current_a, 0.0);
        assert_eq!(pole.isolated_by.as_deref(), Some("ops-anna"));
        assert!(pole.isolated_at.is_some());
    }

    #[test]
    fn restore_re_energizes_and_clears_alerts() {
        let (_, alerts, _, processor) = harness();
        processor
            .add_issue(
                "pole-01",
                IssueReport {
                    fault: FaultKind::LineDown,
                    severity: None,
                    message: None,
                    reported_by: "field-crew".into(),
                },
            )
            .unwrap();
        processor.isolate("pole-01", "ops").unwrap();
        assert_eq!(alerts.active_count(), 1);

        let pole = processor.restore("pole-01", "ops").unwrap();
        assert_eq!(pole.status, PoleStatus::Healthy);
        assert_eq!(pole.voltage_v, pole.nominal_voltage_v);
        assert!(pole.fault.is_none());
        assert!(pole.isolated_by.is_none());
        assert_eq!(alerts.active_count(), 0);
    }

    #[test]
    fn fix_clears_fault_but_keeps_isolation() {
        let (_, alerts, _, processor) = harness();
        processor.isolate("pole-01", "ops").unwrap();
        processor
            .add_issue(
                "pole-01",
                IssueReport {
                    fault: FaultKind::InsulatorDamage,
                    severity: None,
                    message: None,
                    reported_by: "drone-survey".into(),
                },
            )
            .unwrap();

        let pole = processor.fix("pole-01", "ops").unwrap();
        assert_eq!(pole.status, PoleStatus::Isolated);
        assert!(pole.fault.is_none());
        assert_eq!(pole.voltage_v, 0.0);
        assert_eq!(alerts.active_count(), 0);
    }

    #[test]
    fn add_issue_raises_alert_with_default_severity() {
        let (_, alerts, _, processor) = harness();
        let pole = processor
            .add_issue(
                "pole-02",
                IssueReport {
                    fault: FaultKind::Overload,
                    severity: None,
                    message: Some("transformer humming".into()),
                    reported_by: "caller".into(),
                },
            )
            .unwrap();
        assert_eq!(pole.status, PoleStatus::Faulty);
        let snapshot = alerts.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].severity, Severity::High);
        assert_eq!(snapshot[0].message, "transformer humming");
        assert_eq!(snapshot[0].created_by, "caller");
    }

    #[test]
    fn unknown_pole_is_rejected() {
        let (_, _, _, processor) = harness();
        let err = processor.isolate("pole-99", "ops").unwrap_err();
        assert!(matches!(err, ControlError::UnknownPole(id) if id == "pole-99"));
    }

    #[test]
    fn reset_restores_baseline_and_empties_alerts() {
        let (registry, alerts, _, processor) = harness();
        processor.isolate("pole-01", "ops").unwrap();
        processor
            .add_issue(
                "pole-02",
                IssueReport {
                    fault: FaultKind::VoltageSurge,
                    severity: Some(Severity::Critical),
                    message: None,
                    reported_by: "monitor".into(),
                },
            )
            .unwrap();

        processor.reset();
        assert_eq!(alerts.active_count(), 0);
        for pole in registry.snapshot() {
            assert_eq!(pole.status, PoleStatus::Healthy);
            assert!(pole.fault.is_none());
        }
    }

    #[test]
    fn every_action_publishes_a_notification() {
        let (_, _, notifier, processor) = harness();
        processor.isolate("pole-01", "ops").unwrap();
        processor.restore("pole-01", "ops").unwrap();
        processor.reset();
        let recent = notifier.recent();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].action, ActionKind::Reset);
        assert_eq!(recent[2].action, ActionKind::Isolate);
    }

    #[test]
    fn repeated_isolate_is_idempotent() {
        let (_, _, _, processor) = harness();
        processor.isolate("pole-01", "ops-a").unwrap();
        let pole = processor.isolate("pole-01", "ops-b").unwrap();
        assert_eq!(pole.status, PoleStatus::Isolated);
        assert_eq!(pole.isolated_by.as_deref(), Some("ops-b"));
    }
}
